// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Espiritualizei: personalized spiritual routines with dual-mode persistence.
//!
//! This crate provides the session and profile layer (remote backend or local
//! fallback store), routine generation with a deterministic fallback, the
//! optimistic mutation coordinator and a small HTTP API for the web client.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod text_utils;
pub mod time_utils;

use config::Config;
use db::{BackendGateway, LocalSessionStore};
use models::UserProfile;
use services::{
    AssistantService, ContentService, GeminiClient, OptimisticCoordinator, PlacesService,
    RoutineGenerator, SessionManager,
};
use tokio::sync::Mutex;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub content: ContentService,
    pub generator: RoutineGenerator,
    pub assistant: AssistantService,
    pub places: PlacesService,
    /// In-memory state of the signed-in user. Loaded lazily.
    workspace: Mutex<Option<OptimisticCoordinator>>,
}

impl AppState {
    /// Wire every service from configuration.
    pub fn new(config: Config, store: LocalSessionStore) -> Self {
        let gateway = BackendGateway::from_config(&config);
        let sessions =
            SessionManager::new(gateway, store).with_redirect_url(config.frontend_url.clone());

        let gemini = config.gemini_api_key.clone().map(GeminiClient::new);
        if gemini.is_none() {
            tracing::warn!("Generative API key missing, using fallback content");
        }
        let generator = RoutineGenerator::new(gemini.clone(), config.routine_model.clone());
        let assistant = AssistantService::new(gemini, config.chat_model.clone());
        let places = PlacesService::new(config.google_maps_key.clone());

        Self::from_services(config, sessions, generator, assistant, places)
    }

    /// Assemble state from prebuilt services (tests point them at mock servers).
    pub fn from_services(
        config: Config,
        sessions: SessionManager,
        generator: RoutineGenerator,
        assistant: AssistantService,
        places: PlacesService,
    ) -> Self {
        Self {
            config,
            content: ContentService::new(sessions.clone()),
            sessions,
            generator,
            assistant,
            places,
            workspace: Mutex::new(None),
        }
    }

    /// Run one synchronous step against `user`'s in-memory state, loading it
    /// first if needed. The lock is not held while loading.
    pub async fn with_workspace<T>(
        &self,
        user: &UserProfile,
        step: impl FnOnce(&mut OptimisticCoordinator) -> T,
    ) -> T {
        {
            let mut guard = self.workspace.lock().await;
            if let Some(coordinator) = guard.as_mut().filter(|c| c.profile().id == user.id) {
                return step(coordinator);
            }
        }

        let fresh =
            OptimisticCoordinator::load(self.sessions.clone(), self.content.clone(), user.clone())
                .await;

        // Another request may have loaded the same user meanwhile; keep theirs.
        let mut guard = self.workspace.lock().await;
        let coordinator = match guard.take() {
            Some(current) if current.profile().id == user.id => guard.insert(current),
            _ => guard.insert(fresh),
        };
        step(coordinator)
    }

    /// Drop the in-memory state (login, logout, external profile changes).
    pub async fn reset_workspace(&self) {
        *self.workspace.lock().await = None;
    }
}
