// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use espiritualizei::config::Config;
use espiritualizei::db::{BackendGateway, LocalSessionStore, SupabaseClient};
use espiritualizei::models::OnboardingData;
use espiritualizei::routes::create_router;
use espiritualizei::services::{AssistantService, PlacesService, RoutineGenerator, SessionManager};
use espiritualizei::AppState;
use serde_json::{json, Value};
use std::sync::Arc;

/// Onboarding answers for a new user.
#[allow(dead_code)]
pub fn onboarding(email: &str, password: &str) -> OnboardingData {
    OnboardingData {
        name: "Ana Maria".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        phone: None,
        state_of_life: "casada".to_string(),
        primary_struggle: "ansiedade".to_string(),
        spiritual_goal: "paz".to_string(),
        patron_saint: "Santa Teresinha".to_string(),
        confession_frequency: "mensal".to_string(),
    }
}

/// Session manager in fallback mode over an in-memory store.
#[allow(dead_code)]
pub fn fallback_manager() -> SessionManager {
    SessionManager::new(BackendGateway::Uninitialized, LocalSessionStore::in_memory())
}

/// Session manager connected to a (mock) backend at `base_url`.
#[allow(dead_code)]
pub fn connected_manager(base_url: &str) -> SessionManager {
    SessionManager::new(
        BackendGateway::Connected(SupabaseClient::new(base_url, "anon-key")),
        LocalSessionStore::in_memory(),
    )
}

/// Backend token response for a password grant or sign-up.
#[allow(dead_code)]
pub fn token_response(user_id: &str, email: &str) -> Value {
    json!({
        "access_token": format!("token-{user_id}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh",
        "user": { "id": user_id, "email": email }
    })
}

/// Create a test app with every capability offline.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let state = Arc::new(AppState::from_services(
        config.clone(),
        fallback_manager(),
        RoutineGenerator::new(None, config.routine_model.clone()),
        AssistantService::new(None, config.chat_model.clone()),
        PlacesService::new(None),
    ));
    (create_router(state.clone()), state)
}

/// JSON POST request.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
