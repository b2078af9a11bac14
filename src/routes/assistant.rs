// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Assistant, daily inspiration and parish lookup routes.
//!
//! These capabilities never fail; the services substitute fallbacks.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::Parish;
use crate::services::DirectorReply;
use crate::time_utils::now_millis;
use crate::AppState;

const DEFAULT_SAINT: &str = "São José";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/director", post(director))
        .route("/api/inspiration", get(inspiration))
        .route("/api/places", get(places))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MessageRequest {
    #[validate(length(min = 1, max = 4000))]
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct InspirationParams {
    #[serde(default)]
    saint: Option<String>,
    #[serde(default)]
    gospel: Option<String>,
}

#[derive(Serialize)]
pub struct InspirationResponse {
    /// `true` only the first time it is requested on a calendar day.
    pub show: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlacesParams {
    lat: f64,
    lng: f64,
}

fn validated(body: MessageRequest) -> Result<MessageRequest> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(body)
}

/// Chat with the assistant, personalized when someone is signed in.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<ChatResponse>> {
    let body = validated(body)?;
    let session = state.sessions.active_session(now_millis());
    let reply = state
        .assistant
        .send_message(&body.message, session.as_ref().map(|s| &s.user))
        .await;
    Ok(Json(ChatResponse { reply }))
}

async fn director(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<DirectorReply>> {
    let body = validated(body)?;
    Ok(Json(state.assistant.spiritual_director(&body.message).await))
}

async fn inspiration(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InspirationParams>,
) -> Json<InspirationResponse> {
    let today = Local::now().date_naive();
    if !state.sessions.store().take_daily_inspiration(today) {
        return Json(InspirationResponse {
            show: false,
            reflection: None,
            theme: None,
        });
    }

    let saint = params.saint.as_deref().unwrap_or(DEFAULT_SAINT);
    let reflection = state.assistant.daily_reflection(saint).await;
    let theme = match params.gospel.as_deref().filter(|g| !g.trim().is_empty()) {
        Some(gospel) => Some(state.assistant.daily_theme(gospel).await),
        None => None,
    };

    Json(InspirationResponse {
        show: true,
        reflection: Some(reflection),
        theme,
    })
}

async fn places(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlacesParams>,
) -> Result<Json<Vec<Parish>>> {
    let valid = (-90.0..=90.0).contains(&params.lat) && (-180.0..=180.0).contains(&params.lng);
    if !valid {
        return Err(AppError::BadRequest("coordinates out of range".to_string()));
    }
    Ok(Json(state.places.search_nearby(params.lat, params.lng).await))
}
