// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community prayer intention routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{AuthSession, PrayerIntention};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/intentions", get(list_intentions).post(create_intention))
        .route("/api/intentions/{id}/pray", post(toggle_pray))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIntentionRequest {
    #[validate(length(min = 1, max = 1000))]
    content: String,
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    "geral".to_string()
}

async fn list_intentions(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<Vec<PrayerIntention>> {
    let intentions = state
        .with_workspace(&session.user, |c| c.intentions().to_vec())
        .await;
    Json(intentions)
}

async fn create_intention(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<CreateIntentionRequest>,
) -> Result<(StatusCode, Json<PrayerIntention>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if body.content.trim().is_empty() {
        return Err(AppError::BadRequest("content must not be blank".to_string()));
    }

    let (intention, _persistence) = state
        .with_workspace(&session.user, |c| {
            c.push_intention(&body.content, &body.category)
        })
        .await;
    Ok((StatusCode::CREATED, Json(intention)))
}

/// Returns the intention after the toggle, or `null` for unknown ids.
async fn toggle_pray(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Json<Option<PrayerIntention>> {
    let outcome = state
        .with_workspace(&session.user, |c| c.toggle_pray(&id))
        .await;
    Json(outcome.map(|o| o.intention))
}
