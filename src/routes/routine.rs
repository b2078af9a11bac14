// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routine routes. Mutations go through the optimistic coordinator.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{AuthSession, NewRoutineItem, RoutineItem, UserProfile};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routine", get(get_routine).post(add_item))
        .route("/api/routine/{id}", delete(remove_item))
        .route("/api/routine/{id}/toggle", post(toggle_item))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub item: RoutineItem,
    pub xp_delta: i64,
    pub profile: UserProfile,
}

async fn get_routine(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<Vec<RoutineItem>> {
    let routine = state
        .with_workspace(&session.user, |c| c.routine().to_vec())
        .await;
    Json(routine)
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(new_item): Json<NewRoutineItem>,
) -> Result<(StatusCode, Json<RoutineItem>)> {
    if new_item.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    let (item, _persistence) = state
        .with_workspace(&session.user, |c| c.add_routine_item(new_item))
        .await;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> StatusCode {
    // Unknown ids are a no-op.
    state
        .with_workspace(&session.user, |c| c.remove_routine_item(&id))
        .await;
    StatusCode::NO_CONTENT
}

async fn toggle_item(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Json<Option<ToggleResponse>> {
    let outcome = state
        .with_workspace(&session.user, |c| c.toggle_routine_item(&id))
        .await;

    // Persistence continues in the background.
    Json(outcome.map(|o| ToggleResponse {
        item: o.item,
        xp_delta: o.xp_delta,
        profile: o.profile,
    }))
}
