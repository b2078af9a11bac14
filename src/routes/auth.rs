// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding, login/logout, password and subscription routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{AuthSession, OnboardingData, UserProfile};
use crate::services::{complete_onboarding, OnboardingResult};
use crate::time_utils::now_millis;
use crate::AppState;

/// Routes usable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/onboarding", post(onboarding))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/session", get(get_session))
}

/// Routes that need the signed-in user.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/password", post(set_password))
        .route("/api/premium", post(upgrade_to_premium))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    #[validate(length(min = 1))]
    new_password: String,
}

fn validated<T: Validate>(body: T) -> Result<T> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(body)
}

/// Register, generate the routine and store everything.
async fn onboarding(
    State(state): State<Arc<AppState>>,
    Json(data): Json<OnboardingData>,
) -> Result<(StatusCode, Json<OnboardingResult>)> {
    let result =
        complete_onboarding(&state.sessions, &state.content, &state.generator, &data).await?;
    state.reset_workspace().await;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthSession>> {
    let body = validated(body)?;
    let session = state.sessions.login(&body.email, &body.password).await?;
    state.reset_workspace().await;
    Ok(Json(session))
}

/// Always succeeds; remote revoke failures are only logged.
async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sessions.logout().await;
    state.reset_workspace().await;
    StatusCode::NO_CONTENT
}

/// The current session, or `null` when absent or expired.
async fn get_session(State(state): State<Arc<AppState>>) -> Json<Option<AuthSession>> {
    Json(state.sessions.active_session(now_millis()))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    let body = validated(ResetPasswordRequest {
        email: body.email.trim().to_lowercase(),
    })?;
    state.sessions.reset_password(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetPasswordRequest>,
) -> Result<StatusCode> {
    let body = validated(body)?;
    state.sessions.set_password(&body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upgrade_to_premium(State(state): State<Arc<AppState>>) -> Result<Json<UserProfile>> {
    let profile = state
        .sessions
        .upgrade_to_premium()
        .await?
        .ok_or(AppError::Unauthorized)?;
    state.reset_workspace().await;
    Ok(Json(profile))
}
