// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gate for routes that act on the signed-in user.

use crate::error::AppError;
use crate::time_utils::now_millis;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Require an unexpired stored session and expose it to handlers as an
/// `Extension<AuthSession>`.
///
/// Expired sessions stay in the store; they are only treated as absent here.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .active_session(now_millis())
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
