// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for session transitions and consistent API responses.

use crate::db::backend::GatewayError;
use crate::db::local::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Outcome of a user-initiated session transition that did not succeed.
///
/// Expected negative outcomes (`InvalidCredentials`, `DuplicateEmail`,
/// `RegistrationPending`) are distinct from transport failures so callers can
/// branch on the variant.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("E-mail ou senha incorretos.")]
    InvalidCredentials,

    #[error("E-mail já cadastrado.")]
    DuplicateEmail,

    #[error("Cadastro ok! Verifique seu e-mail.")]
    RegistrationPending,

    #[error("Erro de conexão: {0}")]
    Network(String),

    #[error("Auth backend error: {0}")]
    AuthBackend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Map a gateway failure that is not an expected outcome.
    pub fn from_gateway(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(msg) => SessionError::Network(msg),
            other => SessionError::AuthBackend(other.to_string()),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Session(err) => {
                let message = Some(err.to_string());
                match err {
                    SessionError::InvalidCredentials => {
                        (StatusCode::UNAUTHORIZED, "invalid_credentials", message)
                    }
                    SessionError::DuplicateEmail => {
                        (StatusCode::CONFLICT, "duplicate_email", message)
                    }
                    SessionError::RegistrationPending => {
                        (StatusCode::ACCEPTED, "registration_pending", message)
                    }
                    SessionError::Network(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "network_error", message)
                    }
                    SessionError::AuthBackend(msg) => {
                        tracing::warn!(error = %msg, "Auth backend rejected request");
                        (StatusCode::BAD_GATEWAY, "auth_backend_error", message)
                    }
                    SessionError::InvalidInput(_) => {
                        (StatusCode::BAD_REQUEST, "invalid_input", message)
                    }
                    SessionError::Storage(inner) => {
                        tracing::error!(error = %inner, "Local storage error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
                    }
                }
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
