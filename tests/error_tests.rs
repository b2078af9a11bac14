// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use espiritualizei::db::{GatewayError, StorageError};
use espiritualizei::error::{AppError, SessionError};

#[test]
fn test_gateway_errors_map_to_session_errors() {
    let err = SessionError::from_gateway(GatewayError::Network("connection refused".into()));
    assert!(matches!(err, SessionError::Network(_)));

    let err = SessionError::from_gateway(GatewayError::Rejected {
        status: 500,
        code: None,
        message: "boom".into(),
    });
    assert!(matches!(err, SessionError::AuthBackend(_)));

    let err = SessionError::from_gateway(GatewayError::Decode("bad json".into()));
    assert!(matches!(err, SessionError::AuthBackend(_)));
}

#[test]
fn test_session_errors_have_distinct_statuses() {
    let cases = [
        (SessionError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        (SessionError::DuplicateEmail, StatusCode::CONFLICT),
        (SessionError::RegistrationPending, StatusCode::ACCEPTED),
        (SessionError::Network("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        (SessionError::AuthBackend("rejected".into()), StatusCode::BAD_GATEWAY),
        (SessionError::InvalidInput("email".into()), StatusCode::BAD_REQUEST),
    ];

    for (err, expected) in cases {
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), expected);
    }
}

#[test]
fn test_storage_failure_is_internal_without_details() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let err = SessionError::Storage(StorageError::Io {
        key: "users".into(),
        source: io,
    });
    let response = AppError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_unauthorized_and_bad_request() {
    assert_eq!(
        AppError::Unauthorized.into_response().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        AppError::BadRequest("nope".into()).into_response().status(),
        StatusCode::BAD_REQUEST
    );
}
