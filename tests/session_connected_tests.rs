// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager behaviour against a mocked auth/table backend.

use espiritualizei::error::SessionError;
use espiritualizei::services::SessionMode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{connected_manager, onboarding, token_response};

async fn mount_password_grant(server: &MockServer, user_id: &str, email: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response(user_id, email)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_decodes_profile_row() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "u1", "ana@example.com").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .and(header("authorization", "Bearer token-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "u1",
            "name": "Ana",
            "level": 3,
            "current_xp": 40,
            "streak_days": 5,
            "patron_saint": "São Bento",
            "is_premium": true,
            "subscription_status": "active",
            "joined_date": "2025-01-10T12:00:00Z"
        }])))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    assert_eq!(manager.mode(), SessionMode::Connected);

    let session = manager.login(" Ana@Example.com ", "1234").await.unwrap();
    assert_eq!(session.token, "token-u1");
    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.email, "ana@example.com");
    assert_eq!(session.user.level, 3);
    assert_eq!(session.user.current_xp, 40);
    assert_eq!(session.user.patron_saint.as_deref(), Some("São Bento"));
    assert!(session.user.is_premium);

    // The local store mirrors the session.
    assert_eq!(manager.get_session(), Some(session));
}

#[tokio::test]
async fn test_login_without_profile_row_uses_minimal_profile() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "u1", "ana@example.com").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let session = manager.login("ana@example.com", "1234").await.unwrap();
    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.level, 1);
    assert_eq!(session.user.current_xp, 0);
}

#[tokio::test]
async fn test_rejected_login_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let err = manager.login("a@a.com", "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidCredentials));
    assert!(manager.get_session().is_none());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let manager = connected_manager("http://127.0.0.1:1");
    let err = manager.login("a@a.com", "1234").await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_register_creates_profile_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({ "email": "ana@example.com", "password": "1234" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response("u9", "ana@example.com")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!([{ "id": "u9", "level": 1, "current_xp": 0 }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let session = manager
        .register(&onboarding(" Ana@Example.com", "1234"))
        .await
        .unwrap();

    assert_eq!(session.user.id, "u9");
    assert_eq!(session.user.current_xp, 0);
    assert_eq!(session.user.level, 1);
    assert_eq!(manager.get_session().unwrap().user.id, "u9");
}

#[tokio::test]
async fn test_register_pending_confirmation_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u2",
            "email": "ana@example.com",
            "confirmation_sent_at": "2026-10-17T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let err = manager
        .register(&onboarding("ana@example.com", "1234"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::RegistrationPending));
    assert!(manager.get_session().is_none());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "error_code": "user_already_exists",
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let err = manager
        .register(&onboarding("ana@example.com", "1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::DuplicateEmail));
}

#[tokio::test]
async fn test_logout_clears_session_when_revoke_fails() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "u1", "ana@example.com").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    manager.login("ana@example.com", "1234").await.unwrap();

    manager.logout().await;
    assert!(manager.get_session().is_none());
}

#[tokio::test]
async fn test_reset_password_rejection_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error_code": "over_email_send_rate_limit",
            "msg": "Too many requests"
        })))
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri()).with_redirect_url("http://localhost:5173");
    let err = manager.reset_password("a@a.com").await.unwrap_err();
    assert!(matches!(err, SessionError::AuthBackend(_)));
}

#[tokio::test]
async fn test_set_password_requires_session() {
    let server = MockServer::start().await;
    let manager = connected_manager(&server.uri());

    let err = manager.set_password("nova-senha").await.unwrap_err();
    assert!(matches!(err, SessionError::AuthBackend(_)));
}

#[tokio::test]
async fn test_set_password_uses_session_token() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "u1", "ana@example.com").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer token-u1"))
        .and(body_partial_json(json!({ "password": "nova-senha" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1" })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    manager.login("ana@example.com", "1234").await.unwrap();
    manager.set_password(" nova-senha ").await.unwrap();
}

#[tokio::test]
async fn test_profile_sync_patches_mutable_columns() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "u1", "ana@example.com").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "u1", "name": "Ana" }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .and(body_partial_json(json!({ "current_xp": 30, "name": "Ana" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let manager = connected_manager(&server.uri());
    let session = manager.login("ana@example.com", "1234").await.unwrap();

    let mut profile = session.user.clone();
    profile.current_xp = 30;
    let cached = manager.cache_profile(profile).unwrap();
    assert_eq!(manager.get_session().unwrap().user.current_xp, 30);

    manager.sync_remote_profile(&cached).await.unwrap();
}
