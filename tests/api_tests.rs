// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end tests of the HTTP API with every external service offline.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, get, post_json};

fn onboarding_body(email: &str) -> Value {
    json!({
        "name": "Ana Maria",
        "email": email,
        "password": "1234",
        "stateOfLife": "casada",
        "primaryStruggle": "ansiedade",
        "spiritualGoal": "paz",
        "patronSaint": "Santa Teresinha",
        "confessionFrequency": "mensal"
    })
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check_reports_fallback_mode() {
    let (app, _state) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "fallback");
}

#[tokio::test]
async fn test_session_routes_require_login() {
    let (app, _state) = create_test_app();

    for uri in ["/api/routine", "/api/intentions"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app.oneshot(get("/api/session")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_onboarding_returns_fallback_routine() {
    let (app, state) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["routine"].as_array().unwrap().len(), 3);
    assert_eq!(
        body["profileReasoning"],
        "Um caminho de paz e constância para sua jornada."
    );
    assert_eq!(body["session"]["user"]["spiritualMaturity"], "Buscador de Deus");
    assert_eq!(body["session"]["user"]["currentXp"], 0);

    // The same routine is what the signed-in user sees.
    let response = app.clone().oneshot(get("/api/routine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let routine = body_json(response).await;
    assert_eq!(routine, body["routine"]);
    assert_eq!(
        response_cache_control(&app, "/api/routine").await.as_deref(),
        Some("no-store")
    );

    let session = state.sessions.get_session().unwrap();
    assert_eq!(session.user.email, "ana@example.com");
}

async fn response_cache_control(app: &axum::Router, uri: &str) -> Option<String> {
    let response = app.clone().oneshot(get(uri)).await.unwrap();
    response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_duplicate_onboarding_is_conflict() {
    let (app, _state) = create_test_app();

    let first = app
        .clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(post_json("/api/onboarding", onboarding_body("ANA@example.com")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "duplicate_email");
}

#[tokio::test]
async fn test_login_logout_flow() {
    let (app, _state) = create_test_app();
    app.clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();

    let response = app.clone().oneshot(post_empty("/api/auth/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.clone().oneshot(get("/api/routine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ana@example.com", "password": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_credentials");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": " Ana@Example.com", "password": "1234" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert!(session["token"].as_str().unwrap().starts_with("local-"));

    let response = app.oneshot(get("/api/session")).await.unwrap();
    assert_eq!(body_json(response).await["user"]["email"], "ana@example.com");
}

#[tokio::test]
async fn test_toggle_routine_item_moves_experience() {
    let (app, state) = create_test_app();
    let onboarded = body_json(
        app.clone()
            .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
            .await
            .unwrap(),
    )
    .await;
    let item = &onboarded["routine"][0];
    let id = item["id"].as_str().unwrap();
    let reward = item["xpReward"].as_i64().unwrap();

    let uri = format!("/api/routine/{id}/toggle");
    let response = app.clone().oneshot(post_empty(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["item"]["completed"], true);
    assert_eq!(body["xpDelta"], reward);
    assert_eq!(body["profile"]["currentXp"], reward);
    assert_eq!(
        state.sessions.get_session().unwrap().user.current_xp,
        reward as u32
    );

    let body = body_json(app.clone().oneshot(post_empty(&uri)).await.unwrap()).await;
    assert_eq!(body["item"]["completed"], false);
    assert_eq!(body["profile"]["currentXp"], 0);

    // Unknown ids are a no-op.
    let response = app
        .oneshot(post_empty("/api/routine/missing/toggle"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_add_and_delete_routine_item() {
    let (app, _state) = create_test_app();
    app.clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/routine",
            json!({ "title": "  ", "xpReward": 10, "icon": "candle", "timeOfDay": "night" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/routine",
            json!({ "title": "Angelus", "xpReward": 15, "icon": "church", "timeOfDay": "afternoon" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = body_json(response).await;
    assert_eq!(item["completed"], false);
    assert_eq!(item["dayOfWeek"].as_array().unwrap().len(), 7);

    let routine = body_json(app.clone().oneshot(get("/api/routine")).await.unwrap()).await;
    assert_eq!(routine.as_array().unwrap().len(), 4);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/routine/{}", item["id"].as_str().unwrap()))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let routine = body_json(app.oneshot(get("/api/routine")).await.unwrap()).await;
    assert_eq!(routine.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_intentions_and_prayer() {
    let (app, _state) = create_test_app();
    app.clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/api/intentions", json!({ "content": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/intentions",
            json!({ "content": "Pela paz no mundo" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let intention = body_json(response).await;
    assert_eq!(intention["category"], "geral");
    assert_eq!(intention["authorName"], "Ana Maria");

    let uri = format!("/api/intentions/{}/pray", intention["id"].as_str().unwrap());
    let prayed = body_json(app.clone().oneshot(post_empty(&uri)).await.unwrap()).await;
    assert_eq!(prayed["isPrayedByUser"], true);
    assert_eq!(prayed["prayingCount"], 1);

    let feed = body_json(app.clone().oneshot(get("/api/intentions")).await.unwrap()).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["prayingCount"], 1);

    let unknown = app
        .oneshot(post_empty("/api/intentions/missing/pray"))
        .await
        .unwrap();
    assert_eq!(body_json(unknown).await, Value::Null);
}

#[tokio::test]
async fn test_premium_upgrade() {
    let (app, _state) = create_test_app();
    app.clone()
        .oneshot(post_json("/api/onboarding", onboarding_body("ana@example.com")))
        .await
        .unwrap();

    let response = app.oneshot(post_empty("/api/premium")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["isPremium"], true);
    assert_eq!(profile["subscriptionStatus"], "active");
}

#[tokio::test]
async fn test_assistant_routes_fall_back_offline() {
    let (app, _state) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "message": "Como rezar?" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_json(response).await["reply"].as_str().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(post_json("/api/chat", json!({ "message": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let director = body_json(
        app.oneshot(post_json("/api/director", json!({ "message": "Estou cansado" })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(director["verse"], "Salmo 23");
}

#[tokio::test]
async fn test_daily_inspiration_shows_once() {
    let (app, _state) = create_test_app();

    let first = body_json(
        app.clone()
            .oneshot(get("/api/inspiration?saint=S%C3%A3o%20Bento&gospel=Jo%203%2C16"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["show"], true);
    assert!(first["reflection"].is_string());
    assert!(first["theme"].is_string());

    let second = body_json(app.oneshot(get("/api/inspiration")).await.unwrap()).await;
    assert_eq!(second["show"], false);
    assert!(second.get("reflection").is_none());
}

#[tokio::test]
async fn test_places_lookup() {
    let (app, _state) = create_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/places?lat=-23.5&lng=-46.6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parishes = body_json(response).await;
    assert_eq!(parishes.as_array().unwrap().len(), 1);

    let response = app.oneshot(get("/api/places?lat=91&lng=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_password_accepts_padded_email() {
    let (app, _state) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/reset-password",
            json!({ "email": "  Ana@Example.com " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(post_json(
            "/api/auth/reset-password",
            json!({ "email": "not-an-email" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_onboarding_with_padded_email_logs_in_normalized() {
    let (app, _state) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/onboarding", onboarding_body(" Ana@Example.com ")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ana@example.com", "password": "1234" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
