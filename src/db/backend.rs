// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote auth and table-storage backend.
//!
//! Provides typed operations for:
//! - Auth (password sign-in, sign-up, sign-out, recovery, password change)
//! - Profiles
//! - Routine items
//! - Prayer intentions and interactions
//!
//! The gateway is constructed once at startup. Without configuration it is
//! `Uninitialized` and callers take their local fallback path instead.

use crate::config::Config;
use crate::db::codec::{IntentionRow, ProfileRow, ProfileUpdate, RoutineRow};
use crate::db::tables;
use crate::time_utils::now_millis;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session lifetime assumed when the backend reports none (1 day).
const DEFAULT_SESSION_TTL_MS: i64 = 86_400_000;

/// Backend errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend rejected request (HTTP {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected backend response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Machine-readable error code from the backend, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

/// Lifecycle of the backend client, fixed for the process lifetime.
#[derive(Clone)]
pub enum BackendGateway {
    Connected(SupabaseClient),
    Uninitialized,
}

impl BackendGateway {
    /// Connect when both backend secrets are configured.
    pub fn from_config(config: &Config) -> Self {
        match config.backend_credentials() {
            Some((url, key)) => {
                tracing::info!(url, "Auth backend configured");
                BackendGateway::Connected(SupabaseClient::new(url, key))
            }
            None => {
                tracing::warn!("Auth backend not configured, using local fallback store");
                BackendGateway::Uninitialized
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, BackendGateway::Connected(_))
    }
}

/// A session issued by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    /// Epoch milliseconds
    pub expires_at: i64,
}

/// Result of a sign-up. `session` is absent while e-mail confirmation is pending.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user_id: String,
    pub session: Option<RemoteSession>,
}

#[derive(Debug, Deserialize)]
struct AuthUserRecord {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Epoch seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUserRecord,
}

impl TokenResponse {
    fn into_session(self, now_ms: i64) -> RemoteSession {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at * 1000,
            (None, Some(secs)) => now_ms + secs * 1000,
            (None, None) => now_ms + DEFAULT_SESSION_TTL_MS,
        };
        RemoteSession {
            user_id: self.user.id,
            email: self.user.email,
            access_token: self.access_token,
            expires_at,
        }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct PrayedRow {
    intention_id: String,
}

/// Auth + PostgREST client for the backend.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    // ─── Auth ────────────────────────────────────────────────────

    /// Sign in with normalized email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, GatewayError> {
        let response = self
            .auth_request(Method::POST, "token", "")
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_session(now_millis()))
    }

    /// Register a new account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, GatewayError> {
        let response = self
            .auth_request(Method::POST, "signup", "")
            .json(&Credentials { email, password })
            .send()
            .await?;

        let body: Value = check_response_json(response).await?;
        parse_sign_up(body, now_millis())
    }

    /// Revoke the session identified by `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), GatewayError> {
        let response = self
            .auth_request(Method::POST, "logout", access_token)
            .send()
            .await?;
        check_response(response).await
    }

    /// Send a password recovery e-mail.
    pub async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut request = self.auth_request(Method::POST, "recover", "");
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = request
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        check_response(response).await
    }

    /// Change the password of the signed-in user.
    pub async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .auth_request(Method::PUT, "user", access_token)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;
        check_response(response).await
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Fetch the raw profile row of a user.
    pub async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Value>, GatewayError> {
        let response = self
            .rest_request(Method::GET, tables::PROFILES, access_token)
            .query(&[("select", "*"), ("id", eq(user_id).as_str())])
            .send()
            .await?;

        let rows: Vec<Value> = check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_profile(
        &self,
        access_token: &str,
        row: &ProfileRow,
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::POST, tables::PROFILES, access_token)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        check_response(response).await
    }

    pub async fn update_profile(
        &self,
        access_token: &str,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), GatewayError> {
        self.patch_by_id(tables::PROFILES, access_token, user_id, update)
            .await
    }

    pub async fn set_premium(&self, access_token: &str, user_id: &str) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "is_premium": true, "subscription_status": "active" });
        self.patch_by_id(tables::PROFILES, access_token, user_id, &body)
            .await
    }

    // ─── Routine Items ───────────────────────────────────────────

    /// Fetch raw routine rows for a user.
    pub async fn fetch_routine_rows(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, GatewayError> {
        let response = self
            .rest_request(Method::GET, tables::ROUTINE_ITEMS, access_token)
            .query(&[("select", "*"), ("user_id", eq(user_id).as_str())])
            .send()
            .await?;
        check_response_json(response).await
    }

    /// Replace a user's routine: delete existing rows, then insert `rows`.
    pub async fn replace_routine(
        &self,
        access_token: &str,
        user_id: &str,
        rows: &[RoutineRow],
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::DELETE, tables::ROUTINE_ITEMS, access_token)
            .query(&[("user_id", eq(user_id).as_str())])
            .send()
            .await?;
        check_response(response).await?;

        if rows.is_empty() {
            return Ok(());
        }
        self.insert_routine_rows(access_token, rows).await
    }

    pub async fn insert_routine_rows(
        &self,
        access_token: &str,
        rows: &[RoutineRow],
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::POST, tables::ROUTINE_ITEMS, access_token)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        check_response(response).await
    }

    pub async fn update_routine_status(
        &self,
        access_token: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "completed": completed });
        self.patch_by_id(tables::ROUTINE_ITEMS, access_token, item_id, &body)
            .await
    }

    pub async fn delete_routine_row(
        &self,
        access_token: &str,
        item_id: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::DELETE, tables::ROUTINE_ITEMS, access_token)
            .query(&[("id", eq(item_id).as_str())])
            .send()
            .await?;
        check_response(response).await
    }

    // ─── Prayer Intentions ───────────────────────────────────────

    /// Fetch the most recent intentions, newest first.
    pub async fn fetch_intention_rows(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<Value>, GatewayError> {
        let response = self
            .rest_request(Method::GET, tables::PRAYER_INTENTIONS, access_token)
            .query(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        check_response_json(response).await
    }

    /// Ids of the intentions `user_id` is praying for.
    pub async fn fetch_prayed_ids(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let response = self
            .rest_request(Method::GET, tables::PRAYER_INTERACTIONS, access_token)
            .query(&[("select", "intention_id"), ("user_id", eq(user_id).as_str())])
            .send()
            .await?;
        let rows: Vec<PrayedRow> = check_response_json(response).await?;
        Ok(rows.into_iter().map(|r| r.intention_id).collect())
    }

    pub async fn insert_intention(
        &self,
        access_token: &str,
        row: &IntentionRow,
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::POST, tables::PRAYER_INTENTIONS, access_token)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        check_response(response).await
    }

    /// Record or withdraw a user's prayer for an intention. Idempotent.
    ///
    /// The aggregate `praying_count` is maintained by the backend.
    pub async fn set_prayer_interaction(
        &self,
        access_token: &str,
        intention_id: &str,
        user_id: &str,
        praying: bool,
    ) -> Result<(), GatewayError> {
        let request = if praying {
            self.rest_request(Method::POST, tables::PRAYER_INTERACTIONS, access_token)
                .header("Prefer", "resolution=ignore-duplicates,return=minimal")
                .json(&serde_json::json!([{ "intention_id": intention_id, "user_id": user_id }]))
        } else {
            self.rest_request(Method::DELETE, tables::PRAYER_INTERACTIONS, access_token)
                .query(&[
                    ("intention_id", eq(intention_id).as_str()),
                    ("user_id", eq(user_id).as_str()),
                ])
        };
        check_response(request.send().await?).await
    }

    // ─── Request Helpers ─────────────────────────────────────────

    fn auth_request(&self, method: Method, endpoint: &str, access_token: &str) -> RequestBuilder {
        let url = format!("{}/auth/v1/{}", self.base_url, endpoint);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(access_token))
    }

    fn rest_request(&self, method: Method, table: &str, access_token: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(access_token))
    }

    async fn patch_by_id<T: Serialize + ?Sized>(
        &self,
        table: &str,
        access_token: &str,
        id: &str,
        body: &T,
    ) -> Result<(), GatewayError> {
        let response = self
            .rest_request(Method::PATCH, table, access_token)
            .query(&[("id", eq(id).as_str())])
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check_response(response).await
    }

    /// Requests without a user token fall back to the anonymous key.
    fn bearer<'a>(&'a self, access_token: &'a str) -> &'a str {
        if access_token.is_empty() {
            &self.anon_key
        } else {
            access_token
        }
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn parse_sign_up(body: Value, now_ms: i64) -> Result<SignUpOutcome, GatewayError> {
    if body.get("access_token").is_some() {
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let session = token.into_session(now_ms);
        return Ok(SignUpOutcome {
            user_id: session.user_id.clone(),
            session: Some(session),
        });
    }

    // Confirmation pending: the body is the bare user (or wraps it).
    let user = body.get("user").cloned().unwrap_or(body);
    let user: AuthUserRecord =
        serde_json::from_value(user).map_err(|e| GatewayError::Decode(e.to_string()))?;
    Ok(SignUpOutcome {
        user_id: user.id,
        session: None,
    })
}

/// Check response status and return error if not successful.
async fn check_response(response: Response) -> Result<(), GatewayError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(rejection(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    if !response.status().is_success() {
        return Err(rejection(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| GatewayError::Decode(format!("JSON parse error: {}", e)))
}

async fn rejection(response: Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (code, message) = parse_error_body(status, &body);
    GatewayError::Rejected {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Pull the error code and message out of the backend's several error shapes.
fn parse_error_body(status: StatusCode, body: &str) -> (Option<String>, String) {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (None, format!("HTTP {}: {}", status, body));
    };
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| json.get(*n).and_then(Value::as_str))
            .map(str::to_string)
    };
    let code = field(&["error_code", "error", "code"]);
    let message = field(&["msg", "error_description", "message"])
        .unwrap_or_else(|| format!("HTTP {}", status));
    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unconfigured_gateway_is_uninitialized() {
        let gateway = BackendGateway::from_config(&Config::test_default());
        assert!(!gateway.is_connected());
        assert!(matches!(gateway, BackendGateway::Uninitialized));
    }

    #[test]
    fn test_error_code_and_status_only_for_rejections() {
        let rejected = GatewayError::Rejected {
            status: 422,
            code: Some("email_exists".into()),
            message: "User already registered".into(),
        };
        assert_eq!(rejected.code(), Some("email_exists"));
        assert_eq!(rejected.status(), Some(422));

        let network = GatewayError::Network("timed out".into());
        assert_eq!(network.code(), None);
        assert_eq!(network.status(), None);
    }

    #[test]
    fn test_sign_up_with_session() {
        let outcome = parse_sign_up(
            json!({
                "access_token": "tok",
                "expires_at": 2_000,
                "user": { "id": "u1", "email": "a@a.com" }
            }),
            0,
        )
        .unwrap();

        assert_eq!(outcome.user_id, "u1");
        let session = outcome.session.unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.expires_at, 2_000_000);
    }

    #[test]
    fn test_sign_up_pending_confirmation() {
        let outcome = parse_sign_up(json!({ "id": "u1", "email": "a@a.com" }), 0).unwrap();
        assert_eq!(outcome.user_id, "u1");
        assert!(outcome.session.is_none());
    }

    #[test]
    fn test_token_expiry_from_expires_in() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "tok",
            "expires_in": 3600,
            "user": { "id": "u1" }
        }))
        .unwrap();
        assert_eq!(token.into_session(1_000).expires_at, 1_000 + 3_600_000);
    }

    #[test]
    fn test_error_body_shapes() {
        let (code, message) = parse_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(code.as_deref(), Some("invalid_grant"));
        assert_eq!(message, "Invalid login credentials");

        let (code, message) = parse_error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
        );
        assert_eq!(code.as_deref(), Some("user_already_exists"));
        assert_eq!(message, "User already registered");

        let (code, message) = parse_error_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(code.is_none());
        assert!(message.contains("upstream down"));
    }
}
