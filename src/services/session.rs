// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dual-mode session and profile management.
//!
//! The mode is fixed when the manager is built:
//! - Connected: auth and profiles live in the remote backend; the local
//!   store mirrors the current session as a cache.
//! - Fallback: the local store is the system of record, including a plain
//!   user/password table.
//!
//! Every operation dispatches on the mode exactly once and never touches the
//! other backing path.

use crate::db::backend::{RemoteSession, SupabaseClient};
use crate::db::codec;
use crate::db::local::LocalUserRecord;
use crate::db::{BackendGateway, GatewayError, LocalSessionStore, StorageError};
use crate::error::SessionError;
use crate::models::{AuthSession, OnboardingData, SubscriptionStatus, UserProfile};
use crate::time_utils::now_millis;
use chrono::Utc;
use validator::Validate;

/// Lifetime of a fallback session (7 days).
const LOCAL_SESSION_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Name used when a connected account has no readable profile row.
const MINIMAL_PROFILE_NAME: &str = "Usuário";

/// Which backing path serves session operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Connected,
    Fallback,
}

/// Owner of the canonical `AuthSession` for the running process.
#[derive(Clone)]
pub struct SessionManager {
    gateway: BackendGateway,
    store: LocalSessionStore,
    redirect_url: Option<String>,
}

impl SessionManager {
    pub fn new(gateway: BackendGateway, store: LocalSessionStore) -> Self {
        let mode = if gateway.is_connected() {
            SessionMode::Connected
        } else {
            SessionMode::Fallback
        };
        tracing::info!(mode = ?mode, "Session manager initialized");
        Self {
            gateway,
            store,
            redirect_url: None,
        }
    }

    /// Where password-recovery e-mails send the user back to.
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn mode(&self) -> SessionMode {
        match self.gateway {
            BackendGateway::Connected(_) => SessionMode::Connected,
            BackendGateway::Uninitialized => SessionMode::Fallback,
        }
    }

    pub fn store(&self) -> &LocalSessionStore {
        &self.store
    }

    pub fn gateway(&self) -> &BackendGateway {
        &self.gateway
    }

    // ─── Login / Registration ───────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, SessionError> {
        let email = normalize_email(email);
        let password = password.trim();

        let session = match &self.gateway {
            BackendGateway::Connected(client) => {
                self.login_remote(client, &email, password).await?
            }
            BackendGateway::Uninitialized => self.login_local(&email, password)?,
        };

        self.store.save_session(&session)?;
        tracing::info!(user_id = %session.user.id, mode = ?self.mode(), "User logged in");
        Ok(session)
    }

    async fn login_remote(
        &self,
        client: &SupabaseClient,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        let remote = client
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| match e.status() {
                Some(400 | 401) => SessionError::InvalidCredentials,
                _ => SessionError::from_gateway(e),
            })?;

        let user = self.load_remote_profile(client, &remote, email).await;
        Ok(AuthSession {
            user,
            token: remote.access_token,
            expires_at: remote.expires_at,
        })
    }

    /// Fetch and decode the profile row, degrading to a minimal profile when
    /// it is missing or unreadable.
    async fn load_remote_profile(
        &self,
        client: &SupabaseClient,
        remote: &RemoteSession,
        email: &str,
    ) -> UserProfile {
        let email = remote.email.as_deref().unwrap_or(email);
        let now = Utc::now();

        match client.fetch_profile(&remote.access_token, &remote.user_id).await {
            Ok(Some(row)) => match codec::decode_profile_value(row, email, now) {
                Ok(profile) => return profile,
                Err(e) => {
                    tracing::warn!(user_id = %remote.user_id, error = %e, "Unreadable profile row")
                }
            },
            Ok(None) => tracing::warn!(user_id = %remote.user_id, "No profile row for user"),
            Err(e) => {
                tracing::warn!(user_id = %remote.user_id, error = %e, "Failed to fetch profile")
            }
        }

        minimal_profile(&remote.user_id, email)
    }

    fn login_local(&self, email: &str, password: &str) -> Result<AuthSession, SessionError> {
        let record = self
            .store
            .find_user_by_email(email)
            .filter(|record| record.password == password)
            .ok_or(SessionError::InvalidCredentials)?;

        Ok(local_session(record.profile))
    }

    pub async fn register(&self, data: &OnboardingData) -> Result<AuthSession, SessionError> {
        let data = data.normalized();
        data.validate()
            .map_err(|e| SessionError::InvalidInput(e.to_string()))?;

        let (email, password) = (data.email.as_str(), data.password.as_str());
        let session = match &self.gateway {
            BackendGateway::Connected(client) => {
                self.register_remote(client, &data, email, password).await?
            }
            BackendGateway::Uninitialized => self.register_local(&data, email, password)?,
        };

        self.store.save_session(&session)?;
        tracing::info!(user_id = %session.user.id, mode = ?self.mode(), "User registered");
        Ok(session)
    }

    async fn register_remote(
        &self,
        client: &SupabaseClient,
        data: &OnboardingData,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        let outcome = client.sign_up(email, password).await.map_err(|e| {
            if is_duplicate_email(&e) {
                SessionError::DuplicateEmail
            } else {
                SessionError::from_gateway(e)
            }
        })?;

        let Some(remote) = outcome.session else {
            tracing::info!(user_id = %outcome.user_id, "Registration awaits e-mail confirmation");
            return Err(SessionError::RegistrationPending);
        };

        let profile =
            UserProfile::new_registered(outcome.user_id, email.to_string(), data, Utc::now());

        if let Err(e) = client
            .insert_profile(&remote.access_token, &codec::encode_profile(&profile))
            .await
        {
            tracing::warn!(user_id = %profile.id, error = %e, "Failed to create profile row");
        }

        Ok(AuthSession {
            user: profile,
            token: remote.access_token,
            expires_at: remote.expires_at,
        })
    }

    fn register_local(
        &self,
        data: &OnboardingData,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        let profile = self.store.update_users(|users| {
            if users
                .iter()
                .any(|u| u.profile.email.trim().eq_ignore_ascii_case(email))
            {
                return Err(SessionError::DuplicateEmail);
            }

            let id = uuid::Uuid::new_v4().to_string();
            let profile = UserProfile::new_registered(id, email.to_string(), data, Utc::now());
            users.push(LocalUserRecord {
                profile: profile.clone(),
                password: password.to_string(),
            });
            Ok(profile)
        })?;

        Ok(local_session(profile))
    }

    // ─── Logout / Session Access ────────────────────────────────

    /// Clear the local session, then best-effort revoke it remotely.
    pub async fn logout(&self) {
        let cached = self.store.load_session();

        if let Err(e) = self.store.clear_session() {
            tracing::error!(error = %e, "Failed to clear local session");
        }

        if let (BackendGateway::Connected(client), Some(session)) = (&self.gateway, cached) {
            if !session.token.is_empty() {
                if let Err(e) = client.sign_out(&session.token).await {
                    tracing::warn!(user_id = %session.user.id, error = %e, "Remote sign-out failed");
                }
            }
        }
        tracing::info!("User logged out");
    }

    /// The stored session, expired or not. Corrupted storage reads as `None`.
    pub fn get_session(&self) -> Option<AuthSession> {
        self.store.load_session()
    }

    /// The stored session unless it has expired at `now_ms`.
    pub fn active_session(&self, now_ms: i64) -> Option<AuthSession> {
        self.get_session().filter(|s| !s.is_expired(now_ms))
    }

    /// Token of the cached session, empty when signed out.
    pub fn access_token(&self) -> String {
        self.store
            .load_session()
            .map(|s| s.token)
            .unwrap_or_default()
    }

    // ─── Profile Updates ────────────────────────────────────────

    /// Write `profile` into the local session cache, and in fallback mode into
    /// the user table. Synchronous.
    ///
    /// The cached id is kept if `profile` carries a different one, and the
    /// earlier join date wins.
    pub fn cache_profile(&self, mut profile: UserProfile) -> Result<UserProfile, StorageError> {
        self.store.update_session(|session| {
            if session.user.id != profile.id {
                tracing::warn!(
                    cached = %session.user.id,
                    requested = %profile.id,
                    "Ignoring attempt to change profile id"
                );
                profile.id = session.user.id.clone();
            }
            profile.joined_date = profile.joined_date.min(session.user.joined_date);
            session.user = profile.clone();
        })?;

        if self.mode() == SessionMode::Fallback && !self.store.replace_user_profile(&profile)? {
            tracing::debug!(user_id = %profile.id, "Profile not in local user table");
        }
        Ok(profile)
    }

    /// Push `profile` to the backend. No-op in fallback mode.
    pub async fn sync_remote_profile(&self, profile: &UserProfile) -> Result<(), GatewayError> {
        let BackendGateway::Connected(client) = &self.gateway else {
            return Ok(());
        };
        client
            .update_profile(
                &self.access_token(),
                &profile.id,
                &codec::encode_profile_update(profile),
            )
            .await
    }

    /// Write through to the local cache now; sync the backend in the background.
    pub async fn update_profile(&self, profile: UserProfile) -> Result<UserProfile, SessionError> {
        let profile = self.cache_profile(profile)?;

        if self.mode() == SessionMode::Connected {
            let manager = self.clone();
            let remote = profile.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.sync_remote_profile(&remote).await {
                    tracing::warn!(user_id = %remote.id, error = %e, "Remote profile sync failed");
                }
            });
        }
        Ok(profile)
    }

    /// Mark the current user premium. Returns the updated profile, or `None`
    /// when nobody is signed in.
    pub async fn upgrade_to_premium(&self) -> Result<Option<UserProfile>, SessionError> {
        // Flip the flags on the stored copy so concurrent profile writes survive.
        let Some((profile, token)) = self.store.update_session(|session| {
            session.user.is_premium = true;
            session.user.subscription_status = SubscriptionStatus::Active;
            (session.user.clone(), session.token.clone())
        })?
        else {
            return Ok(None);
        };

        if self.mode() == SessionMode::Fallback && !self.store.replace_user_profile(&profile)? {
            tracing::debug!(user_id = %profile.id, "Profile not in local user table");
        }

        if let BackendGateway::Connected(client) = &self.gateway {
            if let Err(e) = client.set_premium(&token, &profile.id).await {
                tracing::warn!(user_id = %profile.id, error = %e, "Failed to record premium remotely");
            }
        }
        tracing::info!(user_id = %profile.id, "User upgraded to premium");
        Ok(Some(profile))
    }

    // ─── Passwords ──────────────────────────────────────────────

    /// Send a recovery e-mail. No-op in fallback mode.
    pub async fn reset_password(&self, email: &str) -> Result<(), SessionError> {
        let email = normalize_email(email);
        match &self.gateway {
            BackendGateway::Connected(client) => client
                .reset_password_for_email(&email, self.redirect_url.as_deref())
                .await
                .map_err(SessionError::from_gateway),
            BackendGateway::Uninitialized => {
                tracing::info!("Password reset is a no-op in fallback mode");
                Ok(())
            }
        }
    }

    /// Change the signed-in user's password. No-op in fallback mode.
    pub async fn set_password(&self, new_password: &str) -> Result<(), SessionError> {
        let new_password = new_password.trim();
        if new_password.is_empty() {
            return Err(SessionError::InvalidInput("password: empty".to_string()));
        }

        match &self.gateway {
            BackendGateway::Connected(client) => {
                let token = self.access_token();
                if token.is_empty() {
                    return Err(SessionError::AuthBackend("no active session".to_string()));
                }
                client
                    .update_password(&token, new_password)
                    .await
                    .map_err(SessionError::from_gateway)
            }
            BackendGateway::Uninitialized => {
                tracing::info!("Password change is a no-op in fallback mode");
                Ok(())
            }
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_duplicate_email(err: &GatewayError) -> bool {
    if matches!(err.code(), Some("user_already_exists" | "email_exists")) {
        return true;
    }
    matches!(err, GatewayError::Rejected { message, .. }
        if message.to_lowercase().contains("already registered"))
}

fn local_session(user: UserProfile) -> AuthSession {
    AuthSession {
        user,
        token: format!("local-{}", uuid::Uuid::new_v4()),
        expires_at: now_millis() + LOCAL_SESSION_TTL_MS,
    }
}

fn minimal_profile(user_id: &str, email: &str) -> UserProfile {
    let data = OnboardingData {
        name: MINIMAL_PROFILE_NAME.to_string(),
        ..Default::default()
    };
    UserProfile::new_registered(user_id.to_string(), email.to_string(), &data, Utc::now())
}
