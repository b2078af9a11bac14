//! User profile, session and onboarding models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Experience needed to leave level 1.
pub const DEFAULT_NEXT_LEVEL_XP: u32 = 100;

/// Maturity label given to every new account.
pub const DEFAULT_SPIRITUAL_MATURITY: &str = "Iniciante";

/// Subscription state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    #[default]
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Parse a wire value; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trial" => Some(SubscriptionStatus::Trial),
            "active" => Some(SubscriptionStatus::Active),
            "canceled" | "cancelled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// Identity and progression snapshot of a user.
///
/// This is the in-memory (camelCase) shape. The remote `profiles` row shape
/// lives in [`crate::db::codec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub level: u32,
    #[serde(rename = "currentXP")]
    pub current_xp: u32,
    #[serde(rename = "nextLevelXP")]
    pub next_level_xp: u32,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_maturity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_saint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_of_life: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confession_frequency: Option<String>,
    pub joined_date: DateTime<Utc>,
    pub last_routine_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_confession_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
}

impl UserProfile {
    /// Build the profile of a freshly registered account.
    pub fn new_registered(id: String, email: String, data: &OnboardingData, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name.trim().to_string(),
            email,
            phone: non_empty(data.phone.as_deref()),
            bio: None,
            photo_url: None,
            level: 1,
            current_xp: 0,
            next_level_xp: DEFAULT_NEXT_LEVEL_XP,
            streak_days: 0,
            spiritual_maturity: Some(DEFAULT_SPIRITUAL_MATURITY.to_string()),
            spiritual_focus: non_empty(Some(&data.primary_struggle)),
            spiritual_goal: non_empty(Some(&data.spiritual_goal)),
            patron_saint: non_empty(Some(&data.patron_saint)),
            state_of_life: non_empty(Some(&data.state_of_life)),
            confession_frequency: non_empty(Some(&data.confession_frequency)),
            joined_date: now,
            last_routine_update: now,
            last_confession_at: None,
            is_premium: false,
            subscription_status: SubscriptionStatus::Trial,
        }
    }

    /// Apply a signed experience delta, clamping at zero.
    ///
    /// Returns the delta that was actually applied.
    pub fn apply_xp_delta(&mut self, delta: i64) -> i64 {
        let before = i64::from(self.current_xp);
        let after = (before + delta).clamp(0, i64::from(u32::MAX));
        self.current_xp = after as u32;
        after - before
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Authenticated session. `expires_at` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthSession {
    pub user: UserProfile,
    /// Opaque credential; empty in fallback mode is allowed.
    #[serde(default)]
    pub token: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_at: i64,
}

impl AuthSession {
    /// Whether the session has expired at `now_ms`. The store never purges
    /// expired sessions; callers decide.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Answers collected during onboarding. Consumed once at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingData {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub state_of_life: String,
    #[serde(default)]
    pub primary_struggle: String,
    #[serde(default)]
    pub spiritual_goal: String,
    #[serde(default)]
    pub patron_saint: String,
    #[serde(default)]
    pub confession_frequency: String,
}

impl OnboardingData {
    /// The form registration validates and stores: name and password trimmed,
    /// email trimmed and lowercased.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.trim().to_string(),
            ..self.clone()
        }
    }
}
