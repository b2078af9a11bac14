// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapping between remote (snake_case) rows and in-memory entities.
//!
//! This is the single boundary where untyped backend data becomes typed
//! `UserProfile`, `RoutineItem` and `PrayerIntention` values. Missing columns
//! get defaults here; values of the wrong type are rejected here.

use crate::models::user::{DEFAULT_NEXT_LEVEL_XP, DEFAULT_SPIRITUAL_MATURITY};
use crate::models::{
    ActionLink, PrayerIntention, RoutineIcon, RoutineItem, SubscriptionStatus, TimeOfDay,
    UserProfile,
};
use crate::time_utils::{format_utc_rfc3339, parse_utc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name given to profiles that arrive without one.
pub const DEFAULT_PROFILE_NAME: &str = "Peregrino";

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

// ─── Profiles ────────────────────────────────────────────────

/// A row of the remote `profiles` table. Every column except `id` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level_xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_maturity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_saint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_routine_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_confession_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confession_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_of_life: Option<String>,
}

/// Columns written by a profile update. Identity, join date and billing
/// fields are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub level: u32,
    pub current_xp: u32,
    pub streak_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spiritual_maturity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patron_saint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spiritual_focus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spiritual_goal: Option<String>,
    pub last_routine_update: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_confession_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confession_frequency: Option<String>,
}

/// Decode an untyped `profiles` row.
pub fn decode_profile_value(
    value: Value,
    email: &str,
    now: DateTime<Utc>,
) -> Result<UserProfile, CodecError> {
    let row: ProfileRow = serde_json::from_value(value)?;
    decode_profile(row, email, now)
}

/// Convert a `profiles` row into a `UserProfile`, filling defaults for
/// missing columns. The email comes from the auth record, not the row.
pub fn decode_profile(
    row: ProfileRow,
    email: &str,
    now: DateTime<Utc>,
) -> Result<UserProfile, CodecError> {
    if row.id.trim().is_empty() {
        return Err(CodecError::InvalidField {
            field: "id",
            reason: "empty".to_string(),
        });
    }

    let joined_date = row
        .joined_date
        .as_deref()
        .and_then(parse_utc)
        .unwrap_or(now);
    let last_routine_update = row
        .last_routine_update
        .as_deref()
        .and_then(parse_utc)
        .unwrap_or(joined_date);

    Ok(UserProfile {
        id: row.id,
        name: non_blank(row.name).unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
        email: email.to_string(),
        phone: non_blank(row.phone),
        bio: None,
        photo_url: None,
        level: clamp_u32(row.level, 1, 1),
        current_xp: clamp_u32(row.current_xp, 0, 0),
        next_level_xp: clamp_u32(row.next_level_xp, DEFAULT_NEXT_LEVEL_XP, 1),
        streak_days: clamp_u32(row.streak_days, 0, 0),
        spiritual_maturity: non_blank(row.spiritual_maturity)
            .or_else(|| Some(DEFAULT_SPIRITUAL_MATURITY.to_string())),
        spiritual_focus: non_blank(row.spiritual_focus),
        spiritual_goal: non_blank(row.spiritual_goal),
        patron_saint: non_blank(row.patron_saint),
        state_of_life: non_blank(row.state_of_life),
        confession_frequency: non_blank(row.confession_frequency),
        joined_date,
        last_routine_update,
        last_confession_at: row.last_confession_at.as_deref().and_then(parse_utc),
        is_premium: row.is_premium.unwrap_or(false),
        subscription_status: row
            .subscription_status
            .as_deref()
            .and_then(SubscriptionStatus::parse)
            .unwrap_or_default(),
    })
}

/// Full row for inserting a new profile.
pub fn encode_profile(profile: &UserProfile) -> ProfileRow {
    ProfileRow {
        id: profile.id.clone(),
        name: Some(profile.name.clone()),
        phone: profile.phone.clone(),
        level: Some(i64::from(profile.level)),
        current_xp: Some(i64::from(profile.current_xp)),
        next_level_xp: Some(i64::from(profile.next_level_xp)),
        streak_days: Some(i64::from(profile.streak_days)),
        spiritual_maturity: profile.spiritual_maturity.clone(),
        patron_saint: profile.patron_saint.clone(),
        spiritual_focus: profile.spiritual_focus.clone(),
        spiritual_goal: profile.spiritual_goal.clone(),
        last_routine_update: Some(format_utc_rfc3339(profile.last_routine_update)),
        last_confession_at: profile.last_confession_at.map(format_utc_rfc3339),
        confession_frequency: profile.confession_frequency.clone(),
        is_premium: Some(profile.is_premium),
        subscription_status: Some(profile.subscription_status.as_str().to_string()),
        joined_date: Some(format_utc_rfc3339(profile.joined_date)),
        state_of_life: profile.state_of_life.clone(),
    }
}

/// Mutable columns for a profile update.
pub fn encode_profile_update(profile: &UserProfile) -> ProfileUpdate {
    ProfileUpdate {
        name: profile.name.clone(),
        phone: profile.phone.clone(),
        level: profile.level,
        current_xp: profile.current_xp,
        streak_days: profile.streak_days,
        spiritual_maturity: profile.spiritual_maturity.clone(),
        patron_saint: profile.patron_saint.clone(),
        spiritual_focus: profile.spiritual_focus.clone(),
        spiritual_goal: profile.spiritual_goal.clone(),
        last_routine_update: format_utc_rfc3339(profile.last_routine_update),
        last_confession_at: profile.last_confession_at.map(format_utc_rfc3339),
        confession_frequency: profile.confession_frequency.clone(),
    }
}

// ─── Routine Items ───────────────────────────────────────────

/// A row of the remote `routine_items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub xp_reward: i64,
    #[serde(default)]
    pub completed: bool,
    pub icon: String,
    pub time_of_day: String,
    #[serde(default)]
    pub day_of_week: Vec<i64>,
    #[serde(default)]
    pub action_link: Option<String>,
}

pub fn decode_routine_value(value: Value) -> Result<RoutineItem, CodecError> {
    let row: RoutineRow = serde_json::from_value(value)?;
    decode_routine(row)
}

pub fn decode_routine(row: RoutineRow) -> Result<RoutineItem, CodecError> {
    let invalid = |field, reason: String| CodecError::InvalidField { field, reason };

    let xp_reward = u32::try_from(row.xp_reward)
        .ok()
        .filter(|xp| *xp > 0)
        .ok_or_else(|| invalid("xp_reward", row.xp_reward.to_string()))?;
    let icon: RoutineIcon = row.icon.parse().map_err(|e| invalid("icon", format!("{e}")))?;
    let time_of_day: TimeOfDay = row
        .time_of_day
        .parse()
        .map_err(|e| invalid("time_of_day", format!("{e}")))?;
    let action_link = match row.action_link.as_deref() {
        Some(raw) => raw.parse().unwrap_or_default(),
        None => ActionLink::None,
    };
    let day_of_week = row
        .day_of_week
        .into_iter()
        .map(|d| {
            u8::try_from(d)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or_else(|| invalid("day_of_week", d.to_string()))
        })
        .collect::<Result<_, _>>()?;

    Ok(RoutineItem {
        id: row.id,
        title: row.title,
        description: row.description.unwrap_or_default(),
        xp_reward,
        completed: row.completed,
        icon,
        time_of_day,
        day_of_week,
        action_link,
    })
}

pub fn encode_routine(user_id: &str, item: &RoutineItem) -> RoutineRow {
    RoutineRow {
        id: item.id.clone(),
        user_id: user_id.to_string(),
        title: item.title.clone(),
        description: Some(item.description.clone()),
        xp_reward: i64::from(item.xp_reward),
        completed: item.completed,
        icon: item.icon.as_str().to_string(),
        time_of_day: item.time_of_day.as_str().to_string(),
        day_of_week: item.day_of_week.iter().map(|d| i64::from(*d)).collect(),
        action_link: Some(item.action_link.as_str().to_string()),
    }
}

// ─── Prayer Intentions ───────────────────────────────────────

/// A row of the remote `prayer_intentions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentionRow {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub praying_count: Option<i64>,
}

pub fn decode_intention_value(
    value: Value,
    prayed_by_viewer: bool,
    now: DateTime<Utc>,
) -> Result<PrayerIntention, CodecError> {
    let row: IntentionRow = serde_json::from_value(value)?;
    Ok(PrayerIntention {
        id: row.id,
        user_id: row.user_id,
        author_name: non_blank(row.author_name).unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
        author_photo_url: non_blank(row.author_photo_url),
        content: row.content,
        category: non_blank(row.category).unwrap_or_else(|| "geral".to_string()),
        created_at: row.created_at.as_deref().and_then(parse_utc).unwrap_or(now),
        praying_count: clamp_u32(row.praying_count, 0, 0),
        is_prayed_by_user: prayed_by_viewer,
    })
}

pub fn encode_intention(intention: &PrayerIntention) -> IntentionRow {
    IntentionRow {
        id: intention.id.clone(),
        user_id: intention.user_id.clone(),
        author_name: Some(intention.author_name.clone()),
        author_photo_url: intention.author_photo_url.clone(),
        content: intention.content.clone(),
        category: Some(intention.category.clone()),
        created_at: Some(format_utc_rfc3339(intention.created_at)),
        praying_count: Some(i64::from(intention.praying_count)),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Default when missing, clamp to `[min, u32::MAX]` otherwise.
fn clamp_u32(value: Option<i64>, default: u32, min: u32) -> u32 {
    match value {
        Some(v) => v.clamp(i64::from(min), i64::from(u32::MAX)) as u32,
        None => default,
    }
}
