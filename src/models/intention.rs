//! Community prayer intentions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A prayer request shared with the community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrayerIntention {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    /// Aggregate number of people praying.
    pub praying_count: u32,
    /// Whether the viewing user is praying for this intention.
    #[serde(default)]
    pub is_prayed_by_user: bool,
}

impl PrayerIntention {
    /// Flip the viewer's praying flag and adjust the aggregate counter.
    ///
    /// Returns the new praying state.
    pub fn toggle_prayed(&mut self) -> bool {
        self.is_prayed_by_user = !self.is_prayed_by_user;
        self.praying_count = if self.is_prayed_by_user {
            self.praying_count.saturating_add(1)
        } else {
            self.praying_count.saturating_sub(1)
        };
        self.is_prayed_by_user
    }
}
