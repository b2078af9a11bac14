// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dual-mode persistence of routines and community intentions.
//!
//! Dispatches on the same fixed mode as [`SessionManager`]. Reads degrade to
//! empty lists; writes return an error for the caller to log.

use crate::db::codec;
use crate::db::local::StoredIntention;
use crate::db::{BackendGateway, GatewayError, StorageError};
use crate::models::{NewRoutineItem, PrayerIntention, RoutineItem, UserProfile};
use crate::services::session::SessionManager;
use chrono::Utc;

/// Intentions shown in the community feed.
const INTENTION_FEED_LIMIT: u32 = 50;

/// Content write errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Clone)]
pub struct ContentService {
    sessions: SessionManager,
}

impl ContentService {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    // ─── Routine ────────────────────────────────────────────────

    pub async fn fetch_routine(&self, user_id: &str) -> Vec<RoutineItem> {
        let BackendGateway::Connected(client) = self.sessions.gateway() else {
            return self.sessions.store().load_routine(user_id);
        };

        let rows = match client
            .fetch_routine_rows(&self.sessions.access_token(), user_id)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to fetch routine");
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| match codec::decode_routine_value(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Skipping unreadable routine row");
                    None
                }
            })
            .collect()
    }

    /// Replace the user's whole routine.
    pub async fn save_routine(&self, user_id: &str, items: &[RoutineItem]) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                let rows: Vec<_> = items
                    .iter()
                    .map(|item| codec::encode_routine(user_id, item))
                    .collect();
                client
                    .replace_routine(&self.sessions.access_token(), user_id, &rows)
                    .await?;
            }
            BackendGateway::Uninitialized => {
                self.sessions.store().save_routine(user_id, items)?;
            }
        }
        tracing::debug!(user_id, items = items.len(), "Routine saved");
        Ok(())
    }

    pub async fn set_item_status(
        &self,
        user_id: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                client
                    .update_routine_status(&self.sessions.access_token(), item_id, completed)
                    .await?;
            }
            BackendGateway::Uninitialized => {
                self.sessions.store().update_routine(user_id, |items| {
                    let item = items
                        .iter_mut()
                        .find(|i| i.id == item_id)
                        .ok_or_else(|| ContentError::NotFound(item_id.to_string()))?;
                    item.completed = completed;
                    Ok::<_, ContentError>(())
                })?;
            }
        }
        Ok(())
    }

    /// Create an item with a fresh id and persist it.
    pub async fn add_item(
        &self,
        user_id: &str,
        new_item: NewRoutineItem,
    ) -> Result<RoutineItem, ContentError> {
        let item = new_item.into_item();
        self.insert_item(user_id, &item).await?;
        Ok(item)
    }

    /// Persist an item that already has its id.
    pub async fn insert_item(&self, user_id: &str, item: &RoutineItem) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                client
                    .insert_routine_rows(
                        &self.sessions.access_token(),
                        &[codec::encode_routine(user_id, item)],
                    )
                    .await?;
            }
            BackendGateway::Uninitialized => {
                self.sessions
                    .store()
                    .update_routine(user_id, |items| {
                        items.retain(|i| i.id != item.id);
                        items.push(item.clone());
                        Ok::<_, ContentError>(())
                    })?;
            }
        }
        Ok(())
    }

    pub async fn delete_item(&self, user_id: &str, item_id: &str) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                client
                    .delete_routine_row(&self.sessions.access_token(), item_id)
                    .await?;
            }
            BackendGateway::Uninitialized => {
                self.sessions
                    .store()
                    .update_routine(user_id, |items| {
                        items.retain(|i| i.id != item_id);
                        Ok::<_, ContentError>(())
                    })?;
            }
        }
        Ok(())
    }

    // ─── Intentions ─────────────────────────────────────────────

    /// Community feed, newest first, resolved for `user_id`.
    pub async fn fetch_intentions(&self, user_id: &str) -> Vec<PrayerIntention> {
        let BackendGateway::Connected(client) = self.sessions.gateway() else {
            let mut intentions: Vec<_> = self
                .sessions
                .store()
                .load_intentions()
                .iter()
                .map(|stored| stored.view_for(user_id))
                .collect();
            intentions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            return intentions;
        };

        let token = self.sessions.access_token();
        let rows = match client.fetch_intention_rows(&token, INTENTION_FEED_LIMIT).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch intentions");
                return Vec::new();
            }
        };
        let prayed = match client.fetch_prayed_ids(&token, user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to fetch prayer interactions");
                Vec::new()
            }
        };

        let now = Utc::now();
        rows.into_iter()
            .filter_map(|row| {
                let prayed_by_viewer = row
                    .get("id")
                    .and_then(|id| id.as_str())
                    .is_some_and(|id| prayed.iter().any(|p| p == id));
                codec::decode_intention_value(row, prayed_by_viewer, now)
                    .map_err(|e| tracing::warn!(error = %e, "Skipping unreadable intention row"))
                    .ok()
            })
            .collect()
    }

    /// Build and persist a new intention by `author`.
    pub async fn create_intention(
        &self,
        author: &UserProfile,
        content: &str,
        category: &str,
    ) -> Result<PrayerIntention, ContentError> {
        let intention = new_intention(author, content, category);
        self.insert_intention(&intention).await?;
        Ok(intention)
    }

    pub async fn insert_intention(&self, intention: &PrayerIntention) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                client
                    .insert_intention(
                        &self.sessions.access_token(),
                        &codec::encode_intention(intention),
                    )
                    .await?;
            }
            BackendGateway::Uninitialized => {
                let mut stored = StoredIntention {
                    intention: intention.clone(),
                    prayed_by: Default::default(),
                };
                if intention.is_prayed_by_user {
                    stored.prayed_by.insert(intention.user_id.clone());
                }
                stored.intention.is_prayed_by_user = false;
                self.sessions
                    .store()
                    .update_intentions(|intentions| {
                        intentions.retain(|s| s.intention.id != intention.id);
                        intentions.push(stored);
                        Ok::<_, ContentError>(())
                    })?;
            }
        }
        Ok(())
    }

    /// Flip `user_id`'s prayer for an intention. Returns the new state.
    pub async fn toggle_prayer(&self, intention_id: &str, user_id: &str) -> Result<bool, ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                let prayed = client
                    .fetch_prayed_ids(&self.sessions.access_token(), user_id)
                    .await?;
                let praying = !prayed.iter().any(|id| id == intention_id);
                self.set_prayer(intention_id, user_id, praying).await?;
                Ok(praying)
            }
            // Read and flip under one lock so two toggles never agree on a state.
            BackendGateway::Uninitialized => {
                self.sessions.store().update_intentions(|intentions| {
                    let stored = find_intention(intentions, intention_id)?;
                    let praying = !stored.prayed_by.contains(user_id);
                    record_prayer(stored, user_id, praying);
                    Ok::<_, ContentError>(praying)
                })
            }
        }
    }

    /// Record whether `user_id` prays for an intention. Idempotent.
    pub async fn set_prayer(
        &self,
        intention_id: &str,
        user_id: &str,
        praying: bool,
    ) -> Result<(), ContentError> {
        match self.sessions.gateway() {
            BackendGateway::Connected(client) => {
                client
                    .set_prayer_interaction(
                        &self.sessions.access_token(),
                        intention_id,
                        user_id,
                        praying,
                    )
                    .await?;
            }
            BackendGateway::Uninitialized => {
                self.sessions.store().update_intentions(|intentions| {
                    let stored = find_intention(intentions, intention_id)?;
                    record_prayer(stored, user_id, praying);
                    Ok::<_, ContentError>(())
                })?;
            }
        }
        Ok(())
    }
}

fn find_intention<'a>(
    intentions: &'a mut [StoredIntention],
    intention_id: &str,
) -> Result<&'a mut StoredIntention, ContentError> {
    intentions
        .iter_mut()
        .find(|s| s.intention.id == intention_id)
        .ok_or_else(|| ContentError::NotFound(intention_id.to_string()))
}

/// Add or remove `user_id` from the prayer set, adjusting the count only on change.
fn record_prayer(stored: &mut StoredIntention, user_id: &str, praying: bool) {
    let changed = if praying {
        stored.prayed_by.insert(user_id.to_string())
    } else {
        stored.prayed_by.remove(user_id)
    };
    if changed {
        stored.intention.praying_count = if praying {
            stored.intention.praying_count.saturating_add(1)
        } else {
            stored.intention.praying_count.saturating_sub(1)
        };
    }
}

/// A fresh intention authored by `author`, not yet persisted.
pub fn new_intention(author: &UserProfile, content: &str, category: &str) -> PrayerIntention {
    PrayerIntention {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: author.id.clone(),
        author_name: author.name.clone(),
        author_photo_url: author.photo_url.clone(),
        content: content.trim().to_string(),
        category: category.trim().to_string(),
        created_at: Utc::now(),
        praying_count: 0,
        is_prayed_by_user: false,
    }
}
