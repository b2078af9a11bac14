// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optimistic mutations of the signed-in user's state.
//!
//! Each mutation is applied to the in-memory profile, routine and intention
//! list first, in one synchronous step. Persistence then runs on a spawned
//! task whose handle is returned. Persistence failures are logged and never
//! roll the in-memory state back, so the local view may run ahead of the
//! backend. Two rapid mutations of the same entity may reach the backend out
//! of order.

use crate::models::{NewRoutineItem, PrayerIntention, RoutineItem, UserProfile};
use crate::services::content::{new_intention, ContentService};
use crate::services::session::SessionManager;
use std::future::Future;
use tokio::task::JoinHandle;

/// Result of toggling a routine item.
#[derive(Debug)]
pub struct ToggleOutcome {
    pub item: RoutineItem,
    /// Experience actually applied after clamping.
    pub xp_delta: i64,
    pub profile: UserProfile,
    pub persistence: JoinHandle<()>,
}

/// Result of toggling the user's prayer for an intention.
#[derive(Debug)]
pub struct PrayOutcome {
    pub intention: PrayerIntention,
    pub persistence: JoinHandle<()>,
}

/// In-memory view of one user's state plus the services that persist it.
pub struct OptimisticCoordinator {
    sessions: SessionManager,
    content: ContentService,
    profile: UserProfile,
    routine: Vec<RoutineItem>,
    intentions: Vec<PrayerIntention>,
}

impl OptimisticCoordinator {
    pub fn new(
        sessions: SessionManager,
        content: ContentService,
        profile: UserProfile,
        routine: Vec<RoutineItem>,
        intentions: Vec<PrayerIntention>,
    ) -> Self {
        Self {
            sessions,
            content,
            profile,
            routine,
            intentions,
        }
    }

    /// Build the view for `profile` from persisted routine and intentions.
    pub async fn load(sessions: SessionManager, content: ContentService, profile: UserProfile) -> Self {
        let (routine, intentions) = futures_util::join!(
            content.fetch_routine(&profile.id),
            content.fetch_intentions(&profile.id)
        );
        tracing::debug!(
            user_id = %profile.id,
            items = routine.len(),
            intentions = intentions.len(),
            "Loaded user state"
        );
        Self::new(sessions, content, profile, routine, intentions)
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn routine(&self) -> &[RoutineItem] {
        &self.routine
    }

    pub fn intentions(&self) -> &[PrayerIntention] {
        &self.intentions
    }

    /// Flip an item and move the profile's experience by its reward.
    ///
    /// Unknown ids are a no-op and return `None`.
    pub fn toggle_routine_item(&mut self, item_id: &str) -> Option<ToggleOutcome> {
        let item = self.routine.iter_mut().find(|i| i.id == item_id)?;
        item.completed = !item.completed;
        let item = item.clone();

        let reward = i64::from(item.xp_reward);
        let delta = if item.completed { reward } else { -reward };
        let mut profile = self.profile.clone();
        let xp_delta = profile.apply_xp_delta(delta);
        self.profile = self.cache_locally(profile);

        tracing::debug!(
            user_id = %self.profile.id,
            item_id,
            completed = item.completed,
            xp_delta,
            "Toggled routine item"
        );

        let sessions = self.sessions.clone();
        let content = self.content.clone();
        let profile = self.profile.clone();
        let (user_id, completed) = (self.profile.id.clone(), item.completed);
        let id = item.id.clone();
        let persistence = spawn_persistence("toggle_routine_item", async move {
            if let Err(e) = sessions.sync_remote_profile(&profile).await {
                tracing::warn!(user_id = %profile.id, error = %e, "Remote profile sync failed");
            }
            content.set_item_status(&user_id, &id, completed).await
        });

        Some(ToggleOutcome {
            item,
            xp_delta,
            profile: self.profile.clone(),
            persistence,
        })
    }

    /// Flip the user's prayer for an intention and adjust its counter.
    pub fn toggle_pray(&mut self, intention_id: &str) -> Option<PrayOutcome> {
        let intention = self.intentions.iter_mut().find(|i| i.id == intention_id)?;
        let praying = intention.toggle_prayed();
        let intention = intention.clone();

        let content = self.content.clone();
        let user_id = self.profile.id.clone();
        let id = intention.id.clone();
        let persistence = spawn_persistence("toggle_pray", async move {
            content.set_prayer(&id, &user_id, praying).await
        });

        Some(PrayOutcome {
            intention,
            persistence,
        })
    }

    pub fn add_routine_item(&mut self, new_item: NewRoutineItem) -> (RoutineItem, JoinHandle<()>) {
        let item = new_item.into_item();
        self.routine.push(item.clone());

        let content = self.content.clone();
        let user_id = self.profile.id.clone();
        let persisted = item.clone();
        let persistence = spawn_persistence("add_routine_item", async move {
            content.insert_item(&user_id, &persisted).await
        });
        (item, persistence)
    }

    /// Remove an item. Unknown ids are a no-op and return `None`.
    pub fn remove_routine_item(&mut self, item_id: &str) -> Option<JoinHandle<()>> {
        let index = self.routine.iter().position(|i| i.id == item_id)?;
        self.routine.remove(index);

        let content = self.content.clone();
        let user_id = self.profile.id.clone();
        let id = item_id.to_string();
        Some(spawn_persistence("remove_routine_item", async move {
            content.delete_item(&user_id, &id).await
        }))
    }

    /// Replace the whole profile (e.g. after an edit screen).
    pub fn replace_profile(&mut self, profile: UserProfile) -> JoinHandle<()> {
        self.profile = self.cache_locally(profile);

        let sessions = self.sessions.clone();
        let profile = self.profile.clone();
        spawn_persistence("replace_profile", async move {
            sessions.sync_remote_profile(&profile).await
        })
    }

    /// Publish a new intention at the top of the feed.
    pub fn push_intention(&mut self, content: &str, category: &str) -> (PrayerIntention, JoinHandle<()>) {
        let intention = new_intention(&self.profile, content, category);
        self.intentions.insert(0, intention.clone());

        let service = self.content.clone();
        let persisted = intention.clone();
        let persistence = spawn_persistence("push_intention", async move {
            service.insert_intention(&persisted).await
        });
        (intention, persistence)
    }

    /// Write the profile into the local session cache. A failed local write
    /// is logged; the in-memory profile still advances.
    fn cache_locally(&self, profile: UserProfile) -> UserProfile {
        match self.sessions.cache_profile(profile.clone()) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::error!(user_id = %profile.id, error = %e, "Failed to cache profile");
                profile
            }
        }
    }
}

fn spawn_persistence<F, E>(operation: &'static str, work: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display,
{
    tokio::spawn(async move {
        if let Err(e) = work.await {
            tracing::warn!(operation, error = %e, "Background persistence failed");
        }
    })
}
