// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local durable key-value store.
//!
//! Holds the current session (both modes) and, in fallback mode, the
//! registered user table, routines and community intentions. Every record is
//! read and written whole; reads that fail to parse are treated as absent.
//!
//! Writers on clones of one store are serialized by a shared lock, and the
//! `update_*` methods hold it across load, change and save so concurrent
//! background writes never drop each other's changes.
//!
//! Fallback credentials are stored in plaintext. There is no trust boundary
//! in fallback mode; this store must not be shared between parties.

use crate::db::keys;
use crate::models::{AuthSession, PrayerIntention, RoutineItem, UserProfile};
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Local storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A user registered in fallback mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUserRecord {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub password: String,
}

/// A community intention as kept in fallback mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIntention {
    #[serde(flatten)]
    pub intention: PrayerIntention,
    #[serde(default)]
    pub prayed_by: BTreeSet<String>,
}

impl StoredIntention {
    /// Resolve the per-viewer flag and aggregate for `user_id`.
    pub fn view_for(&self, user_id: &str) -> PrayerIntention {
        let mut intention = self.intention.clone();
        intention.is_prayed_by_user = self.prayed_by.contains(user_id);
        intention.praying_count = intention.praying_count.max(self.prayed_by.len() as u32);
        intention
    }
}

enum StorageBackend {
    /// One JSON file per key inside a directory.
    Disk(PathBuf),
    /// Process-local map, used by tests and ephemeral runs.
    Memory(DashMap<String, String>),
}

/// Local durable store. Cheap to clone; clones share the same backing.
#[derive(Clone)]
pub struct LocalSessionStore {
    backend: Arc<StorageBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl LocalSessionStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        tracing::info!(path = %dir.display(), "Opened local store");
        Ok(Self {
            backend: Arc::new(StorageBackend::Disk(dir)),
            write_lock: Arc::default(),
        })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(StorageBackend::Memory(DashMap::new())),
            write_lock: Arc::default(),
        }
    }

    // ─── Raw Key-Value Operations ───────────────────────────────

    /// Read the raw value stored under `key`.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        match self.backend.as_ref() {
            StorageBackend::Disk(dir) => match fs::read_to_string(file_for(dir, key)) {
                Ok(value) => Some(value),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => {
                    tracing::warn!(key, error = %e, "Unreadable local record, treating as absent");
                    None
                }
            },
            StorageBackend::Memory(map) => map.get(key).map(|v| v.value().clone()),
        }
    }

    /// Replace the raw value stored under `key`. Last writer wins.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.exclusive(|| self.store_raw(key, value))
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.exclusive(|| self.delete_raw(key))
    }

    /// Run `f` while holding the write lock. A poisoned lock is still usable
    /// since every record is replaced whole.
    fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn store_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self.backend.as_ref() {
            StorageBackend::Disk(dir) => {
                // Write to a sibling file and rename so readers never see a torn record.
                let target = file_for(dir, key);
                let tmp = target.with_extension("json.tmp");
                fs::write(&tmp, value)
                    .and_then(|_| fs::rename(&tmp, &target))
                    .map_err(|source| StorageError::Io {
                        key: key.to_string(),
                        source,
                    })
            }
            StorageBackend::Memory(map) => {
                map.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn delete_raw(&self, key: &str) -> Result<(), StorageError> {
        match self.backend.as_ref() {
            StorageBackend::Disk(dir) => match fs::remove_file(file_for(dir, key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                }),
            },
            StorageBackend::Memory(map) => {
                map.remove(key);
                Ok(())
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Corrupted local record, treating as absent");
                None
            }
        }
    }

    /// Caller must hold the write lock.
    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store_raw(key, &raw)
    }

    /// Load the record under `key`, apply `f` and save the result, all under
    /// the write lock. A missing or corrupted record starts from the default.
    /// Nothing is written when `f` fails.
    fn update_json<T, R, E>(&self, key: &str, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        T: Default + Serialize + DeserializeOwned,
        E: From<StorageError>,
    {
        self.exclusive(|| {
            let mut value = self.read_json(key).unwrap_or_default();
            let out = f(&mut value)?;
            self.write_json(key, &value)?;
            Ok(out)
        })
    }

    // ─── Session ────────────────────────────────────────────────

    /// The stored session, if present and parseable. Expiry is not checked.
    pub fn load_session(&self) -> Option<AuthSession> {
        self.read_json(keys::SESSION)
    }

    pub fn save_session(&self, session: &AuthSession) -> Result<(), StorageError> {
        self.exclusive(|| self.write_json(keys::SESSION, session))
    }

    /// Apply `f` to the stored session and save it. Returns `None` without
    /// writing when no session is stored, so a concurrent logout sticks.
    pub fn update_session<R>(
        &self,
        f: impl FnOnce(&mut AuthSession) -> R,
    ) -> Result<Option<R>, StorageError> {
        self.exclusive(|| {
            let Some(mut session) = self.load_session() else {
                return Ok(None);
            };
            let out = f(&mut session);
            self.write_json(keys::SESSION, &session)?;
            Ok(Some(out))
        })
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        self.remove(keys::SESSION)
    }

    // ─── Fallback User Table ────────────────────────────────────

    pub fn load_users(&self) -> Vec<LocalUserRecord> {
        self.read_json(keys::USERS).unwrap_or_default()
    }

    pub fn save_users(&self, users: &[LocalUserRecord]) -> Result<(), StorageError> {
        self.exclusive(|| self.write_json(keys::USERS, users))
    }

    /// Change the user table atomically with respect to other writers.
    pub fn update_users<R, E>(
        &self,
        f: impl FnOnce(&mut Vec<LocalUserRecord>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        self.update_json(keys::USERS, f)
    }

    /// Find a user by already-normalized email.
    pub fn find_user_by_email(&self, email: &str) -> Option<LocalUserRecord> {
        self.load_users()
            .into_iter()
            .find(|u| u.profile.email.trim().eq_ignore_ascii_case(email))
    }

    /// Replace the stored profile of an existing user, keeping credentials.
    ///
    /// Returns `false` when the user is unknown.
    pub fn replace_user_profile(&self, profile: &UserProfile) -> Result<bool, StorageError> {
        self.update_users(|users| {
            let Some(record) = users.iter_mut().find(|u| u.profile.id == profile.id) else {
                return Ok(false);
            };
            record.profile = profile.clone();
            Ok(true)
        })
    }

    // ─── Fallback Routines ──────────────────────────────────────

    pub fn load_routine(&self, user_id: &str) -> Vec<RoutineItem> {
        let mut all: HashMap<String, Vec<RoutineItem>> =
            self.read_json(keys::ROUTINES).unwrap_or_default();
        all.remove(user_id).unwrap_or_default()
    }

    pub fn save_routine(&self, user_id: &str, items: &[RoutineItem]) -> Result<(), StorageError> {
        self.update_routine(user_id, |current| {
            *current = items.to_vec();
            Ok(())
        })
    }

    /// Change one user's routine. Other users' routines share the record and
    /// are carried through untouched.
    pub fn update_routine<R, E>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut Vec<RoutineItem>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        self.update_json(keys::ROUTINES, |all: &mut HashMap<String, Vec<RoutineItem>>| {
            f(all.entry(user_id.to_string()).or_default())
        })
    }

    // ─── Fallback Intentions ────────────────────────────────────

    pub fn load_intentions(&self) -> Vec<StoredIntention> {
        self.read_json(keys::INTENTIONS).unwrap_or_default()
    }

    pub fn save_intentions(&self, intentions: &[StoredIntention]) -> Result<(), StorageError> {
        self.exclusive(|| self.write_json(keys::INTENTIONS, intentions))
    }

    pub fn update_intentions<R, E>(
        &self,
        f: impl FnOnce(&mut Vec<StoredIntention>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        self.update_json(keys::INTENTIONS, f)
    }

    // ─── Daily Inspiration ──────────────────────────────────────

    /// Returns `true` the first time it is called on a given day and records
    /// the day; later calls on the same day return `false`.
    pub fn take_daily_inspiration(&self, today: NaiveDate) -> bool {
        let today = today.format("%Y-%m-%d").to_string();
        self.exclusive(|| {
            if self.get_raw(keys::DAILY_INSPIRATION).as_deref() == Some(today.as_str()) {
                return false;
            }
            if let Err(e) = self.store_raw(keys::DAILY_INSPIRATION, &today) {
                tracing::warn!(error = %e, "Failed to record daily inspiration date");
            }
            true
        })
    }
}

fn file_for(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::routine::every_day;
    use crate::models::{ActionLink, OnboardingData, RoutineIcon, SubscriptionStatus, TimeOfDay};
    use chrono::Utc;

    fn profile(id: &str, email: &str) -> UserProfile {
        let data = OnboardingData {
            name: "Ana".into(),
            email: email.into(),
            password: "1234".into(),
            ..Default::default()
        };
        UserProfile::new_registered(id.into(), email.into(), &data, Utc::now())
    }

    #[test]
    fn test_corrupted_session_reads_as_absent() {
        let store = LocalSessionStore::in_memory();
        store.put_raw(keys::SESSION, "{not json").unwrap();
        assert!(store.load_session().is_none());
    }

    #[test]
    fn test_session_round_trips_dates() {
        let store = LocalSessionStore::in_memory();
        let mut user = profile("u1", "ana@example.com");
        user.last_confession_at = Some(Utc::now());
        let session = AuthSession {
            user,
            token: String::new(),
            expires_at: 42,
        };
        store.save_session(&session).unwrap();

        assert_eq!(store.load_session(), Some(session));
        store.clear_session().unwrap();
        assert!(store.load_session().is_none());
        // Clearing twice is fine.
        store.clear_session().unwrap();
    }

    #[test]
    fn test_user_table_keeps_password_and_replaces_profile() {
        let store = LocalSessionStore::in_memory();
        store
            .save_users(&[LocalUserRecord {
                profile: profile("u1", "ana@example.com"),
                password: "1234".into(),
            }])
            .unwrap();

        let mut updated = profile("u1", "ana@example.com");
        updated.subscription_status = SubscriptionStatus::Active;
        assert!(store.replace_user_profile(&updated).unwrap());
        assert!(!store.replace_user_profile(&profile("u2", "x@y.com")).unwrap());

        let found = store.find_user_by_email("ANA@example.com").unwrap();
        assert_eq!(found.password, "1234");
        assert_eq!(found.profile.subscription_status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_daily_inspiration_once_per_day() {
        let store = LocalSessionStore::in_memory();
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();

        assert!(store.take_daily_inspiration(day));
        assert!(!store.take_daily_inspiration(day));
        assert!(store.take_daily_inspiration(day.succ_opt().unwrap()));
    }

    #[test]
    fn test_concurrent_routine_updates_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::open(dir.path()).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let user = if t % 2 == 0 { "u1" } else { "u2" };
                    for i in 0..10 {
                        store
                            .update_routine(user, |items| {
                                items.push(RoutineItem {
                                    id: format!("{t}-{i}"),
                                    title: "Angelus".into(),
                                    description: String::new(),
                                    xp_reward: 10,
                                    completed: false,
                                    icon: RoutineIcon::Sun,
                                    time_of_day: TimeOfDay::Afternoon,
                                    day_of_week: every_day(),
                                    action_link: ActionLink::None,
                                });
                                Ok::<_, StorageError>(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load_routine("u1").len(), 80);
        assert_eq!(store.load_routine("u2").len(), 80);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let store = LocalSessionStore::in_memory();
        store
            .save_users(&[LocalUserRecord {
                profile: profile("u1", "ana@example.com"),
                password: "1234".into(),
            }])
            .unwrap();

        let result: Result<(), crate::error::SessionError> = store.update_users(|users| {
            users.clear();
            Err(crate::error::SessionError::DuplicateEmail)
        });
        assert!(result.is_err());
        assert_eq!(store.load_users().len(), 1);
    }

    #[test]
    fn test_update_session_skips_missing_session() {
        let store = LocalSessionStore::in_memory();
        assert_eq!(store.update_session(|s| s.expires_at = 1).unwrap(), None);
        assert!(store.load_session().is_none());
    }

    #[test]
    fn test_disk_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::open(dir.path()).unwrap();
        store.put_raw(keys::USERS, "[]").unwrap();

        let reopened = LocalSessionStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_raw(keys::USERS).as_deref(), Some("[]"));
        reopened.remove(keys::USERS).unwrap();
        assert!(store.get_raw(keys::USERS).is_none());
    }
}
