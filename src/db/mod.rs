//! Storage layer: the remote auth/table backend and the local durable store.

pub mod backend;
pub mod codec;
pub mod local;

pub use backend::{BackendGateway, GatewayError, SupabaseClient};
pub use local::{LocalSessionStore, StorageError};

/// Remote table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const ROUTINE_ITEMS: &str = "routine_items";
    pub const PRAYER_INTENTIONS: &str = "prayer_intentions";
    pub const PRAYER_INTERACTIONS: &str = "prayer_interactions";
}

/// Local storage keys as constants.
pub mod keys {
    /// Current session blob
    pub const SESSION: &str = "espiritualizei_session";
    /// Fallback user table (profiles with credentials)
    pub const USERS: &str = "espiritualizei_users_db";
    /// Last day the daily inspiration was shown
    pub const DAILY_INSPIRATION: &str = "espiritualizei_daily_inspiration_date";
    /// Fallback routines, keyed by user id
    pub const ROUTINES: &str = "espiritualizei_routines";
    /// Fallback community intentions
    pub const INTENTIONS: &str = "espiritualizei_intentions";
}
