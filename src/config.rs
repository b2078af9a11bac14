//! Application configuration loaded from environment variables.
//!
//! Three independent secrets gate three independent capabilities: the auth
//! backend, generative text and places lookup. Each one degrades on its own.

use std::env;
use std::path::PathBuf;

const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_ROUTINE_MODEL: &str = "gemini-3-pro-preview";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and password-reset redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Directory holding the local durable store
    pub data_dir: PathBuf,
    /// Model used for chat and short texts
    pub chat_model: String,
    /// Model used for routine generation
    pub routine_model: String,

    // --- Secrets (each optional) ---
    /// Auth/table backend base URL
    pub supabase_url: Option<String>,
    /// Auth/table backend anonymous key
    pub supabase_anon_key: Option<String>,
    /// Generative text API key
    pub gemini_api_key: Option<String>,
    /// Places lookup API key
    pub google_maps_key: Option<String>,
}

impl Config {
    /// All-offline config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            data_dir: PathBuf::from(".espiritualizei-test"),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            routine_model: DEFAULT_ROUTINE_MODEL.to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            gemini_api_key: None,
            google_maps_key: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // First populated value among the accepted names wins.
        let secret = |names: &[&str]| {
            names
                .iter()
                .copied()
                .filter_map(&lookup)
                .find(|v| is_populated(v))
                .map(|v| v.trim().to_string())
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => 8080,
        };

        Ok(Self {
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            port,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".espiritualizei")),
            chat_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            routine_model: lookup("GEMINI_ROUTINE_MODEL")
                .unwrap_or_else(|| DEFAULT_ROUTINE_MODEL.to_string()),

            supabase_url: secret(&["SUPABASE_URL", "VITE_SUPABASE_URL"]),
            supabase_anon_key: secret(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]),
            gemini_api_key: secret(&["GEMINI_API_KEY", "API_KEY"]),
            google_maps_key: secret(&["GOOGLE_MAPS_KEY", "VITE_GOOGLE_MAPS_KEY"]),
        })
    }

    /// Connected mode needs both backend secrets.
    pub fn backend_credentials(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

/// A secret counts as configured only if it is not blank or a stringified
/// placeholder left behind by a build pipeline.
pub fn is_populated(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v != "undefined" && v != "null" && v != "[object Object]"
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
