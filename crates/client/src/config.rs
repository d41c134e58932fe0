//! Client configuration.
//!
//! # Environment Variables
//!
//! - `ESSENCE_API_URL` - Storefront base URL (default: `http://localhost:5000`)
//! - `ESSENCE_SYNC_DEBOUNCE_MS` - Quiet period before a cart push (default: 500)

use std::time::Duration;

use crate::error::ClientError;

/// Base URL the browser build talks to.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Quiet period after the last cart mutation before it is pushed.
pub const DEFAULT_SYNC_DEBOUNCE: Duration = Duration::from_millis(500);

/// Storefront client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Storefront origin, without a trailing slash
    pub base_url: String,
    /// Debounce window for cart pushes
    pub sync_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            sync_debounce: DEFAULT_SYNC_DEBOUNCE,
        }
    }
}

impl ClientConfig {
    /// Configuration for a storefront at `base_url` with the default debounce.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            sync_debounce: DEFAULT_SYNC_DEBOUNCE,
        }
    }

    /// Replace the debounce window.
    #[must_use]
    pub const fn with_sync_debounce(mut self, debounce: Duration) -> Self {
        self.sync_debounce = debounce;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the debounce is not a whole number
    /// of milliseconds.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("ESSENCE_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map_or_else(|| DEFAULT_BASE_URL.to_owned(), normalize_base_url);

        let sync_debounce = match std::env::var("ESSENCE_SYNC_DEBOUNCE_MS") {
            Ok(raw) => parse_debounce(&raw)?,
            Err(_) => DEFAULT_SYNC_DEBOUNCE,
        };

        Ok(Self {
            base_url,
            sync_debounce,
        })
    }
}

fn normalize_base_url(url: String) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.len() == url.len() {
        url
    } else {
        trimmed.to_owned()
    }
}

fn parse_debounce(raw: &str) -> Result<Duration, ClientError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ClientError::Config("ESSENCE_SYNC_DEBOUNCE_MS".to_owned(), e.to_string()))
}
