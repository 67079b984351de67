//! Configuration for the sync engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::SyncError;

/// Environment variable holding the console backend base URL.
const ENV_API_URL: &str = "CLERKDESK_API_URL";
/// Environment variable holding the operator bearer credential.
const ENV_API_TOKEN: &str = "CLERKDESK_API_TOKEN";
/// Environment variable overriding the long-poll server wait, in seconds.
const ENV_POLL_WAIT: &str = "CLERKDESK_POLL_WAIT_SECS";
/// Environment variable overriding the unread refresh interval, in seconds.
const ENV_UNREAD_INTERVAL: &str = "CLERKDESK_UNREAD_INTERVAL_SECS";

/// Default backend base URL.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Configuration for the conversation sync engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the console backend.
    pub base_url: String,
    /// Operator bearer credential attached to every request.
    pub bearer_token: String,
    /// Server-side wait budget for the long-poll call.
    #[serde(with = "duration_serde")]
    pub long_poll_wait: Duration,
    /// Client-side allowance on top of the server wait before the long-poll
    /// request itself is considered failed.
    #[serde(with = "duration_serde")]
    pub long_poll_margin: Duration,
    /// Fixed delay before re-entering the long poll after a failure.
    #[serde(with = "duration_serde")]
    pub poll_backoff: Duration,
    /// Interval between unread-counter refreshes.
    #[serde(with = "duration_serde")]
    pub unread_refresh_interval: Duration,
    /// Request timeout for ordinary (non-long-poll) calls.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token: String::new(),
            long_poll_wait: Duration::from_secs(30),
            long_poll_margin: Duration::from_secs(10),
            poll_backoff: Duration::from_secs(2),
            unread_refresh_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `CLERKDESK_*` environment variables, falling back
    /// to defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.base_url = url;
        }
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            config.bearer_token = token;
        }
        if let Some(secs) = read_secs(ENV_POLL_WAIT) {
            config.long_poll_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs(ENV_UNREAD_INTERVAL) {
            config.unread_refresh_interval = Duration::from_secs(secs);
        }
        config
    }

    /// Set the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the operator bearer credential.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = token.into();
        self
    }

    /// Set the long-poll server wait budget.
    #[must_use]
    pub const fn with_long_poll_wait(mut self, wait: Duration) -> Self {
        self.long_poll_wait = wait;
        self
    }

    /// Set the fixed backoff applied after a failed poll cycle.
    #[must_use]
    pub const fn with_poll_backoff(mut self, backoff: Duration) -> Self {
        self.poll_backoff = backoff;
        self
    }

    /// Set the unread refresh interval.
    #[must_use]
    pub const fn with_unread_refresh_interval(mut self, interval: Duration) -> Self {
        self.unread_refresh_interval = interval;
        self
    }

    /// Set the timeout for ordinary requests.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Total client-side timeout applied to the long-poll request.
    ///
    /// The server is the authority on the wait budget; the margin only guards
    /// against a poll that never comes back at all.
    #[must_use]
    pub const fn long_poll_timeout(&self) -> Duration {
        self.long_poll_wait.saturating_add(self.long_poll_margin)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is not a valid http(s) URL or any
    /// interval is zero.
    pub fn validate(&self) -> Result<(), SyncError> {
        let url = Url::parse(&self.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::Validation(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if self.long_poll_wait.is_zero() {
            return Err(SyncError::Validation(
                "long_poll_wait must be > 0".to_string(),
            ));
        }
        if self.unread_refresh_interval.is_zero() {
            return Err(SyncError::Validation(
                "unread_refresh_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read a seconds-valued environment variable, ignoring unparseable values.
fn read_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
