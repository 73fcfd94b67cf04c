//! Client configuration types.
//!
//! The `tutorchat` binary reads and writes `tutorchat.toml` using these
//! types. File location and persistence live in the binary crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "tutorchat.toml";

/// API base URL used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8001/api";

/// Top-level client configuration (persisted as `tutorchat.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub identity: IdentitySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry schedule for idempotent reads (session list and session detail).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_delays_secs")]
    pub delays_secs: Vec<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delays_secs: default_delays_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IdentitySettings {
    #[serde(default)]
    pub username: String,
    /// Sent as a bearer credential when non-empty.
    #[serde(default)]
    pub token: String,
}

impl IdentitySettings {
    pub fn is_signed_in(&self) -> bool {
        !self.username.trim().is_empty()
    }

    pub fn token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    2
}
fn default_delays_secs() -> Vec<u64> {
    vec![1, 2]
}

/// Normalise a user-supplied base URL: trim whitespace and trailing slashes.
pub fn normalize_server_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Apply compatibility fallbacks after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut ClientConfig) -> bool {
    let mut changed = false;

    let normalized = normalize_server_url(&config.server.url);
    if normalized.is_empty() {
        config.server.url = default_server_url();
        changed = true;
    } else if normalized != config.server.url {
        config.server.url = normalized;
        changed = true;
    }

    if config.server.timeout_secs == 0 {
        config.server.timeout_secs = default_timeout_secs();
        changed = true;
    }

    changed
}
