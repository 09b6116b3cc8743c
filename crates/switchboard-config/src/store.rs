use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Backend for rotation cursors and failure counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local map (single instance only)
    #[default]
    Memory,
    /// Redis (shared across instances)
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL, required for the redis backend
    #[serde(default)]
    pub url: Option<Url>,
    /// Prefix prepended to every key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound for a single store round-trip
    #[serde(default = "default_timeout", deserialize_with = "duration_str::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            key_prefix: default_key_prefix(),
            timeout: default_timeout(),
        }
    }
}

fn default_key_prefix() -> String {
    "switchboard".to_owned()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(2)
}
