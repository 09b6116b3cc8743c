use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Identity provider used to validate bearer tokens
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Provider base URL; tokens are checked against `{url}/auth/v1/user`
    pub url: Url,
    /// Public API key sent in the `apikey` header
    pub anon_key: SecretString,
    /// How long a validated token stays cached
    #[serde(default = "default_cache_ttl", deserialize_with = "duration_str::deserialize_duration")]
    pub cache_ttl: Duration,
    /// Maximum number of cached tokens
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

const fn default_cache_capacity() -> u64 {
    10_000
}
