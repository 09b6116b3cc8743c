use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// PostgREST-compatible database API
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Base URL, e.g. `https://project.supabase.co/rest/v1/`
    pub url: Url,
    /// Service role key sent as both `apikey` and bearer token
    pub service_key: SecretString,
    #[serde(default = "default_timeout", deserialize_with = "duration_str::deserialize_duration")]
    pub timeout: Duration,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
