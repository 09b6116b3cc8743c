use std::time::Duration;

use serde::Deserialize;

/// LLM proxy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Timeout for one upstream chat-completion call
    #[serde(default = "default_upstream_timeout", deserialize_with = "duration_str::deserialize_duration")]
    pub upstream_timeout: Duration,
    /// Capacity of the background usage-recording queue
    #[serde(default = "default_usage_buffer")]
    pub usage_buffer: usize,
    /// Failure count at which a key is flagged for operator attention
    #[serde(default = "default_failure_alert_threshold")]
    pub failure_alert_threshold: i64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: default_upstream_timeout(),
            usage_buffer: default_usage_buffer(),
            failure_alert_threshold: default_failure_alert_threshold(),
        }
    }
}

const fn default_upstream_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_usage_buffer() -> usize {
    1024
}

const fn default_failure_alert_threshold() -> i64 {
    5
}
