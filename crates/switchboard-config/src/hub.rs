use std::time::Duration;

use serde::Deserialize;

/// WebSocket hub timing and buffer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Time allowed to write one frame
    #[serde(default = "default_write_wait", deserialize_with = "duration_str::deserialize_duration")]
    pub write_wait: Duration,
    /// Time allowed between inbound frames before the session is dropped
    #[serde(default = "default_pong_wait", deserialize_with = "duration_str::deserialize_duration")]
    pub pong_wait: Duration,
    /// Interval between server pings, must be shorter than `pong_wait`
    #[serde(default = "default_ping_period", deserialize_with = "duration_str::deserialize_duration")]
    pub ping_period: Duration,
    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Outbound queue length per session
    #[serde(default = "default_buffer")]
    pub send_buffer: usize,
    /// Queue length of the coordinator's broadcast channel
    #[serde(default = "default_buffer")]
    pub broadcast_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            write_wait: default_write_wait(),
            pong_wait: default_pong_wait(),
            ping_period: default_ping_period(),
            max_message_size: default_max_message_size(),
            send_buffer: default_buffer(),
            broadcast_buffer: default_buffer(),
        }
    }
}

const fn default_write_wait() -> Duration {
    Duration::from_secs(10)
}

const fn default_pong_wait() -> Duration {
    Duration::from_secs(60)
}

const fn default_ping_period() -> Duration {
    Duration::from_secs(54)
}

const fn default_max_message_size() -> usize {
    512 * 1024
}

const fn default_buffer() -> usize {
    256
}
