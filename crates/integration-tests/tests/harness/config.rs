//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;
use switchboard_config::{Config, HealthConfig, ServerConfig};

pub const ADMIN_SECRET: &str = "admin-secret";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal config with admin endpoints enabled and UTC quota windows
    pub fn new() -> Self {
        let mut config = Config {
            server: ServerConfig {
                listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                health: HealthConfig {
                    enabled: true,
                    ..HealthConfig::default()
                },
                admin_secret: Some(SecretString::from(ADMIN_SECRET)),
                ..ServerConfig::default()
            },
            ..Config::default()
        };
        config.quota.time_zone = Some("UTC".to_owned());
        config.llm.upstream_timeout = Duration::from_secs(5);

        Self { config }
    }

    /// Drop admin endpoints
    pub fn without_admin(mut self) -> Self {
        self.config.server.admin_secret = None;
        self
    }

    /// Tighten hub keepalive timings
    pub fn with_hub_timings(mut self, ping_period: Duration, pong_wait: Duration) -> Self {
        self.config.hub.ping_period = ping_period;
        self.config.hub.pong_wait = pong_wait;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
