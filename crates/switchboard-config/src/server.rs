use std::net::SocketAddr;

use secrecy::SecretString;
use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind, defaults to `0.0.0.0:8080`
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    /// Shared secret for the admin endpoints; they are not mounted without it
    #[serde(default)]
    pub admin_secret: Option<SecretString>,
}

impl ServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}
