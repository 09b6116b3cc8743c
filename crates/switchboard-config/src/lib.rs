#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod cors;
pub mod data;
mod env;
pub mod error;
pub mod health;
pub mod hub;
pub mod llm;
mod loader;
pub mod quota;
pub mod server;
pub mod store;
pub mod telemetry;

use serde::Deserialize;

pub use auth::*;
pub use cors::*;
pub use data::*;
pub use error::ConfigError;
pub use health::*;
pub use hub::*;
pub use llm::*;
pub use quota::*;
pub use server::*;
pub use store::*;
pub use telemetry::{ExporterConfig, ExportProtocol, LogFormat, TelemetryConfig};

/// Top-level Switchboard configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Shared counter store for rotation cursors and failure counters
    #[serde(default)]
    pub store: StoreConfig,
    /// Database API holding users, models and usage records
    #[serde(default)]
    pub data: Option<DataConfig>,
    /// Identity provider used to validate bearer tokens
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// LLM proxy configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Quota window configuration
    #[serde(default)]
    pub quota: QuotaConfig,
    /// WebSocket hub configuration
    #[serde(default)]
    pub hub: HubConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
