use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name reported with traces and metrics
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Log line format on stdout
    #[serde(default)]
    pub log_format: LogFormat,
    /// Additional resource attributes
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    #[serde(default)]
    pub exporters: ExportersConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_format: LogFormat::default(),
            resource_attributes: HashMap::new(),
            exporters: ExportersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportersConfig {
    /// OTLP exporter shared by traces and metrics
    #[serde(default)]
    pub otlp: Option<ExporterConfig>,
}

/// OTLP exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// Export timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// OTLP export protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    HttpProto,
}

fn default_service_name() -> String {
    "switchboard".to_owned()
}

const fn default_timeout() -> u64 {
    10
}
