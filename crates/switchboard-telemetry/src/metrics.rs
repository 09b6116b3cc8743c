//! Metric names and the shared meter

use opentelemetry::metrics::Meter;

// LLM proxy
pub const LLM_REQUESTS: &str = "switchboard.llm.requests";
pub const LLM_TOKENS: &str = "switchboard.llm.tokens";
pub const LLM_UPSTREAM_FAILURES: &str = "switchboard.llm.upstream_failures";
pub const KEY_FAILURE_ALERTS: &str = "switchboard.keys.failure_alerts";

// Connection hub
pub const HUB_CONNECTIONS: &str = "switchboard.hub.connections";
pub const HUB_DROPPED_SESSIONS: &str = "switchboard.hub.dropped_sessions";

/// Meter for instruments owned by this service
///
/// Falls back to a no-op provider when no exporter is configured.
pub fn meter() -> Meter {
    opentelemetry::global::meter("switchboard")
}
