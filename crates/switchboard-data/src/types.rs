use jiff::Timestamp;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use switchboard_core::MembershipTier;

/// Lifecycle state shared by models and their credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
    Inactive,
}

/// How the upstream credential is attached to outgoing requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    #[default]
    ApiKey,
    /// `X-API-Key: <key>`
    ApiSecret,
}

/// Whether requests spread across all enabled keys or pin the first one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsageMode {
    #[default]
    Single,
    Rotation,
}

/// One upstream credential for a model
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    pub key: SecretString,
    #[serde(default)]
    pub status: Status,
}

impl ApiKeyConfig {
    pub fn enabled(key: impl Into<String>) -> Self {
        Self {
            key: SecretString::from(key.into()),
            status: Status::Enabled,
        }
    }

    pub fn with_status(key: impl Into<String>, status: Status) -> Self {
        Self {
            key: SecretString::from(key.into()),
            status,
        }
    }
}

/// Administrative record describing one upstream LLM endpoint
///
/// Read-only here; each request works against the snapshot it fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    /// Model name sent upstream, e.g. `gpt-4o`
    pub model_id: String,
    pub provider: String,
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    pub base_url: String,
    #[serde(default)]
    pub auth_type: AuthScheme,
    #[serde(default)]
    pub key_usage_mode: KeyUsageMode,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
    #[serde(default)]
    pub supports_vision: bool,
    pub max_tokens: Option<u32>,
    pub context_window: Option<u32>,
    pub price_per_million_input: Option<f64>,
    pub price_per_million_output: Option<f64>,
    pub rate_limit_rpm: Option<u32>,
    pub rate_limit_tpm: Option<u32>,
}

impl ModelConfig {
    /// Credentials currently allowed to serve traffic, in configured order
    pub fn enabled_keys(&self) -> Vec<&SecretString> {
        self.api_keys
            .iter()
            .filter(|k| k.status == Status::Enabled)
            .map(|k| &k.key)
            .collect()
    }

    /// Both prices, when the model is priced at all
    pub fn pricing(&self) -> Option<(f64, f64)> {
        self.price_per_million_input.zip(self.price_per_million_output)
    }
}

/// Filters for listing enabled models
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelFilter {
    pub provider: Option<String>,
    #[serde(rename = "type")]
    pub model_type: Option<String>,
}

impl ModelFilter {
    pub fn matches(&self, model: &ModelConfig) -> bool {
        self.provider.as_ref().is_none_or(|p| *p == model.provider)
            && self.model_type.as_ref().is_none_or(|t| *t == model.model_type)
    }
}

/// User row as far as the gateway cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub membership_level: String,
}

impl UserProfile {
    pub fn tier(&self) -> MembershipTier {
        MembershipTier::from_level(&self.membership_level)
    }
}

/// One completed upstream call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Assigned on recording when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Catalog id of the model config
    pub model_id: String,
    pub provider: String,
    /// Upstream model name
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
    pub request_duration_ms: u64,
    /// Assigned on recording when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// Sums over a set of usage records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub request_count: u64,
}

impl UsageStats {
    pub fn add(&mut self, record: &UsageRecord) {
        self.prompt_tokens += record.prompt_tokens;
        self.completion_tokens += record.completion_tokens;
        self.total_tokens += record.total_tokens;
        self.total_cost += record.cost;
        self.request_count += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsageStats {
    #[serde(flatten)]
    pub usage: UsageStats,
    pub unique_users: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUser {
    pub user_id: String,
    #[serde(flatten)]
    pub usage: UsageStats,
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at < self.end
    }
}
