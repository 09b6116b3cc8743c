//! Chat-completion wire types
//!
//! Requests are forwarded upstream as received, so fields this service
//! does not inspect are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchboard_data::ModelConfig;

/// Inbound chat-completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Upstream model name, e.g. `gpt-4o`
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion budget, counted in full by the quota pre-check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Remaining provider-specific parameters
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// One conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(MessageContent::Text(content.into())),
            extra: Map::new(),
        }
    }

    /// Byte length of the textual content
    pub fn text_len(&self) -> usize {
        match &self.content {
            None => 0,
            Some(MessageContent::Text(text)) => text.len(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .map(str::len)
                .sum(),
        }
    }
}

/// Content is either a plain string or an array of typed parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Map<String, Value>>),
}

/// Upstream chat-completion response, returned to the caller as-is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Client-facing model view without credentials or pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableModel {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub description: String,
    pub supports_vision: bool,
    /// Zero when unset
    pub max_tokens: u32,
    /// Zero when unset
    pub context_window: u32,
}

impl From<&ModelConfig> for AvailableModel {
    fn from(model: &ModelConfig) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            model_id: model.model_id.clone(),
            provider: model.provider.clone(),
            model_type: model.model_type.clone(),
            description: model.description.clone(),
            supports_vision: model.supports_vision,
            max_tokens: model.max_tokens.unwrap_or_default(),
            context_window: model.context_window.unwrap_or_default(),
        }
    }
}
