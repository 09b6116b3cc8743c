//! Seed data shared by the integration tests

use jiff::Timestamp;
use switchboard_data::{
    ApiKeyConfig, AuthScheme, InMemoryData, KeyUsageMode, ModelConfig, Status, UsageRecord, UsageRepository,
    UserProfile,
};

/// Free-tier daily token limit
pub const FREE_DAILY_LIMIT: u64 = 10_000;

pub fn model(base_url: &str, keys: &[&str], mode: KeyUsageMode) -> ModelConfig {
    ModelConfig {
        id: "m-gpt".to_owned(),
        name: "GPT X".to_owned(),
        model_id: "gpt-x".to_owned(),
        provider: "openai".to_owned(),
        model_type: "chat".to_owned(),
        description: String::new(),
        status: Status::Enabled,
        base_url: base_url.to_owned(),
        auth_type: AuthScheme::ApiKey,
        key_usage_mode: mode,
        api_keys: keys.iter().map(|k| ApiKeyConfig::enabled(*k)).collect(),
        supports_vision: false,
        max_tokens: Some(8192),
        context_window: Some(128_000),
        price_per_million_input: Some(2.0),
        price_per_million_output: Some(4.0),
        rate_limit_rpm: None,
        rate_limit_tpm: None,
    }
}

pub async fn free_user(data: &InMemoryData, user_id: &str) {
    data.upsert_user(UserProfile {
        id: user_id.to_owned(),
        email: Some(format!("{user_id}@example.com")),
        membership_level: "free".to_owned(),
    })
    .await;
}

/// Record `tokens` of usage for `user_id` at the current instant
pub async fn consume(data: &InMemoryData, user_id: &str, tokens: u64) {
    data.insert(&UsageRecord {
        id: Some(format!("seed-{user_id}")),
        user_id: user_id.to_owned(),
        agent_id: None,
        conversation_id: None,
        model_id: "m-seed".to_owned(),
        provider: "openai".to_owned(),
        model: "gpt-seed".to_owned(),
        prompt_tokens: tokens,
        completion_tokens: 0,
        total_tokens: tokens,
        cost: 0.0,
        request_duration_ms: 1,
        created_at: Some(Timestamp::now()),
    })
    .await
    .unwrap();
}

pub fn chat_body(max_tokens: u32) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-x",
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": max_tokens
    })
}
