//! Chat request orchestration

use std::{sync::Arc, time::Instant};

use secrecy::SecretString;
use switchboard_data::{KeyUsageMode, ModelCatalog, ModelConfig, ModelFilter, UsageRecord};
use switchboard_quota::QuotaService;
use switchboard_telemetry::{Counter, KeyValue, metrics};
use switchboard_usage::{UsageRecorder, calculate_cost};

use crate::{AvailableModel, ChatRequest, ChatResponse, KeyRotationService, LlmError, UpstreamClient};

/// Provider name for a model, from its name prefix
pub fn infer_provider(model: &str) -> &'static str {
    const PREFIXES: &[(&str, &str)] = &[
        ("gpt", "openai"),
        ("o1", "openai"),
        ("o3", "openai"),
        ("claude", "claude"),
        ("deepseek", "deepseek"),
        ("qwen", "qwen"),
    ];

    PREFIXES
        .iter()
        .find(|(prefix, _)| model.starts_with(*prefix))
        .map_or("openai", |&(_, provider)| provider)
}

/// Rough token count used only by the quota pre-check
///
/// Four bytes of message text per token, plus the full completion budget.
pub fn estimate_tokens(request: &ChatRequest) -> u64 {
    let chars: usize = request.messages.iter().map(crate::types::ChatMessage::text_len).sum();
    let input = u64::try_from(chars / 4).unwrap_or(u64::MAX);

    input.saturating_add(u64::from(request.max_tokens.unwrap_or_default()))
}

struct ProxyMetrics {
    requests: Counter<u64>,
    tokens: Counter<u64>,
    upstream_failures: Counter<u64>,
}

impl ProxyMetrics {
    fn new() -> Self {
        let meter = metrics::meter();

        Self {
            requests: meter
                .u64_counter(metrics::LLM_REQUESTS)
                .with_description("Chat requests by outcome")
                .build(),
            tokens: meter
                .u64_counter(metrics::LLM_TOKENS)
                .with_description("Tokens reported by upstream providers")
                .build(),
            upstream_failures: meter
                .u64_counter(metrics::LLM_UPSTREAM_FAILURES)
                .with_description("Failed upstream chat calls")
                .build(),
        }
    }

    fn request(&self, provider: &str, outcome: &'static str) {
        self.requests.add(
            1,
            &[
                KeyValue::new("provider", provider.to_owned()),
                KeyValue::new("outcome", outcome),
            ],
        );
    }
}

/// Quota-checked, key-rotating chat proxy
///
/// Each call is independent. Dropping the returned future aborts the
/// upstream call; usage is only queued after a successful response, so
/// a cancelled call never records usage.
#[derive(Clone)]
pub struct LlmProxyService {
    catalog: Arc<dyn ModelCatalog>,
    quota: QuotaService,
    rotation: KeyRotationService,
    recorder: UsageRecorder,
    upstream: UpstreamClient,
    metrics: Arc<ProxyMetrics>,
}

impl LlmProxyService {
    pub fn new(
        catalog: Arc<dyn ModelCatalog>,
        quota: QuotaService,
        rotation: KeyRotationService,
        recorder: UsageRecorder,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            catalog,
            quota,
            rotation,
            recorder,
            upstream,
            metrics: Arc::new(ProxyMetrics::new()),
        }
    }

    pub fn rotation(&self) -> &KeyRotationService {
        &self.rotation
    }

    pub fn quota(&self) -> &QuotaService {
        &self.quota
    }

    /// Forward one chat request for `user_id`
    ///
    /// Short-circuits on the first failing step. Nothing is sent upstream
    /// unless the quota pre-check passes, and a failed upstream call is
    /// not retried with another key.
    pub async fn proxy_chat(&self, user_id: &str, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let started = Instant::now();

        if request.model.is_empty() {
            return Err(LlmError::Marshal("model is required".to_owned()));
        }
        if request.is_streaming() {
            return Err(LlmError::Marshal("streaming responses are not supported".to_owned()));
        }

        let provider = infer_provider(&request.model);
        let model = self
            .catalog
            .find_enabled_model(provider, &request.model)
            .await?
            .ok_or_else(|| LlmError::ModelNotFound {
                provider: provider.to_owned(),
                model: request.model.clone(),
            })?;

        let estimated = estimate_tokens(request);
        if let Err(e) = self.quota.validate_quota(user_id, estimated).await {
            self.metrics.request(provider, "quota_rejected");
            return Err(e.into());
        }

        let key = self.select_key(&model).await?;

        tracing::debug!(
            user_id,
            model_id = %model.id,
            provider = %model.provider,
            estimated_tokens = estimated,
            "forwarding chat request"
        );

        let response = match self.upstream.chat(&model, &key, request).await {
            Ok(response) => response,
            Err(failure) => {
                if failure.implicates_key()
                    && let Err(e) = self.rotation.mark_key_as_failed(&model.id, &key).await
                {
                    tracing::warn!(model_id = %model.id, error = %e, "failed to record key failure");
                }
                self.metrics
                    .upstream_failures
                    .add(1, &[KeyValue::new("provider", model.provider.clone())]);
                self.metrics.request(provider, "upstream_error");
                return Err(failure.into());
            }
        };

        self.record_usage(user_id, &model, &response, started);
        self.metrics.request(provider, "success");

        Ok(response)
    }

    /// Enabled models with display fields only
    pub async fn get_available_models(
        &self,
        user_id: &str,
        filter: &ModelFilter,
    ) -> Result<Vec<AvailableModel>, LlmError> {
        let models = self.catalog.list_enabled_models(filter).await?;
        tracing::debug!(user_id, count = models.len(), "listing available models");

        Ok(models.iter().map(AvailableModel::from).collect())
    }

    async fn select_key(&self, model: &ModelConfig) -> Result<SecretString, LlmError> {
        match model.key_usage_mode {
            KeyUsageMode::Rotation => self.rotation.get_next_api_key(&model.id, &model.api_keys).await,
            KeyUsageMode::Single => model
                .enabled_keys()
                .first()
                .map(|key| (*key).clone())
                .ok_or_else(|| LlmError::NoEnabledKeys {
                    model_id: model.id.clone(),
                }),
        }
    }

    fn record_usage(&self, user_id: &str, model: &ModelConfig, response: &ChatResponse, started: Instant) {
        let usage = response.usage;
        let cost = model.pricing().map_or(0.0, |(input, output)| {
            calculate_cost(usage.prompt_tokens, usage.completion_tokens, input, output)
        });

        let attributes = [
            KeyValue::new("provider", model.provider.clone()),
            KeyValue::new("model", model.model_id.clone()),
        ];
        self.metrics.tokens.add(usage.total_tokens, &attributes);

        self.recorder.record(UsageRecord {
            id: None,
            user_id: user_id.to_owned(),
            agent_id: None,
            conversation_id: None,
            model_id: model.id.clone(),
            provider: model.provider.clone(),
            model: model.model_id.clone(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cost,
            request_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            created_at: None,
        });
    }
}

impl std::fmt::Debug for LlmProxyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProxyService")
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}
