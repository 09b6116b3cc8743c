//! Mock upstream provider for integration tests
//!
//! Implements the OpenAI-compatible chat completion route with canned
//! responses and records what it received.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router, routing};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Token counts the mock reports for every successful completion
pub const PROMPT_TOKENS: u64 = 1200;
pub const COMPLETION_TOKENS: u64 = 300;
pub const TOTAL_TOKENS: u64 = PROMPT_TOKENS + COMPLETION_TOKENS;

/// Mock provider that returns predictable responses
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    completion_count: AtomicU32,
    /// Number of requests to fail before succeeding
    fail_count: AtomicU32,
    /// Bearer tokens seen, in arrival order
    keys: Mutex<Vec<String>>,
}

impl MockLlm {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(0).await
    }

    /// Start a mock that fails the first `n` requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::start_inner(n).await
    }

    async fn start_inner(fail_count: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            completion_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(fail_count),
            keys: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for a model record, the proxy appends `/chat/completions`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of completion requests received, failures included
    pub fn completion_count(&self) -> u32 {
        self.state.completion_count.load(Ordering::Relaxed)
    }

    /// Upstream keys presented so far
    pub fn keys_seen(&self) -> Vec<String> {
        self.state.keys.lock().unwrap().clone()
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    #[allow(dead_code)]
    messages: Vec<serde_json::Value>,
}

async fn handle_chat_completions(
    State(state): State<Arc<MockLlmState>>,
    headers: HeaderMap,
    Json(req): Json<ChatCompletionRequest>,
) -> impl IntoResponse {
    state.completion_count.fetch_add(1, Ordering::Relaxed);

    if let Some(key) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.keys.lock().unwrap().push(key.to_owned());
    }

    let remaining = state.fail_count.load(Ordering::Relaxed);
    if remaining > 0 {
        state.fail_count.fetch_sub(1, Ordering::Relaxed);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "message": "mock server intentional failure",
                    "type": "server_error"
                }
            })),
        )
            .into_response();
    }

    Json(json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": req.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello from mock LLM"},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": PROMPT_TOKENS,
            "completion_tokens": COMPLETION_TOKENS,
            "total_tokens": TOTAL_TOKENS
        }
    }))
    .into_response()
}
