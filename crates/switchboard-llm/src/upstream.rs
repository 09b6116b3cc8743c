use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use switchboard_data::{AuthScheme, ModelConfig};

use crate::{ChatRequest, ChatResponse, LlmError};

/// Longest slice of an upstream error body kept in the error message
const MAX_ERROR_BODY: usize = 512;

/// How an upstream call failed
#[derive(Debug)]
pub(crate) enum UpstreamFailure {
    /// No response was received
    Transport(reqwest::Error),
    /// The provider answered with a non-success status
    Status { status: u16, body: String },
    /// A success response that could not be decoded
    Decode(reqwest::Error),
}

impl UpstreamFailure {
    /// Whether the failure should count against the credential
    pub(crate) const fn implicates_key(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

impl From<UpstreamFailure> for LlmError {
    fn from(failure: UpstreamFailure) -> Self {
        match failure {
            UpstreamFailure::Transport(e) if e.is_timeout() => Self::Upstream {
                status: None,
                message: "upstream request timed out".to_owned(),
            },
            UpstreamFailure::Transport(e) => Self::Upstream {
                status: None,
                message: format!("failed to send request: {e}"),
            },
            UpstreamFailure::Status { status, body } => Self::Upstream {
                status: Some(status),
                message: format!("LLM API error ({status}): {body}"),
            },
            UpstreamFailure::Decode(e) => Self::Upstream {
                status: None,
                message: format!("failed to parse response: {e}"),
            },
        }
    }
}

/// HTTP client for OpenAI-compatible chat-completion endpoints
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    /// Client whose every call is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Upstream {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    /// POST the request to `{base_url}/chat/completions`
    pub(crate) async fn chat(
        &self,
        model: &ModelConfig,
        key: &SecretString,
        request: &ChatRequest,
    ) -> Result<ChatResponse, UpstreamFailure> {
        let mut builder = self.client.post(completions_url(&model.base_url)).json(request);

        builder = match model.auth_type {
            AuthScheme::ApiKey => builder.bearer_auth(key.expose_secret()),
            AuthScheme::ApiSecret => builder.header("X-API-Key", key.expose_secret()),
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %model.provider, model = %model.model_id, error = %e, "upstream request failed");
            UpstreamFailure::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate(&mut body, MAX_ERROR_BODY);
            tracing::warn!(
                provider = %model.provider,
                model = %model.model_id,
                status = %status,
                "upstream returned error"
            );
            return Err(UpstreamFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(UpstreamFailure::Decode)
    }
}

fn completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/chat/completions")
}

fn truncate(text: &mut String, max: usize) {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_ignores_trailing_slash() {
        assert_eq!(
            completions_url("https://api.example.com/v1/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/v1"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let mut text = "ab\u{e9}cd".to_owned();
        truncate(&mut text, 3);
        assert_eq!(text, "ab");

        let mut short = "ok".to_owned();
        truncate(&mut short, 10);
        assert_eq!(short, "ok");
    }
}
