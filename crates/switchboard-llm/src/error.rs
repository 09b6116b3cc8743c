use http::StatusCode;
use switchboard_core::HttpError;
use switchboard_data::DataError;
use switchboard_quota::{ExceededReason, QuotaError};
use thiserror::Error;

/// Errors from proxying a chat request
#[derive(Debug, Error)]
pub enum LlmError {
    /// No enabled model config matches the requested model
    #[error("model not found or not enabled: {model}")]
    ModelNotFound { provider: String, model: String },

    /// The user's budget cannot cover the request
    #[error("quota exceeded: {0}")]
    QuotaExceeded(ExceededReason),

    /// The quota check itself failed
    #[error("quota check failed: {0}")]
    Quota(#[source] QuotaError),

    /// The model config has no enabled credential
    #[error("no enabled API keys found for model {model_id}")]
    NoEnabledKeys { model_id: String },

    /// Transport failure or non-success status from the provider
    #[error("upstream error: {message}")]
    Upstream {
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        message: String,
    },

    /// The request could not be understood or encoded
    #[error("invalid request: {0}")]
    Marshal(String),

    /// Model catalog lookup failed
    #[error("model catalog unavailable: {0}")]
    Catalog(#[from] DataError),
}

impl LlmError {
    /// Whether re-issuing the same call may succeed
    ///
    /// The proxy never retries on its own; this is for callers.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

impl From<QuotaError> for LlmError {
    fn from(error: QuotaError) -> Self {
        match error {
            QuotaError::Exceeded(reason) => Self::QuotaExceeded(reason),
            other => Self::Quota(other),
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } | Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Quota(e) => e.status_code(),
            Self::NoEnabledKeys { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Marshal(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ModelNotFound { .. } => "model_not_found",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Quota(e) => e.error_type(),
            Self::NoEnabledKeys { .. } => "no_enabled_keys",
            Self::Upstream { .. } => "upstream_error",
            Self::Marshal(_) => "invalid_request_error",
            Self::Catalog(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Quota(e) => e.client_message(),
            Self::NoEnabledKeys { .. } => "model is temporarily unavailable".to_owned(),
            Self::Catalog(_) => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }

    fn code_suffix(&self) -> u32 {
        match self {
            Self::QuotaExceeded(reason) => QuotaError::Exceeded(reason.clone()).code_suffix(),
            Self::Quota(e) => e.code_suffix(),
            // Distinguishes a missing model from a catalog read failure
            Self::ModelNotFound { .. } => 2,
            _ => 1,
        }
    }
}
