use http::StatusCode;
use switchboard_core::HttpError;
use switchboard_data::DataError;
use switchboard_usage::UsageError;

/// Why a request was refused by the quota pre-check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExceededReason {
    #[error("monthly quota exceeded, used: {used}/{quota} tokens")]
    Monthly { used: u64, quota: u64 },

    #[error("daily quota exceeded, used: {used}/{limit} tokens")]
    Daily { used: u64, limit: u64 },

    #[error("estimated tokens ({estimated}) exceeds remaining quota ({remaining})")]
    EstimateOverMonthly { estimated: u64, remaining: u64 },

    #[error("estimated tokens ({estimated}) exceeds daily remaining quota ({remaining})")]
    EstimateOverDaily { estimated: u64, remaining: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The user record could not be resolved
    #[error("failed to get user: {0}")]
    Lookup(#[source] DataError),

    /// Usage totals could not be aggregated
    #[error("failed to aggregate usage: {0}")]
    Aggregation(#[source] UsageError),

    #[error(transparent)]
    Exceeded(#[from] ExceededReason),
}

impl HttpError for QuotaError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Lookup(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Lookup(_) | Self::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Exceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Lookup(e) if e.is_not_found() => "user_not_found",
            Self::Lookup(_) | Self::Aggregation(_) => "internal_error",
            Self::Exceeded(_) => "quota_exceeded",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Lookup(e) if e.is_not_found() => "user not found".to_owned(),
            Self::Lookup(_) | Self::Aggregation(_) => "internal server error".to_owned(),
            Self::Exceeded(reason) => reason.to_string(),
        }
    }

    fn code_suffix(&self) -> u32 {
        match self {
            Self::Exceeded(ExceededReason::Daily { .. } | ExceededReason::EstimateOverDaily { .. }) => 2,
            // 40401 is a missing model
            Self::Lookup(e) if e.is_not_found() => 2,
            _ => 1,
        }
    }
}
