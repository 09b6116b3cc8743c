#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod levels;
mod service;

pub use error::{ExceededReason, QuotaError};
pub use levels::{QuotaLevel, TierLimits, get_quota_levels};
pub use service::{QuotaAlert, QuotaService, QuotaSnapshot};
