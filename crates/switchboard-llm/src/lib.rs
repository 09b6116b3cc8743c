//! LLM request proxying
//!
//! One chat request resolves its model configuration, passes the quota
//! pre-check, picks an upstream credential, and is forwarded to the
//! provider. Usage is recorded in the background after a successful call.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod handler;
pub mod proxy;
pub mod rotation;
pub mod types;
mod upstream;

pub use error::LlmError;
pub use handler::llm_router;
pub use proxy::{LlmProxyService, estimate_tokens, infer_provider};
pub use rotation::{KeyRotationService, RotationStats, RotationStatus};
pub use types::{AvailableModel, ChatRequest, ChatResponse};
pub use upstream::UpstreamClient;
