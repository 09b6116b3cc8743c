#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod error;
pub mod identity;
pub mod response;

pub use error::{HttpError, envelope_code};
pub use identity::{AuthenticatedUser, MembershipTier};
pub use response::ApiResponse;
#[cfg(feature = "axum")]
pub use response::{error_response, plain_error, success_response};
