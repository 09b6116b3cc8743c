#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod resolver;
mod session;

pub use error::AuthError;
pub use resolver::{IdentityResolver, ProviderResolver};
pub use session::{AuthPayload, IdentitySession, ProviderUser, SessionTokens};
