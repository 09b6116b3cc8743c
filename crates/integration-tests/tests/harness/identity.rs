//! Identity resolver that accepts `token-<user id>` bearer tokens

use async_trait::async_trait;
use switchboard_auth::{AuthError, IdentityResolver};
use switchboard_core::{AuthenticatedUser, MembershipTier};

pub struct StaticIdentity;

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let user_id = token.strip_prefix("token-").ok_or(AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id: user_id.to_owned(),
            email: Some(format!("{user_id}@example.com")),
            tier: MembershipTier::Free,
        })
    }
}

/// Bearer token the static resolver maps back to `user_id`
pub fn token_for(user_id: &str) -> String {
    format!("token-{user_id}")
}
