use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use switchboard_config::AuthConfig;
use switchboard_core::{AuthenticatedUser, MembershipTier};
use switchboard_data::UserDirectory;
use url::Url;

use crate::{AuthError, AuthPayload, IdentitySession};

/// Turns a bearer token into the identity it belongs to
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Resolves tokens through the identity provider's user endpoint
///
/// Successful resolutions are cached by token digest for the configured
/// TTL, so a revoked token stays valid until its entry expires.
#[derive(Clone)]
pub struct ProviderResolver {
    http: reqwest::Client,
    user_url: Url,
    anon_key: SecretString,
    users: Arc<dyn UserDirectory>,
    cache: Cache<String, AuthenticatedUser>,
}

impl ProviderResolver {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserDirectory>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

        let user_url = user_endpoint(&config.url).map_err(|e| AuthError::Provider {
            status: 0,
            message: e.to_string(),
        })?;

        let cache = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();

        Ok(Self {
            http,
            user_url,
            anon_key: config.anon_key.clone(),
            users,
            cache,
        })
    }

    /// Drop a cached resolution, e.g. after sign-out
    pub fn invalidate(&self, token: &str) {
        self.cache.invalidate(&sha256_hex(token));
    }

    async fn fetch_identity(&self, token: &str) -> Result<IdentitySession, AuthError> {
        let response = self
            .http
            .get(self.user_url.clone())
            .bearer_auth(token)
            .header("apikey", self.anon_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "identity provider returned error");
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let payload: AuthPayload = response.json().await.map_err(|e| AuthError::Provider {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(payload.into())
    }

    async fn load_tier(&self, user_id: &str) -> Result<MembershipTier, AuthError> {
        match self.users.get_user(user_id).await {
            Ok(profile) => Ok(profile.tier()),
            // Signed up but no profile row yet
            Err(e) if e.is_not_found() => Ok(MembershipTier::Free),
            Err(e) => Err(AuthError::Directory(e)),
        }
    }
}

#[async_trait]
impl IdentityResolver for ProviderResolver {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let cache_key = sha256_hex(token);

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let identity = self.fetch_identity(token).await?;
        let tier = self.load_tier(&identity.user_id).await?;

        let user = AuthenticatedUser {
            user_id: identity.user_id,
            email: identity.email,
            tier,
        };
        self.cache.insert(cache_key, user.clone());

        tracing::debug!(user_id = %user.user_id, tier = %user.tier, "resolved bearer token");

        Ok(user)
    }
}

impl std::fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("user_url", &self.user_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Append the user endpoint to the provider URL, keeping any path prefix
fn user_endpoint(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("auth/v1/user")
}

/// Compute the SHA-256 hex digest of a string
fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
