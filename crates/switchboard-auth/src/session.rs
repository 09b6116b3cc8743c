//! Identity provider payloads
//!
//! The provider answers with either a full session (sign-in, token
//! refresh) or a bare user object (token introspection). Both are
//! normalized into [`IdentitySession`] at this boundary.

use secrecy::SecretString;
use serde::Deserialize;

/// User object as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw provider response, either shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AuthPayload {
    Session {
        access_token: SecretString,
        refresh_token: SecretString,
        #[serde(default)]
        expires_in: u64,
        user: ProviderUser,
    },
    User(ProviderUser),
}

/// Tokens issued alongside a session
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Seconds until the access token expires
    pub expires_in: u64,
}

/// Canonical identity record
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub user_id: String,
    pub email: Option<String>,
    pub tokens: Option<SessionTokens>,
}

impl From<AuthPayload> for IdentitySession {
    fn from(payload: AuthPayload) -> Self {
        match payload {
            AuthPayload::Session {
                access_token,
                refresh_token,
                expires_in,
                user,
            } => Self {
                user_id: user.id,
                email: user.email,
                tokens: Some(SessionTokens {
                    access_token,
                    refresh_token,
                    expires_in,
                }),
            },
            AuthPayload::User(user) => Self {
                user_id: user.id,
                email: user.email,
                tokens: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn session_payload_keeps_tokens() {
        let payload: AuthPayload = serde_json::from_value(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {"id": "u1", "email": "u1@example.com"},
        }))
        .unwrap();

        let session = IdentitySession::from(payload);
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.email.as_deref(), Some("u1@example.com"));
        let tokens = session.tokens.unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "at");
        assert_eq!(tokens.expires_in, 3600);
    }

    #[test]
    fn bare_user_payload_has_no_tokens() {
        let payload: AuthPayload = serde_json::from_value(json!({
            "id": "u2",
            "aud": "authenticated",
            "role": "authenticated",
        }))
        .unwrap();

        let session = IdentitySession::from(payload);
        assert_eq!(session.user_id, "u2");
        assert!(session.email.is_none());
        assert!(session.tokens.is_none());
    }

    #[test]
    fn payload_without_user_id_is_rejected() {
        assert!(serde_json::from_value::<AuthPayload>(json!({"email": "x@example.com"})).is_err());
    }
}
