use http::StatusCode;
use switchboard_core::HttpError;
use switchboard_data::DataError;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials were presented
    #[error("missing authorization header")]
    MissingToken,

    /// The `Authorization` header is not a bearer token
    #[error("malformed authorization header")]
    MalformedToken,

    /// The identity provider rejected the token
    #[error("invalid token")]
    InvalidToken,

    /// HTTP request to the identity provider failed
    #[error("identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The identity provider returned an unexpected response
    #[error("identity provider error ({status}): {message}")]
    Provider {
        /// HTTP status code, 0 when no response was decoded
        status: u16,
        message: String,
    },

    /// The user's profile could not be loaded
    #[error("failed to load user profile: {0}")]
    Directory(#[source] DataError),
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::MalformedToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Request(_) | Self::Provider { .. } => StatusCode::BAD_GATEWAY,
            Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::MissingToken | Self::MalformedToken | Self::InvalidToken => "authentication_error",
            Self::Request(_) | Self::Provider { .. } => "identity_provider_error",
            Self::Directory(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::MissingToken => "unauthorized: missing Authorization header".to_owned(),
            Self::MalformedToken => "unauthorized: malformed token".to_owned(),
            Self::InvalidToken => "unauthorized: invalid token".to_owned(),
            Self::Request(_) | Self::Provider { .. } => "identity provider unavailable".to_owned(),
            Self::Directory(_) => "internal server error".to_owned(),
        }
    }

    fn code_suffix(&self) -> u32 {
        match self {
            Self::MalformedToken => 2,
            Self::InvalidToken => 3,
            _ => 1,
        }
    }
}
