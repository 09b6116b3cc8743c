/// Errors returned by the data collaborators
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// HTTP transport or connection error
    #[error("database request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The database API returned a non-success status
    #[error("database API error ({status}): {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// The requested row does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// A request URL could not be built
    #[error("invalid database URL: {0}")]
    Url(#[from] url::ParseError),
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
