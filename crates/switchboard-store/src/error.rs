use thiserror::Error;

/// Counter store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid store configuration
    #[error("store configuration error: {0}")]
    Config(String),

    /// Redis command or connection failure
    #[error("redis error: {0}")]
    Redis(String),

    /// The operation did not finish within the configured timeout
    #[error("store operation `{operation}` timed out")]
    Timeout {
        /// Command that timed out
        operation: &'static str,
    },
}
