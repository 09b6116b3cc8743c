/// Errors from submitting work to the hub
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The coordinator task has exited
    #[error("hub coordinator is not running")]
    Stopped,

    /// A payload could not be encoded as JSON
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
