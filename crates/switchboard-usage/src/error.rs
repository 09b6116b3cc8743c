use switchboard_data::DataError;

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// Persistence layer failure
    #[error("usage storage failed: {0}")]
    Storage(#[from] DataError),

    /// A calendar window could not be computed
    #[error("invalid usage window: {0}")]
    Calendar(#[from] jiff::Error),
}
