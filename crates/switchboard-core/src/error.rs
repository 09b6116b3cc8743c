use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// renders these into the response envelope, keeping domain errors
/// decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `quota_exceeded`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Discriminator appended to the status to form the envelope code
    fn code_suffix(&self) -> u32 {
        1
    }

    /// Numeric code placed in the response envelope
    fn envelope_code(&self) -> u32 {
        envelope_code(self.status_code(), self.code_suffix())
    }
}

/// Envelope code for a status and discriminator, e.g. `(429, 1)` is `42901`
pub fn envelope_code(status: StatusCode, suffix: u32) -> u32 {
    u32::from(status.as_u16()) * 100 + suffix
}
