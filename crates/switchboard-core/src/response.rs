use serde::Serialize;

use crate::HttpError;

/// Uniform `{code, message, data}` body returned by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub code: u32,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_owned(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Error response with an explicit code
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Error response built from a domain error
    pub fn from_error(error: &(impl HttpError + ?Sized)) -> Self {
        Self::error(error.envelope_code(), error.client_message())
    }
}

#[cfg(feature = "axum")]
mod reply {
    use axum::{Json, response::IntoResponse, response::Response};
    use http::StatusCode;
    use serde::Serialize;

    use super::ApiResponse;
    use crate::HttpError;

    /// `200 OK` with `data` wrapped in the envelope
    pub fn success_response<T: Serialize>(data: T) -> Response {
        Json(ApiResponse::success(data)).into_response()
    }

    /// Render a domain error with its status and envelope code
    pub fn error_response(error: &(impl HttpError + ?Sized)) -> Response {
        (error.status_code(), Json(ApiResponse::from_error(error))).into_response()
    }

    /// Render an error that has no domain type
    pub fn plain_error(status: StatusCode, code: u32, message: impl Into<String>) -> Response {
        (status, Json(ApiResponse::error(code, message))).into_response()
    }
}

#[cfg(feature = "axum")]
pub use reply::{error_response, plain_error, success_response};
