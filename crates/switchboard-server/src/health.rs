use axum::Json;
use axum::response::IntoResponse;
use jiff::Timestamp;
use serde::Serialize;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    time: Timestamp,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        time: Timestamp::now(),
    })
}
