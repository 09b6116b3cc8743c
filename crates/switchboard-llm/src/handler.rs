//! Axum route handlers for the chat proxy

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Json, Router, routing};
use switchboard_core::{AuthenticatedUser, error_response, success_response};
use switchboard_data::ModelFilter;

use crate::{ChatRequest, LlmError, LlmProxyService};

/// Routes relative to the LLM prefix
///
/// Expects an [`AuthenticatedUser`] extension from the auth layer.
pub fn llm_router(proxy: LlmProxyService) -> Router {
    Router::new()
        .route("/chat", routing::post(chat))
        .route("/models", routing::get(list_models))
        .with_state(proxy)
}

/// Handle `POST /chat`
async fn chat(
    State(proxy): State<LlmProxyService>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::Marshal(rejection.body_text())),
    };

    match proxy.proxy_chat(&user.user_id, &request).await {
        Ok(response) => success_response(response),
        Err(e) => {
            tracing::debug!(user_id = %user.user_id, model = %request.model, error = %e, "chat request failed");
            error_response(&e)
        }
    }
}

/// Handle `GET /models`
async fn list_models(
    State(proxy): State<LlmProxyService>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(filter): Query<ModelFilter>,
) -> Response {
    match proxy.get_available_models(&user.user_id, &filter).await {
        Ok(models) => success_response(models),
        Err(e) => {
            tracing::error!(error = %e, "failed to list models");
            error_response(&e)
        }
    }
}
