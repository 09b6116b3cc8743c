//! Operator endpoints guarded by a shared secret

use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Router, middleware, routing};
use http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use switchboard_core::{envelope_code, plain_error, success_response};
use switchboard_data::{ModelCatalog, Status};
use switchboard_hub::Hub;
use switchboard_llm::{KeyRotationService, RotationStats};
use switchboard_usage::UsageService;

#[derive(Clone)]
pub struct AdminState {
    pub rotation: KeyRotationService,
    pub catalog: Arc<dyn ModelCatalog>,
    pub usage: UsageService,
    pub hub: Hub,
}

#[derive(Serialize)]
struct KeyHealth {
    /// Position in the configured key list
    index: usize,
    status: Status,
    /// Failures within the last hour
    failures: i64,
}

#[derive(Serialize)]
struct RotationReport {
    model_id: String,
    #[serde(flatten)]
    rotation: RotationStats,
    keys: Vec<KeyHealth>,
}

#[derive(Serialize)]
struct RotationReset {
    model_id: String,
    reset: bool,
}

#[derive(Deserialize)]
struct TopUsersQuery {
    #[serde(default = "default_top_limit")]
    limit: usize,
}

const fn default_top_limit() -> usize {
    10
}

/// Upper bound on `limit` for the top users listing
const MAX_TOP_LIMIT: usize = 100;

pub fn admin_router(state: AdminState, secret: SecretString) -> Router {
    let secret = Arc::new(secret);

    Router::new()
        .route(
            "/api/v1/admin/models/{model_id}/rotation",
            routing::get(get_rotation).delete(reset_rotation),
        )
        .route("/api/v1/admin/models/{model_id}/usage", routing::get(get_model_usage))
        .route("/api/v1/admin/usage/top", routing::get(get_top_users))
        .route("/api/v1/admin/hub", routing::get(get_hub_stats))
        .with_state(state)
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            let secret = Arc::clone(&secret);
            async move { admin_secret_middleware(&secret, req, next).await }
        }))
}

async fn admin_secret_middleware(secret: &SecretString, request: Request, next: Next) -> Response {
    let provided = request.headers().get("x-admin-secret").and_then(|v| v.to_str().ok());

    if provided != Some(secret.expose_secret()) {
        tracing::warn!(path = %request.uri().path(), "rejected admin request");
        return plain_error(
            StatusCode::FORBIDDEN,
            envelope_code(StatusCode::FORBIDDEN, 1),
            "invalid admin secret",
        );
    }

    next.run(request).await
}

async fn get_rotation(State(state): State<AdminState>, Path(model_id): Path<String>) -> Response {
    let model = match state.catalog.get_model(&model_id).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            return plain_error(
                StatusCode::NOT_FOUND,
                envelope_code(StatusCode::NOT_FOUND, 1),
                format!("model not found: {model_id}"),
            );
        }
        Err(e) => {
            tracing::error!(%model_id, error = %e, "failed to load model");
            return internal_error();
        }
    };

    let rotation = match state.rotation.get_rotation_stats(&model.id).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(%model_id, error = %e, "failed to read rotation cursor");
            return internal_error();
        }
    };

    let mut keys = Vec::with_capacity(model.api_keys.len());
    for (index, key) in model.api_keys.iter().enumerate() {
        let failures = match state.rotation.get_key_failure_count(&model.id, &key.key).await {
            Ok(failures) => failures,
            Err(e) => {
                tracing::error!(%model_id, error = %e, "failed to read failure counter");
                return internal_error();
            }
        };
        keys.push(KeyHealth {
            index,
            status: key.status,
            failures,
        });
    }

    success_response(RotationReport {
        model_id: model.id,
        rotation,
        keys,
    })
}

async fn reset_rotation(State(state): State<AdminState>, Path(model_id): Path<String>) -> Response {
    match state.rotation.reset_rotation(&model_id).await {
        Ok(()) => {
            tracing::info!(%model_id, "rotation cursor reset");
            success_response(RotationReset { model_id, reset: true })
        }
        Err(e) => {
            tracing::error!(%model_id, error = %e, "failed to reset rotation cursor");
            internal_error()
        }
    }
}

/// Current-month usage of one model
async fn get_model_usage(State(state): State<AdminState>, Path(model_id): Path<String>) -> Response {
    let report = match state.usage.current_month() {
        Ok(window) => state.usage.get_model_usage_stats(&model_id, window).await,
        Err(e) => Err(e),
    };

    match report {
        Ok(report) => success_response(report),
        Err(e) => {
            tracing::error!(%model_id, error = %e, "failed to load model usage");
            internal_error()
        }
    }
}

/// Heaviest users of the current month
async fn get_top_users(State(state): State<AdminState>, Query(query): Query<TopUsersQuery>) -> Response {
    let limit = query.limit.clamp(1, MAX_TOP_LIMIT);
    let top = match state.usage.current_month() {
        Ok(window) => state.usage.get_top_users(window, limit).await,
        Err(e) => Err(e),
    };

    match top {
        Ok(top) => success_response(top),
        Err(e) => {
            tracing::error!(error = %e, "failed to rank users");
            internal_error()
        }
    }
}

async fn get_hub_stats(State(state): State<AdminState>) -> Response {
    success_response(state.hub.stats())
}

fn internal_error() -> Response {
    plain_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        envelope_code(StatusCode::INTERNAL_SERVER_ERROR, 1),
        "internal server error",
    )
}
