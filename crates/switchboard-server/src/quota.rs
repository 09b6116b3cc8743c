//! Quota and usage endpoints for the authenticated user

use axum::extract::State;
use axum::response::Response;
use axum::{Extension, Router, routing};
use switchboard_core::{AuthenticatedUser, error_response, success_response};
use switchboard_quota::{QuotaService, get_quota_levels};

pub fn quota_router(quota: QuotaService) -> Router {
    Router::new()
        .route("/api/v1/quota", routing::get(get_quota))
        .route("/api/v1/quota/levels", routing::get(get_levels))
        .route("/api/v1/quota/usage/monthly", routing::get(get_monthly_usage))
        .route("/api/v1/quota/usage/daily", routing::get(get_daily_usage))
        .with_state(quota)
}

async fn get_quota(State(quota): State<QuotaService>, Extension(user): Extension<AuthenticatedUser>) -> Response {
    match quota.check_quota(&user.user_id).await {
        Ok(snapshot) => success_response(snapshot),
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "failed to check quota");
            error_response(&e)
        }
    }
}

async fn get_levels() -> Response {
    success_response(get_quota_levels())
}

async fn get_monthly_usage(
    State(quota): State<QuotaService>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Response {
    match quota.get_monthly_usage_summary(&user.user_id).await {
        Ok(report) => success_response(report),
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "failed to load monthly usage");
            error_response(&e)
        }
    }
}

async fn get_daily_usage(
    State(quota): State<QuotaService>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Response {
    match quota.get_daily_usage_summary(&user.user_id).await {
        Ok(report) => success_response(report),
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "failed to load daily usage");
            error_response(&e)
        }
    }
}
