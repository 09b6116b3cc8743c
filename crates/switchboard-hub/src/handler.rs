use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::{Extension, Router, routing};
use switchboard_core::AuthenticatedUser;

use crate::{Hub, run_session};

/// Route for `GET /ws`
///
/// Expects an [`AuthenticatedUser`] extension from the auth layer.
pub fn hub_router(hub: Hub) -> Router {
    Router::new().route("/ws", routing::get(upgrade)).with_state(hub)
}

async fn upgrade(
    State(hub): State<Hub>,
    Extension(user): Extension<AuthenticatedUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let max_message_size = hub.config().max_message_size;
    tracing::debug!(user_id = %user.user_id, "websocket upgrade requested");

    ws.max_message_size(max_message_size)
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| async move { run_session(&hub, socket, user.user_id).await })
}
