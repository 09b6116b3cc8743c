//! Per-connection read and write loops

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;

use crate::message::handle_client_message;
use crate::{Hub, SessionHandle};

/// Serve one upgraded connection until either side gives up
///
/// The session is registered before any frame is read and unregistered
/// when the inbound side ends. The outbound side ends when the hub drops
/// the session, a write fails, or the inbound side ends.
pub async fn run_session(hub: &Hub, socket: WebSocket, user_id: String) {
    let config = hub.config().clone();
    let pong_wait = config.pong_wait;
    let (session, outbound) = SessionHandle::new(user_id, config.send_buffer);
    let user_id = session.user_id().to_owned();
    let session_id = session.id();
    let replies = session.downgrade();

    if let Err(e) = hub.register(session).await {
        tracing::warn!(%user_id, error = %e, "failed to register websocket session");
        return;
    }

    let (sink, stream) = socket.split();
    let cancel = CancellationToken::new();

    let writer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            write_loop(sink, outbound, config.ping_period, config.write_wait, &cancel).await;
        })
    };

    read_loop(stream, &replies, &user_id, pong_wait, &cancel).await;

    // Unknown to the hub if it already dropped the session
    if let Err(e) = hub.unregister(&user_id, session_id).await {
        tracing::debug!(%user_id, %session_id, error = %e, "unregister after hub shutdown");
    }
    cancel.cancel();
    let _ = writer.await;

    tracing::debug!(%user_id, %session_id, "websocket session closed");
}

/// Consume inbound frames until close, error, or a missed keepalive
///
/// Any inbound frame, pongs included, resets the keepalive deadline.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    replies: &mpsc::WeakSender<String>,
    user_id: &str,
    pong_wait: Duration,
    cancel: &CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = timeout(pong_wait, stream.next()) => next,
        };

        let message = match next {
            Err(_) => {
                tracing::debug!(user_id, "keepalive deadline passed");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(user_id, error = %e, "websocket read error");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                let Some(reply) = handle_client_message(text.as_str(), user_id) else {
                    continue;
                };
                let Some(outbound) = replies.upgrade() else {
                    break;
                };
                if outbound.try_send(reply).is_err() {
                    tracing::warn!(user_id, "outbound queue full, heartbeat reply dropped");
                }
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Write queued messages and periodic pings
///
/// Pings go out every `ping_period`, which is shorter than the peer's
/// read deadline, so a healthy session never times out.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    ping_period: Duration,
    write_wait: Duration,
    cancel: &CancellationToken,
) {
    let mut ping = interval_at(Instant::now() + ping_period, ping_period);

    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            next = outbound.recv() => match next {
                Some(text) => Message::Text(text.into()),
                None => {
                    // The hub released the session
                    let _ = timeout(write_wait, sink.send(Message::Close(None))).await;
                    break;
                }
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match timeout(write_wait, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "websocket write error");
                break;
            }
            Err(_) => {
                tracing::debug!("websocket write timed out");
                break;
            }
        }
    }

    cancel.cancel();
}
