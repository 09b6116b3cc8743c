mod harness;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use harness::config::{ADMIN_SECRET, ConfigBuilder};
use harness::identity::token_for;
use harness::server::TestServer;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &TestServer, user_id: &str) -> Socket {
    let url = server.ws_url(&format!("/ws?token={}", token_for(user_id)));
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

/// Next text frame, skipping control frames
async fn next_text(socket: &mut Socket) -> serde_json::Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => {}
                other => panic!("socket ended: {other:?}"),
            }
        }
    })
    .await
    .unwrap();

    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn heartbeat_is_acknowledged() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    let mut socket = connect(&server, "u1").await;

    socket
        .send(Message::text(r#"{"type":"heartbeat"}"#))
        .await
        .unwrap();

    let reply = next_text(&mut socket).await;
    assert_eq!(reply["type"], "heartbeat_ack");
    assert!(reply["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn bearer_header_upgrade_is_accepted() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let mut request = server.ws_url("/ws").into_client_request().unwrap();
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {}", token_for("u1")).parse().unwrap(),
    );
    let (_socket, _) = connect_async(request).await.unwrap();

    server.wait_for_sessions("u1", 1).await;
}

#[tokio::test]
async fn upgrade_without_token_is_rejected() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let err = connect_async(server.ws_url("/ws")).await.unwrap_err();

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn task_updates_reach_every_session_of_the_user() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    let mut phone = connect(&server, "u1").await;
    let mut laptop = connect(&server, "u1").await;
    let mut stranger = connect(&server, "u2").await;
    server.wait_for_sessions("u1", 2).await;
    server.wait_for_sessions("u2", 1).await;

    server
        .hub()
        .broadcast_task_update("u1", "task-7", "task_completed", &serde_json::json!({"result": "done"}))
        .await
        .unwrap();

    for socket in [&mut phone, &mut laptop] {
        let update = next_text(socket).await;
        assert_eq!(update["type"], "task_completed");
        assert_eq!(update["task_id"], "task-7");
        assert_eq!(update["user_id"], "u1");
        assert_eq!(update["data"]["result"], "done");
        assert!(update["timestamp"].as_str().unwrap().parse::<jiff::Timestamp>().is_ok());
    }

    // The other user only sees its own heartbeat reply
    stranger
        .send(Message::text(r#"{"type":"heartbeat"}"#))
        .await
        .unwrap();
    assert_eq!(next_text(&mut stranger).await["type"], "heartbeat_ack");
}

#[tokio::test]
async fn closed_sessions_leave_the_hub() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    let mut socket = connect(&server, "u1").await;
    server.wait_for_sessions("u1", 1).await;

    let resp = server
        .client()
        .get(server.url("/api/v1/admin/hub"))
        .header("x-admin-secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["online_users"], serde_json::json!(["u1"]));
    assert_eq!(json["data"]["total_connections"], 1);

    socket.close(None).await.unwrap();
    server.wait_for_sessions("u1", 0).await;
    assert!(!server.hub().is_user_online("u1"));
}

#[tokio::test]
async fn silent_clients_are_dropped() {
    let config = ConfigBuilder::new()
        .with_hub_timings(Duration::from_millis(100), Duration::from_millis(300))
        .build();
    let server = TestServer::start(config).await.unwrap();
    let _socket = connect(&server, "u1").await;
    server.wait_for_sessions("u1", 1).await;

    // The socket is never polled, so server pings go unanswered
    server.wait_for_sessions("u1", 0).await;
}

#[tokio::test]
async fn responsive_clients_outlive_the_pong_deadline() {
    let config = ConfigBuilder::new()
        .with_hub_timings(Duration::from_millis(100), Duration::from_millis(300))
        .build();
    let server = TestServer::start(config).await.unwrap();
    let mut socket = connect(&server, "u1").await;
    server.wait_for_sessions("u1", 1).await;

    // Reading lets tungstenite answer each ping, across several deadlines
    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        while let Some(Ok(_)) = socket.next().await {}
    })
    .await;
    assert!(drained.is_err(), "socket closed while pongs were being sent");

    assert_eq!(server.hub().get_user_client_count("u1"), 1);

    socket
        .send(Message::text(r#"{"type":"heartbeat"}"#))
        .await
        .unwrap();
    assert_eq!(next_text(&mut socket).await["type"], "heartbeat_ack");
}
