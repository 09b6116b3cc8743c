mod harness;

use harness::config::ConfigBuilder;
use harness::fixtures::{consume, free_user};
use harness::server::TestServer;

#[tokio::test]
async fn quota_snapshot_reflects_usage() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    free_user(server.data(), "u1").await;
    consume(server.data(), "u1", 8_500).await;

    let resp = server.get_as("u1", "/api/v1/quota").await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    let quota = &json["data"];
    assert_eq!(quota["user_id"], "u1");
    assert_eq!(quota["quota_tokens"], 100_000);
    assert_eq!(quota["used_tokens"], 8_500);
    assert_eq!(quota["remaining_tokens"], 91_500);
    assert_eq!(quota["daily_limit"], 10_000);
    assert_eq!(quota["daily_remaining"], 1_500);
    assert_eq!(quota["has_quota"], true);
}

#[tokio::test]
async fn unknown_user_has_no_quota() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = server.get_as("ghost", "/api/v1/quota").await;

    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], 40402);
}

#[tokio::test]
async fn levels_are_listed_cheapest_first() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = server.get_as("u1", "/api/v1/quota/levels").await;

    let json: serde_json::Value = resp.json().await.unwrap();
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|level| level["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Free", "Basic", "Pro", "Enterprise"]);
}

#[tokio::test]
async fn usage_summaries_cover_the_current_windows() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    free_user(server.data(), "u1").await;
    consume(server.data(), "u1", 1_234).await;

    for path in ["/api/v1/quota/usage/monthly", "/api/v1/quota/usage/daily"] {
        let resp = server.get_as("u1", path).await;
        assert_eq!(resp.status(), 200, "{path}");

        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["data"]["total_tokens"], 1_234, "{path}");
        assert_eq!(json["data"]["request_count"], 1, "{path}");
    }
}
