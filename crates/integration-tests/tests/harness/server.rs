//! Test server wrapper that starts Switchboard on a random port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use switchboard_config::Config;
use switchboard_data::{InMemoryData, UsageRecord};
use switchboard_hub::Hub;
use switchboard_server::{Dependencies, Server};
use switchboard_store::MemoryStore;
use tokio_util::sync::CancellationToken;

use super::identity::{StaticIdentity, token_for};

/// A running test server backed by in-memory collaborators
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    data: Arc<InMemoryData>,
    hub: Hub,
}

impl TestServer {
    /// Start a server over fresh in-memory data
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        Self::start_with_data(config, Arc::new(InMemoryData::new())).await
    }

    /// Start a server over `data`, binding port 0
    pub async fn start_with_data(config: Config, data: Arc<InMemoryData>) -> anyhow::Result<Self> {
        let deps = Dependencies {
            users: data.clone(),
            models: data.clone(),
            usage: data.clone(),
            store: Arc::new(MemoryStore::new()),
            identity: Arc::new(StaticIdentity),
        };
        let server = Server::with_dependencies(config, deps)?;
        let hub = server.hub().clone();

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
            data,
            hub,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn data(&self) -> &InMemoryData {
        &self.data
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// GET `path` as `user_id`
    pub async fn get_as(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token_for(user_id))
            .send()
            .await
            .unwrap()
    }

    /// POST a JSON body to `path` as `user_id`
    pub async fn post_as(&self, user_id: &str, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token_for(user_id))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Poll until the background recorder has stored `count` records for `model_id`
    pub async fn wait_for_records(&self, model_id: &str, count: usize) -> Vec<UsageRecord> {
        for _ in 0..100 {
            let records: Vec<UsageRecord> = self
                .data
                .usage_records()
                .await
                .into_iter()
                .filter(|r| r.model_id == model_id)
                .collect();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} usage records for {model_id}");
    }

    /// Poll until the hub reports `count` sessions for `user_id`
    pub async fn wait_for_sessions(&self, user_id: &str, count: usize) {
        for _ in 0..100 {
            if self.hub.get_user_client_count(user_id) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} sessions for {user_id}");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
