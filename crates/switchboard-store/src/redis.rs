use std::{future::Future, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{CounterStore, StoreError};

/// Redis-backed counter store shared by every gateway instance
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis; the connection manager reconnects on its own afterwards
    pub async fn connect(url: &str, prefix: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Redis(format!("invalid redis url: {e}")))?;

        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout { operation: "CONNECT" })?
            .map_err(|e| StoreError::Redis(format!("failed to connect to Redis: {e}")))?;

        Ok(Self {
            conn,
            prefix: prefix.to_owned(),
            timeout,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout { operation })?
            .map_err(|e| StoreError::Redis(format!("{operation} failed: {e}")))
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        self.bounded("GET", async move { conn.get(&key).await }).await
    }

    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        self.bounded("SET", async move { conn.set_ex(&key, value, ttl_secs(ttl)).await })
            .await
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let expiry = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);

        // INCR and EXPIRE in one MULTI so a counter never outlives its window
        let (count,): (i64,) = self
            .bounded("INCR", async move {
                redis::pipe()
                    .atomic()
                    .incr(&key, 1)
                    .expire(&key, expiry)
                    .ignore()
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        Ok(count)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        self.bounded("DEL", async move { conn.del(&key).await }).await
    }
}
