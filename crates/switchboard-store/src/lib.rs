#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod memory;
mod redis;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use switchboard_config::{StoreBackend, StoreConfig};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Fast key-value store holding small integer counters with expiry
///
/// Every operation is independent; callers that treat store state as
/// best-effort are free to ignore failures.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, `None` when missing or expired
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Overwrite the value and reset its expiry
    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically add one and refresh the expiry, returning the new value
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Build the configured store backend
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn CounterStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::debug!("using in-memory counter store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let url = config
                .url
                .as_ref()
                .ok_or_else(|| StoreError::Config("store.url is required for the redis backend".to_owned()))?;

            let store = RedisStore::connect(url.as_str(), &config.key_prefix, config.timeout).await?;
            tracing::debug!(prefix = %config.key_prefix, "using redis counter store");

            Ok(Arc::new(store))
        }
    }
}
