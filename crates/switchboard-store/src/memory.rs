use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::{CounterStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local counter store
///
/// Suitable for a single instance and for tests. Expired entries are
/// dropped lazily when they are next touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let now = Instant::now();

        let value = self.entries.get(key).filter(|e| e.is_live(now)).map(|e| e.value);
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }

        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();

        // The entry guard holds the shard lock, so the read-modify-write is atomic
        let mut entry = self.entries.entry(key.to_owned()).or_insert(Entry {
            value: 0,
            expires_at: now,
        });

        if !entry.is_live(now) {
            entry.value = 0;
        }
        entry.value += 1;
        entry.expires_at = now + ttl;

        Ok(entry.value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
