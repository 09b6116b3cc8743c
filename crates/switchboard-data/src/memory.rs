use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    DataError, ModelCatalog, ModelConfig, ModelFilter, ModelUsageStats, Status, TimeWindow, TopUser, UsageRecord,
    UsageRepository, UsageStats, UserDirectory, UserProfile,
};

/// In-process implementation of every data collaborator
///
/// Used for local development and tests. Records without a timestamp
/// never fall inside a window.
#[derive(Debug, Default)]
pub struct InMemoryData {
    users: RwLock<HashMap<String, UserProfile>>,
    models: RwLock<Vec<ModelConfig>>,
    usage: RwLock<Vec<UsageRecord>>,
}

impl InMemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Insert a model, replacing any with the same catalog id
    pub async fn upsert_model(&self, model: ModelConfig) {
        let mut models = self.models.write().await;
        models.retain(|m| m.id != model.id);
        models.push(model);
    }

    /// Snapshot of every stored usage record
    pub async fn usage_records(&self) -> Vec<UsageRecord> {
        self.usage.read().await.clone()
    }
}

fn in_window(record: &UsageRecord, window: TimeWindow) -> bool {
    record.created_at.is_some_and(|at| window.contains(at))
}

#[async_trait]
impl UserDirectory for InMemoryData {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, DataError> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                entity: "user",
                id: user_id.to_owned(),
            })
    }
}

#[async_trait]
impl ModelCatalog for InMemoryData {
    async fn find_enabled_model(&self, provider: &str, model_id: &str) -> Result<Option<ModelConfig>, DataError> {
        Ok(self
            .models
            .read()
            .await
            .iter()
            .find(|m| m.status == Status::Enabled && m.provider == provider && m.model_id == model_id)
            .cloned())
    }

    async fn list_enabled_models(&self, filter: &ModelFilter) -> Result<Vec<ModelConfig>, DataError> {
        let mut models: Vec<_> = self
            .models
            .read()
            .await
            .iter()
            .filter(|m| m.status == Status::Enabled && filter.matches(m))
            .cloned()
            .collect();

        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    async fn get_model(&self, id: &str) -> Result<Option<ModelConfig>, DataError> {
        Ok(self.models.read().await.iter().find(|m| m.id == id).cloned())
    }
}

#[async_trait]
impl UsageRepository for InMemoryData {
    async fn insert(&self, record: &UsageRecord) -> Result<(), DataError> {
        self.usage.write().await.push(record.clone());
        Ok(())
    }

    async fn user_stats(&self, user_id: &str, window: TimeWindow) -> Result<UsageStats, DataError> {
        let usage = self.usage.read().await;

        let mut stats = UsageStats::default();
        for record in usage.iter().filter(|r| r.user_id == user_id && in_window(r, window)) {
            stats.add(record);
        }

        Ok(stats)
    }

    async fn model_stats(&self, model_id: &str, window: TimeWindow) -> Result<ModelUsageStats, DataError> {
        let usage = self.usage.read().await;

        let mut stats = ModelUsageStats::default();
        let mut users = HashSet::new();
        for record in usage.iter().filter(|r| r.model_id == model_id && in_window(r, window)) {
            stats.usage.add(record);
            users.insert(record.user_id.as_str());
        }
        stats.unique_users = u64::try_from(users.len()).unwrap_or(u64::MAX);

        Ok(stats)
    }

    async fn top_users(&self, window: TimeWindow, limit: usize) -> Result<Vec<TopUser>, DataError> {
        let usage = self.usage.read().await;

        let mut per_user: HashMap<&str, UsageStats> = HashMap::new();
        for record in usage.iter().filter(|r| in_window(r, window)) {
            per_user.entry(record.user_id.as_str()).or_default().add(record);
        }

        let mut top: Vec<_> = per_user
            .into_iter()
            .map(|(user_id, usage)| TopUser {
                user_id: user_id.to_owned(),
                usage,
            })
            .collect();

        top.sort_by(|a, b| {
            b.usage
                .total_tokens
                .cmp(&a.usage.total_tokens)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        top.truncate(limit);

        Ok(top)
    }
}
