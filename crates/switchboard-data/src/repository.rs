use async_trait::async_trait;

use crate::{
    DataError, ModelConfig, ModelFilter, ModelUsageStats, TimeWindow, TopUser, UsageRecord, UsageStats, UserProfile,
};

/// Lookup of user rows by id
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with [`DataError::NotFound`] when the user does not exist
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, DataError>;
}

/// Read access to administrative model configuration
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Enabled model matching both provider and upstream model id
    async fn find_enabled_model(&self, provider: &str, model_id: &str) -> Result<Option<ModelConfig>, DataError>;

    async fn list_enabled_models(&self, filter: &ModelFilter) -> Result<Vec<ModelConfig>, DataError>;

    /// Model by catalog id regardless of status
    async fn get_model(&self, id: &str) -> Result<Option<ModelConfig>, DataError>;
}

/// Append-only usage storage with windowed aggregation
///
/// Aggregations over windows with no rows return zeroed stats.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn insert(&self, record: &UsageRecord) -> Result<(), DataError>;

    async fn user_stats(&self, user_id: &str, window: TimeWindow) -> Result<UsageStats, DataError>;

    async fn model_stats(&self, model_id: &str, window: TimeWindow) -> Result<ModelUsageStats, DataError>;

    /// Users ordered by total tokens, highest first
    async fn top_users(&self, window: TimeWindow, limit: usize) -> Result<Vec<TopUser>, DataError>;
}
