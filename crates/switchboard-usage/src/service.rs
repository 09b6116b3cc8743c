use std::sync::Arc;

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use serde::Serialize;
use switchboard_data::{TimeWindow, TopUser, UsageRecord, UsageRepository, UsageStats};

use crate::{UsageError, calendar};

/// Cost of one call given per-million token prices
///
/// Division happens in floating point before multiplying, so small token
/// counts are never truncated to zero.
#[allow(clippy::cast_precision_loss)]
pub fn calculate_cost(prompt_tokens: u64, completion_tokens: u64, price_per_million_input: f64, price_per_million_output: f64) -> f64 {
    prompt_tokens as f64 / 1_000_000.0 * price_per_million_input
        + completion_tokens as f64 / 1_000_000.0 * price_per_million_output
}

/// Usage of one user over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUsageReport {
    pub user_id: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(flatten)]
    pub usage: UsageStats,
}

/// Usage of one model over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUsageReport {
    pub model_id: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(flatten)]
    pub usage: UsageStats,
    pub unique_users: u64,
}

/// Records usage and aggregates it over time windows
#[derive(Clone)]
pub struct UsageService {
    repository: Arc<dyn UsageRepository>,
    time_zone: TimeZone,
}

impl UsageService {
    pub fn new(repository: Arc<dyn UsageRepository>, time_zone: TimeZone) -> Self {
        Self { repository, time_zone }
    }

    pub fn time_zone(&self) -> &TimeZone {
        &self.time_zone
    }

    /// Persist a record, assigning an id and timestamp when absent
    pub async fn record_usage(&self, mut record: UsageRecord) -> Result<UsageRecord, UsageError> {
        record.id.get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
        record.created_at.get_or_insert_with(Timestamp::now);

        self.repository.insert(&record).await?;
        Ok(record)
    }

    /// Totals for a user over `[start, end)`; zero when nothing was recorded
    pub async fn get_user_usage_stats(&self, user_id: &str, window: TimeWindow) -> Result<UserUsageReport, UsageError> {
        let usage = self.repository.user_stats(user_id, window).await?;

        Ok(UserUsageReport {
            user_id: user_id.to_owned(),
            start_time: window.start,
            end_time: window.end,
            usage,
        })
    }

    /// Totals for a model over `[start, end)`; zero when nothing was recorded
    pub async fn get_model_usage_stats(&self, model_id: &str, window: TimeWindow) -> Result<ModelUsageReport, UsageError> {
        let stats = self.repository.model_stats(model_id, window).await?;

        Ok(ModelUsageReport {
            model_id: model_id.to_owned(),
            start_time: window.start,
            end_time: window.end,
            usage: stats.usage,
            unique_users: stats.unique_users,
        })
    }

    pub async fn get_monthly_usage(&self, user_id: &str, year: i16, month: i8) -> Result<UserUsageReport, UsageError> {
        let window = calendar::month_window(year, month, &self.time_zone)?;
        self.get_user_usage_stats(user_id, window).await
    }

    pub async fn get_daily_usage(&self, user_id: &str, date: Date) -> Result<UserUsageReport, UsageError> {
        let window = calendar::day_window(date, &self.time_zone)?;
        self.get_user_usage_stats(user_id, window).await
    }

    pub async fn get_top_users(&self, window: TimeWindow, limit: usize) -> Result<Vec<TopUser>, UsageError> {
        Ok(self.repository.top_users(window, limit).await?)
    }

    /// Calendar month containing the current instant
    pub fn current_month(&self) -> Result<TimeWindow, UsageError> {
        let now = Timestamp::now().to_zoned(self.time_zone.clone());
        let (start, end) = calendar::month_containing(&now)?;
        Ok(calendar::to_window(&start, &end))
    }
}

impl std::fmt::Debug for UsageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageService")
            .field("time_zone", &self.time_zone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use switchboard_data::InMemoryData;

    use super::*;

    fn record(user: &str, tokens: u64) -> UsageRecord {
        UsageRecord {
            id: None,
            user_id: user.to_owned(),
            agent_id: None,
            conversation_id: None,
            model_id: "m1".to_owned(),
            provider: "openai".to_owned(),
            model: "gpt-x".to_owned(),
            prompt_tokens: tokens,
            completion_tokens: 0,
            total_tokens: tokens,
            cost: 0.0,
            request_duration_ms: 10,
            created_at: None,
        }
    }

    fn service() -> (Arc<InMemoryData>, UsageService) {
        let data = Arc::new(InMemoryData::new());
        let service = UsageService::new(data.clone(), TimeZone::UTC);
        (data, service)
    }

    #[test]
    fn cost_example() {
        let cost = calculate_cost(1_000_000, 500_000, 2.0, 4.0);
        assert!((cost - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cost_of_small_counts_is_not_truncated() {
        let cost = calculate_cost(1, 1, 3.0, 15.0);
        assert!((cost - 0.000_018).abs() < 1e-12);
    }

    #[test]
    fn cost_without_tokens_is_zero() {
        assert!(calculate_cost(0, 0, 10.0, 30.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn record_assigns_id_and_timestamp() {
        let (data, service) = service();

        let stored = service.record_usage(record("u1", 10)).await.unwrap();

        assert!(stored.id.is_some());
        assert!(stored.created_at.is_some());
        assert_eq!(data.usage_records().await, vec![stored]);
    }

    #[tokio::test]
    async fn record_keeps_existing_id_and_timestamp() {
        let (_, service) = service();
        let at: Timestamp = "2025-01-01T00:00:00Z".parse().unwrap();

        let mut input = record("u1", 10);
        input.id = Some("fixed".to_owned());
        input.created_at = Some(at);

        let stored = service.record_usage(input).await.unwrap();
        assert_eq!(stored.id.as_deref(), Some("fixed"));
        assert_eq!(stored.created_at, Some(at));
    }

    #[tokio::test]
    async fn empty_window_reports_zero() {
        let (_, service) = service();

        let report = service.get_monthly_usage("u1", 2025, 3).await.unwrap();

        assert_eq!(report.usage, UsageStats::default());
        assert_eq!(report.start_time.to_string(), "2025-03-01T00:00:00Z");
    }

    #[tokio::test]
    async fn daily_usage_counts_that_day_only() {
        let (_, service) = service();

        let mut early = record("u1", 100);
        early.created_at = Some("2025-03-15T00:00:00Z".parse().unwrap());
        let mut late = record("u1", 50);
        late.created_at = Some("2025-03-16T00:00:00Z".parse().unwrap());
        service.record_usage(early).await.unwrap();
        service.record_usage(late).await.unwrap();

        let report = service.get_daily_usage("u1", date(2025, 3, 15)).await.unwrap();
        assert_eq!(report.usage.total_tokens, 100);
        assert_eq!(report.usage.request_count, 1);
    }

    #[tokio::test]
    async fn top_users_are_ranked_by_tokens() {
        let (_, service) = service();
        let at: Timestamp = "2025-03-02T00:00:00Z".parse().unwrap();

        for (user, tokens) in [("u1", 10), ("u2", 40), ("u3", 25), ("u2", 5)] {
            let mut r = record(user, tokens);
            r.created_at = Some(at);
            service.record_usage(r).await.unwrap();
        }

        let window = calendar::month_window(2025, 3, &TimeZone::UTC).unwrap();
        let top = service.get_top_users(window, 2).await.unwrap();

        let ranked: Vec<(&str, u64)> = top.iter().map(|t| (t.user_id.as_str(), t.usage.total_tokens)).collect();
        assert_eq!(ranked, [("u2", 45), ("u3", 25)]);
    }

    #[test]
    fn current_month_contains_now() {
        let (_, service) = service();

        let window = service.current_month().unwrap();

        assert!(window.contains(Timestamp::now()));
    }

    #[tokio::test]
    async fn model_report_carries_unique_users() {
        let (_, service) = service();
        let at: Timestamp = "2025-03-02T00:00:00Z".parse().unwrap();

        for user in ["u1", "u2", "u2"] {
            let mut r = record(user, 5);
            r.created_at = Some(at);
            service.record_usage(r).await.unwrap();
        }

        let window = calendar::month_window(2025, 3, &TimeZone::UTC).unwrap();
        let report = service.get_model_usage_stats("m1", window).await.unwrap();

        assert_eq!(report.unique_users, 2);
        assert_eq!(report.usage.total_tokens, 15);
    }
}
