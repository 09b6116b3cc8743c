use std::sync::Arc;

use jiff::Zoned;
use serde::Serialize;
use switchboard_core::MembershipTier;
use switchboard_data::UserDirectory;
use switchboard_usage::{UsageError, UsageService, UserUsageReport, calendar};

use crate::{ExceededReason, QuotaError, TierLimits};

/// A user's budget position at one instant
///
/// Computed per request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub user_id: String,
    pub membership_level: MembershipTier,
    pub quota_tokens: u64,
    pub used_tokens: u64,
    pub remaining_tokens: u64,
    /// Not clamped; may exceed 100 after an overrun
    pub usage_percentage: f64,
    pub used_cost: f64,
    pub has_quota: bool,
    /// Local midnight on the first of next month, `YYYY-MM-DD HH:MM:SS`
    pub reset_time: String,
    pub daily_limit: u64,
    pub daily_used: u64,
    pub daily_remaining: u64,
}

impl QuotaSnapshot {
    /// Check an estimate against this snapshot
    pub fn admit(&self, estimated_tokens: u64) -> Result<(), ExceededReason> {
        if !self.has_quota {
            if self.remaining_tokens == 0 {
                return Err(ExceededReason::Monthly {
                    used: self.used_tokens,
                    quota: self.quota_tokens,
                });
            }
            return Err(ExceededReason::Daily {
                used: self.daily_used,
                limit: self.daily_limit,
            });
        }

        if estimated_tokens > self.remaining_tokens {
            return Err(ExceededReason::EstimateOverMonthly {
                estimated: estimated_tokens,
                remaining: self.remaining_tokens,
            });
        }

        if estimated_tokens > self.daily_remaining {
            return Err(ExceededReason::EstimateOverDaily {
                estimated: estimated_tokens,
                remaining: self.daily_remaining,
            });
        }

        Ok(())
    }

    pub fn alert(&self) -> Option<QuotaAlert> {
        if !self.has_quota {
            Some(QuotaAlert::Exhausted)
        } else if self.usage_percentage >= 90.0 {
            Some(QuotaAlert::Critical)
        } else if self.usage_percentage >= 80.0 {
            Some(QuotaAlert::Warning)
        } else {
            None
        }
    }
}

/// Usage thresholds worth telling an operator about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaAlert {
    /// At least 80% of the monthly quota used
    Warning,
    /// At least 90% of the monthly quota used
    Critical,
    /// Monthly or daily budget exhausted
    Exhausted,
}

/// Computes token budgets from tier limits and recorded usage
///
/// Validation is a pre-flight read only. Nothing is reserved, so
/// concurrent requests from one user may overrun the budget until
/// their usage is recorded.
#[derive(Clone)]
pub struct QuotaService {
    users: Arc<dyn UserDirectory>,
    usage: UsageService,
}

impl QuotaService {
    pub fn new(users: Arc<dyn UserDirectory>, usage: UsageService) -> Self {
        Self { users, usage }
    }

    /// Snapshot for the calendar month and day containing now
    pub async fn check_quota(&self, user_id: &str) -> Result<QuotaSnapshot, QuotaError> {
        let now = Zoned::now().with_time_zone(self.usage.time_zone().clone());
        self.check_quota_at(user_id, &now).await
    }

    /// Snapshot for the calendar month and day containing `now`
    pub async fn check_quota_at(&self, user_id: &str, now: &Zoned) -> Result<QuotaSnapshot, QuotaError> {
        let user = self.users.get_user(user_id).await.map_err(QuotaError::Lookup)?;
        let tier = user.tier();
        let limits = TierLimits::for_tier(tier);

        let (month_start, month_end) = calendar::month_containing(now).map_err(calendar_error)?;
        let (day_start, day_end) = calendar::day_containing(now).map_err(calendar_error)?;

        let monthly = self
            .usage
            .get_user_usage_stats(user_id, calendar::to_window(&month_start, &month_end))
            .await
            .map_err(QuotaError::Aggregation)?;
        let daily = self
            .usage
            .get_user_usage_stats(user_id, calendar::to_window(&day_start, &day_end))
            .await
            .map_err(QuotaError::Aggregation)?;

        let used = monthly.usage.total_tokens;
        let daily_used = daily.usage.total_tokens;
        let remaining = limits.monthly_quota.saturating_sub(used);
        let daily_remaining = limits.daily_limit.saturating_sub(daily_used);

        Ok(QuotaSnapshot {
            user_id: user_id.to_owned(),
            membership_level: tier,
            quota_tokens: limits.monthly_quota,
            used_tokens: used,
            remaining_tokens: remaining,
            usage_percentage: percentage(used, limits.monthly_quota),
            used_cost: monthly.usage.total_cost,
            has_quota: remaining > 0 && daily_remaining > 0,
            reset_time: month_end.strftime("%Y-%m-%d %H:%M:%S").to_string(),
            daily_limit: limits.daily_limit,
            daily_used,
            daily_remaining,
        })
    }

    /// Refuse a request whose estimate does not fit the remaining budget
    pub async fn validate_quota(&self, user_id: &str, estimated_tokens: u64) -> Result<QuotaSnapshot, QuotaError> {
        let snapshot = self.check_quota(user_id).await?;

        send_quota_alert(&snapshot);
        snapshot.admit(estimated_tokens)?;

        Ok(snapshot)
    }

    /// Usage for the month containing now
    pub async fn get_monthly_usage_summary(&self, user_id: &str) -> Result<UserUsageReport, QuotaError> {
        let now = Zoned::now().with_time_zone(self.usage.time_zone().clone());
        let (start, end) = calendar::month_containing(&now).map_err(calendar_error)?;

        self.usage
            .get_user_usage_stats(user_id, calendar::to_window(&start, &end))
            .await
            .map_err(QuotaError::Aggregation)
    }

    /// Usage for the day containing now
    pub async fn get_daily_usage_summary(&self, user_id: &str) -> Result<UserUsageReport, QuotaError> {
        let now = Zoned::now().with_time_zone(self.usage.time_zone().clone());
        let (start, end) = calendar::day_containing(&now).map_err(calendar_error)?;

        self.usage
            .get_user_usage_stats(user_id, calendar::to_window(&start, &end))
            .await
            .map_err(QuotaError::Aggregation)
    }
}

impl std::fmt::Debug for QuotaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaService").finish_non_exhaustive()
    }
}

fn calendar_error(e: jiff::Error) -> QuotaError {
    QuotaError::Aggregation(UsageError::Calendar(e))
}

#[allow(clippy::cast_precision_loss)]
fn percentage(used: u64, quota: u64) -> f64 {
    if quota == 0 {
        0.0
    } else {
        used as f64 / quota as f64 * 100.0
    }
}

/// Log threshold crossings for operators
pub(crate) fn send_quota_alert(snapshot: &QuotaSnapshot) {
    match snapshot.alert() {
        Some(QuotaAlert::Warning) => tracing::info!(
            user_id = %snapshot.user_id,
            usage_percentage = snapshot.usage_percentage,
            "quota alert: 80% used"
        ),
        Some(QuotaAlert::Critical) => tracing::warn!(
            user_id = %snapshot.user_id,
            usage_percentage = snapshot.usage_percentage,
            "quota alert: 90% used"
        ),
        Some(QuotaAlert::Exhausted) => tracing::warn!(
            user_id = %snapshot.user_id,
            used = snapshot.used_tokens,
            daily_used = snapshot.daily_used,
            "quota exhausted"
        ),
        None => {}
    }
}
