use serde::Serialize;
use switchboard_core::MembershipTier;

/// Token budgets attached to a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub monthly_quota: u64,
    pub daily_limit: u64,
}

impl TierLimits {
    pub const fn for_tier(tier: MembershipTier) -> Self {
        match tier {
            MembershipTier::Free => Self::new(100_000, 10_000),
            MembershipTier::Basic => Self::new(500_000, 50_000),
            MembershipTier::Pro => Self::new(2_000_000, 200_000),
            MembershipTier::Enterprise => Self::new(10_000_000, 1_000_000),
        }
    }

    const fn new(monthly_quota: u64, daily_limit: u64) -> Self {
        Self {
            monthly_quota,
            daily_limit,
        }
    }
}

/// Display row for one membership tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaLevel {
    pub level: MembershipTier,
    pub name: &'static str,
    pub monthly_quota: u64,
    pub daily_limit: u64,
    pub price: f64,
    pub features: Vec<&'static str>,
}

/// The static tier table, cheapest first
pub fn get_quota_levels() -> Vec<QuotaLevel> {
    MembershipTier::ALL.into_iter().map(level).collect()
}

fn level(tier: MembershipTier) -> QuotaLevel {
    let limits = TierLimits::for_tier(tier);

    let (name, price, features) = match tier {
        MembershipTier::Free => ("Free", 0.0, vec!["100K tokens/month", "10K tokens/day", "Base models"]),
        MembershipTier::Basic => (
            "Basic",
            29.9,
            vec!["500K tokens/month", "50K tokens/day", "All models", "Priority support"],
        ),
        MembershipTier::Pro => (
            "Pro",
            99.9,
            vec![
                "2M tokens/month",
                "200K tokens/day",
                "All models",
                "Priority support",
                "API access",
            ],
        ),
        MembershipTier::Enterprise => (
            "Enterprise",
            499.9,
            vec![
                "10M tokens/month",
                "1M tokens/day",
                "All models",
                "Dedicated support",
                "API access",
                "Custom models",
            ],
        ),
    };

    QuotaLevel {
        level: tier,
        name,
        monthly_quota: limits.monthly_quota,
        daily_limit: limits.daily_limit,
        price,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_and_limits_grow() {
        let levels = get_quota_levels();

        let names: Vec<_> = levels.iter().map(|l| l.level.to_string()).collect();
        assert_eq!(names, ["free", "basic", "pro", "enterprise"]);
        assert!(levels.windows(2).all(|w| w[0].monthly_quota < w[1].monthly_quota));
    }

    #[test]
    fn levels_agree_with_limits() {
        for level in get_quota_levels() {
            let limits = TierLimits::for_tier(level.level);
            assert_eq!(level.monthly_quota, limits.monthly_quota);
            assert_eq!(level.daily_limit, limits.daily_limit);
        }
    }

    #[test]
    fn free_tier_row() {
        let free = serde_json::to_value(&get_quota_levels()[0]).unwrap();

        insta::assert_json_snapshot!(free, @r#"
        {
          "daily_limit": 10000,
          "features": [
            "100K tokens/month",
            "10K tokens/day",
            "Base models"
          ],
          "level": "free",
          "monthly_quota": 100000,
          "name": "Free",
          "price": 0.0
        }
        "#);
    }
}
