use serde::{Deserialize, Serialize};

/// Membership level that selects a user's token budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MembershipTier {
    #[default]
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl MembershipTier {
    /// All tiers in ascending order
    pub const ALL: [Self; 4] = [Self::Free, Self::Basic, Self::Pro, Self::Enterprise];

    /// Parse a stored membership level, treating anything unrecognised as free
    pub fn from_level(level: &str) -> Self {
        level.trim().to_ascii_lowercase().parse().unwrap_or_default()
    }
}

/// Identity attached to a request after bearer-token validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Stable user identifier from the identity provider
    pub user_id: String,
    /// Email address, when the provider reports one
    pub email: Option<String>,
    /// Membership tier from the user directory
    pub tier: MembershipTier,
}
