//! Subscription record and usage types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Tier, UserId};

/// Subscription lifecycle status, independent of tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Tier benefits currently apply
    Active,
    /// Cancelled but inside the grace period; benefits apply until `ends_at`
    Cancelled,
    /// Reverted to Free after the billing period ended
    Expired,
}

impl SubscriptionStatus {
    /// Database / wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Error parsing a subscription status string
#[derive(Debug, Clone)]
pub struct StatusParseError(pub String);

impl std::fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid subscription status: {}", self.0)
    }
}

impl std::error::Error for StatusParseError {}

/// Per-user subscription record (1:1 with a user)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Owning user
    pub user_id: UserId,
    /// Current tier
    pub tier: Tier,
    /// Lifecycle status
    pub status: SubscriptionStatus,
    /// When the current tier/period began
    pub started_at: DateTime<Utc>,
    /// End of the current paid billing period; `None` for Free and Expired
    pub ends_at: Option<DateTime<Utc>>,
    /// Stripe customer reference, present once a paid flow has started
    pub stripe_customer_id: Option<String>,
    /// Stripe subscription reference for the active paid subscription
    pub stripe_subscription_id: Option<String>,
    /// Monthly usage counters, keyed by feature name; keys are created
    /// lazily on first increment and cleared by the monthly reset
    pub usage: HashMap<String, i64>,
}

impl SubscriptionRecord {
    /// Usage counter for a feature, treating a missing key as zero
    pub fn usage_for(&self, feature: &str) -> i64 {
        self.usage.get(feature).copied().unwrap_or(0)
    }
}

/// Usage-stats summary exposed by the read endpoint
///
/// `limits` is `None` for paid tiers, signaling "unlimited".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub tier: Tier,
    pub usage: HashMap<String, i64>,
    pub limits: Option<HashMap<String, i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            let parsed: SubscriptionStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_missing_usage_counter_is_zero() {
        let record = SubscriptionRecord {
            user_id: UserId::new(),
            tier: Tier::Free,
            status: SubscriptionStatus::Active,
            started_at: Utc::now(),
            ends_at: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            usage: HashMap::new(),
        };
        assert_eq!(record.usage_for("roadmaps"), 0);
    }
}
