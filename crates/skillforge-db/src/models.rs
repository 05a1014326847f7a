//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use skillforge_types::{SubscriptionRecord, SubscriptionStatus, Tier, UserId};

/// Subscription row from the database (one per user)
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub user_id: Uuid,
    pub tier: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usage counter row from the database, keyed (user_id, feature)
#[derive(Debug, Clone, FromRow)]
pub struct UsageRow {
    pub user_id: Uuid,
    pub feature: String,
    pub count: i64,
    pub recorded_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }

    /// Build a domain record from this row plus the user's usage counters.
    ///
    /// Unparseable tier/status strings are a schema-level integrity
    /// violation and surface as an error rather than a silent default.
    pub fn into_record(self, usage: Vec<UsageRow>) -> Result<SubscriptionRecord, crate::DbError> {
        let tier: Tier = self
            .tier
            .parse()
            .map_err(|_| crate::DbError::Sqlx(sqlx::Error::Decode(
                format!("unknown tier in subscription row: {}", self.tier).into(),
            )))?;
        let status: SubscriptionStatus = self
            .status
            .parse()
            .map_err(|_| crate::DbError::Sqlx(sqlx::Error::Decode(
                format!("unknown status in subscription row: {}", self.status).into(),
            )))?;

        Ok(SubscriptionRecord {
            user_id: UserId(self.user_id),
            tier,
            status,
            started_at: self.started_at,
            ends_at: self.ends_at,
            stripe_customer_id: self.stripe_customer_id,
            stripe_subscription_id: self.stripe_subscription_id,
            usage: usage.into_iter().map(|u| (u.feature, u.count)).collect(),
        })
    }
}
