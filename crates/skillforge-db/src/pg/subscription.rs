//! PostgreSQL subscription store implementation
//!
//! Each lifecycle mutation is a single UPDATE with RETURNING, so two
//! racing transitions (a webhook upgrade against a sweep expiry)
//! serialize on the row lock and can never interleave half-applied
//! field sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;
use crate::store::{SubscriptionStore, UpgradeWrite};

const SUBSCRIPTION_COLUMNS: &str = "user_id, tier, status, started_at, ends_at, \
     stripe_customer_id, stripe_subscription_id, created_at, updated_at";

/// PostgreSQL subscription store
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    /// Create a new subscription store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1",
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create_if_absent(&self, user_id: Uuid, tier: &str) -> DbResult<SubscriptionRow> {
        // ON CONFLICT DO NOTHING keeps registration retries harmless;
        // the follow-up SELECT covers the row that already existed.
        sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, tier, status, started_at)
            VALUES ($1, $2, 'active', NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(tier)
        .execute(&self.pool)
        .await?;

        self.find_by_user(user_id).await?.ok_or(DbError::NotFound)
    }

    async fn apply_upgrade(&self, user_id: Uuid, write: UpgradeWrite) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET tier = $2,
                status = 'active',
                started_at = $3,
                ends_at = $4,
                stripe_customer_id = COALESCE($5, stripe_customer_id),
                stripe_subscription_id = $6,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(&write.tier)
        .bind(write.started_at)
        .bind(write.ends_at)
        .bind(&write.stripe_customer_id)
        .bind(&write.stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn apply_cancel(&self, user_id: Uuid) -> DbResult<SubscriptionRow> {
        // The status guard makes cancel idempotent and keeps it from
        // resurrecting an expired row; when the guard does not match we
        // return the row unchanged.
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', updated_at = NOW()
            WHERE user_id = $1 AND status = 'active'
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row),
            None => self.find_by_user(user_id).await?.ok_or(DbError::NotFound),
        }
    }

    async fn apply_expiry(&self, user_id: Uuid) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET tier = 'free',
                status = 'expired',
                ends_at = NULL,
                stripe_subscription_id = NULL,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn find_expired(&self, as_of: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE ends_at < $1 AND status IN ('active', 'cancelled')
            ORDER BY ends_at
            "#,
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_user_ids_by_tier(&self, tier: &str) -> DbResult<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM subscriptions WHERE tier = $1")
                .bind(tier)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
