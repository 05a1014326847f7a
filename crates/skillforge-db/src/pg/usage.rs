//! PostgreSQL usage counter store implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::UsageRow;
use crate::store::UsageStore;

/// PostgreSQL usage store
#[derive(Clone)]
pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    /// Create a new usage store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn increment(&self, user_id: Uuid, feature: &str, amount: i64) -> DbResult<()> {
        // Atomic upsert: concurrent increments for the same counter all
        // land, unlike a fetch-then-save which could lose updates.
        sqlx::query(
            r#"
            INSERT INTO usage_counters (user_id, feature, count)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, feature)
            DO UPDATE SET count = usage_counters.count + EXCLUDED.count,
                          recorded_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(feature)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, user_id: Uuid, feature: &str) -> DbResult<i64> {
        let count: Option<(i64,)> = sqlx::query_as(
            "SELECT count FROM usage_counters WHERE user_id = $1 AND feature = $2",
        )
        .bind(user_id)
        .bind(feature)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.map_or(0, |(c,)| c))
    }

    async fn get_all(&self, user_id: Uuid) -> DbResult<Vec<UsageRow>> {
        let rows = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT user_id, feature, count, recorded_at
            FROM usage_counters
            WHERE user_id = $1
            ORDER BY feature
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn reset(&self, user_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM usage_counters WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
