//! In-memory stores for testing
//!
//! DashMap-backed implementations of the store traits, mirroring the
//! single-statement atomicity of the Postgres implementations. Both
//! support poisoning individual users to exercise per-record failure
//! isolation in the sweeps.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use skillforge_db::{
    DbError, DbResult, SubscriptionRow, SubscriptionStore, UpgradeWrite, UsageRow, UsageStore,
};

/// In-memory subscription store
#[derive(Default, Clone)]
pub struct MockSubscriptionStore {
    rows: Arc<DashMap<Uuid, SubscriptionRow>>,
    poisoned: Arc<DashSet<Uuid>>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutation for this user fail (failure-isolation tests)
    #[allow(dead_code)]
    pub fn poison(&self, user_id: Uuid) {
        self.poisoned.insert(user_id);
    }

    fn check_poison(&self, user_id: Uuid) -> DbResult<()> {
        if self.poisoned.contains(&user_id) {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MockSubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.rows.get(&user_id).map(|r| r.value().clone()))
    }

    async fn create_if_absent(&self, user_id: Uuid, tier: &str) -> DbResult<SubscriptionRow> {
        let now = Utc::now();
        let row = self
            .rows
            .entry(user_id)
            .or_insert_with(|| SubscriptionRow {
                user_id,
                tier: tier.to_string(),
                status: "active".to_string(),
                started_at: now,
                ends_at: None,
                stripe_customer_id: None,
                stripe_subscription_id: None,
                created_at: now,
                updated_at: now,
            })
            .clone();
        Ok(row)
    }

    async fn apply_upgrade(&self, user_id: Uuid, write: UpgradeWrite) -> DbResult<SubscriptionRow> {
        self.check_poison(user_id)?;
        let mut row = self.rows.get_mut(&user_id).ok_or(DbError::NotFound)?;
        row.tier = write.tier;
        row.status = "active".to_string();
        row.started_at = write.started_at;
        row.ends_at = write.ends_at;
        if write.stripe_customer_id.is_some() {
            row.stripe_customer_id = write.stripe_customer_id;
        }
        row.stripe_subscription_id = write.stripe_subscription_id;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn apply_cancel(&self, user_id: Uuid) -> DbResult<SubscriptionRow> {
        self.check_poison(user_id)?;
        let mut row = self.rows.get_mut(&user_id).ok_or(DbError::NotFound)?;
        if row.status == "active" {
            row.status = "cancelled".to_string();
            row.updated_at = Utc::now();
        }
        Ok(row.clone())
    }

    async fn apply_expiry(&self, user_id: Uuid) -> DbResult<SubscriptionRow> {
        self.check_poison(user_id)?;
        let mut row = self.rows.get_mut(&user_id).ok_or(DbError::NotFound)?;
        row.tier = "free".to_string();
        row.status = "expired".to_string();
        row.ends_at = None;
        row.stripe_subscription_id = None;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn find_expired(&self, as_of: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                matches!(r.status.as_str(), "active" | "cancelled")
                    && r.ends_at.is_some_and(|end| end < as_of)
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn find_user_ids_by_tier(&self, tier: &str) -> DbResult<Vec<Uuid>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| r.user_id)
            .collect())
    }
}

/// In-memory usage counter store
#[derive(Default, Clone)]
pub struct MockUsageStore {
    counters: Arc<DashMap<(Uuid, String), i64>>,
    poisoned: Arc<DashSet<Uuid>>,
}

impl MockUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutation for this user fail
    #[allow(dead_code)]
    pub fn poison(&self, user_id: Uuid) {
        self.poisoned.insert(user_id);
    }
}

#[async_trait]
impl UsageStore for MockUsageStore {
    async fn increment(&self, user_id: Uuid, feature: &str, amount: i64) -> DbResult<()> {
        if self.poisoned.contains(&user_id) {
            return Err(DbError::NotFound);
        }
        *self
            .counters
            .entry((user_id, feature.to_string()))
            .or_insert(0) += amount;
        Ok(())
    }

    async fn get(&self, user_id: Uuid, feature: &str) -> DbResult<i64> {
        Ok(self
            .counters
            .get(&(user_id, feature.to_string()))
            .map_or(0, |c| *c))
    }

    async fn get_all(&self, user_id: Uuid) -> DbResult<Vec<UsageRow>> {
        Ok(self
            .counters
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| UsageRow {
                user_id,
                feature: entry.key().1.clone(),
                count: *entry.value(),
                recorded_at: Utc::now(),
            })
            .collect())
    }

    async fn reset(&self, user_id: Uuid) -> DbResult<()> {
        if self.poisoned.contains(&user_id) {
            return Err(DbError::NotFound);
        }
        self.counters.retain(|(uid, _), _| *uid != user_id);
        Ok(())
    }
}
