//! Store traits
//!
//! Async repository interfaces over the durable subscription state.
//! Mutating methods are specified as atomic per-row operations; an
//! implementation must not widen them into fetch-then-save sequences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{SubscriptionRow, UsageRow};

/// Fields written together by a tier upgrade.
///
/// An upgrade is a full overwrite of the lifecycle fields: applying the
/// same upgrade twice yields the same row, which is what makes webhook
/// redelivery safe.
#[derive(Debug, Clone)]
pub struct UpgradeWrite {
    pub tier: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

/// Per-user subscription row store
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Find the subscription row for a user
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Create the row at registration time if it does not exist yet;
    /// returns the row either way (idempotent)
    async fn create_if_absent(&self, user_id: Uuid, tier: &str) -> DbResult<SubscriptionRow>;

    /// Apply a tier upgrade: sets tier, status to active, and the new
    /// period in one statement, clearing any previous cancellation
    async fn apply_upgrade(&self, user_id: Uuid, write: UpgradeWrite) -> DbResult<SubscriptionRow>;

    /// Flip an active subscription to cancelled, preserving tier and
    /// period end; a no-op on already-cancelled or expired rows
    async fn apply_cancel(&self, user_id: Uuid) -> DbResult<SubscriptionRow>;

    /// Revert unconditionally to the expired shape: free tier, no
    /// period end, no subscription reference (idempotent)
    async fn apply_expiry(&self, user_id: Uuid) -> DbResult<SubscriptionRow>;

    /// Rows whose paid period ended before `as_of` and which still
    /// carry benefits (active or cancelled) — the expiry sweep input
    async fn find_expired(&self, as_of: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>>;

    /// User ids of every row on the given tier — the reset sweep input
    async fn find_user_ids_by_tier(&self, tier: &str) -> DbResult<Vec<Uuid>>;
}

/// Monthly usage counter store
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically add `amount` to a counter, creating it at zero first.
    ///
    /// This is deliberately not a read-modify-write: concurrent
    /// increments for the same (user, feature) must all be counted.
    async fn increment(&self, user_id: Uuid, feature: &str, amount: i64) -> DbResult<()>;

    /// Current counter value; missing counter reads as 0
    async fn get(&self, user_id: Uuid, feature: &str) -> DbResult<i64>;

    /// All counters for a user
    async fn get_all(&self, user_id: Uuid) -> DbResult<Vec<UsageRow>>;

    /// Clear every counter for a user (monthly reset)
    async fn reset(&self, user_id: Uuid) -> DbResult<()>;
}
