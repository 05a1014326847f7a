//! Subscription lifecycle service
//!
//! The state machine over (tier, status): create, upgrade, cancel with
//! grace period, expire, plus the access and quota checks the
//! enforcement layer runs before guarded operations.
//!
//! Every mutation goes through the store as a single atomic statement;
//! this service never does fetch-then-save on the subscription row, so
//! a webhook-driven upgrade racing a sweep-driven expiry serializes in
//! the store rather than interleaving here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use skillforge_db::{SubscriptionStore, UpgradeWrite, UsageStore};
use skillforge_types::{SubscriptionRecord, Tier, UserId, UsageSummary};

use crate::error::SubscriptionError;
use crate::gates;

/// Fixed paid billing period. The engine does not model arbitrary
/// billing intervals or calendar-month anchoring.
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// Stripe-side references attached to an upgrade, captured from the
/// checkout flow or from webhook metadata
#[derive(Debug, Clone, Default)]
pub struct ProcessorRefs {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

impl ProcessorRefs {
    /// Refs carrying only a subscription id
    pub fn subscription(id: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            subscription_id: Some(id.into()),
        }
    }
}

/// Subscription lifecycle service
pub struct SubscriptionService<S, U> {
    subscriptions: Arc<S>,
    usage: Arc<U>,
}

impl<S, U> SubscriptionService<S, U>
where
    S: SubscriptionStore,
    U: UsageStore,
{
    /// Create a new lifecycle service over the two stores
    pub fn new(subscriptions: Arc<S>, usage: Arc<U>) -> Self {
        Self {
            subscriptions,
            usage,
        }
    }

    /// Get the full subscription record including usage counters.
    ///
    /// A missing record after registration is a data-integrity fault
    /// and is logged as such before propagating.
    pub async fn get_subscription(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let row = self
            .subscriptions
            .find_by_user(user_id.0)
            .await?
            .ok_or_else(|| {
                tracing::error!(user_id = %user_id, "Subscription record missing for registered user");
                SubscriptionError::NotFound
            })?;

        let usage = self.usage.get_all(user_id.0).await?;
        Ok(row.into_record(usage)?)
    }

    /// Create the subscription record at registration time. Idempotent:
    /// calling it for an existing user returns the existing record.
    #[instrument(skip(self), fields(user_id = %user_id, tier = %tier))]
    pub async fn create_subscription(
        &self,
        user_id: UserId,
        tier: Tier,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let row = self
            .subscriptions
            .create_if_absent(user_id.0, tier.as_str())
            .await?;
        Ok(row.into_record(Vec::new())?)
    }

    /// Move the user onto a tier: status becomes active, the period
    /// restarts now, and paid tiers get a fresh 30-day period end.
    /// Overwrites any previous cancellation, which is what makes
    /// webhook redelivery of the same state a harmless repeat write.
    #[instrument(skip(self, refs), fields(user_id = %user_id, tier = %tier))]
    pub async fn upgrade_tier(
        &self,
        user_id: UserId,
        tier: Tier,
        refs: ProcessorRefs,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let now = Utc::now();
        let ends_at = tier
            .is_paid()
            .then(|| now + Duration::days(BILLING_PERIOD_DAYS));

        let row = self
            .subscriptions
            .apply_upgrade(
                user_id.0,
                UpgradeWrite {
                    tier: tier.as_str().to_string(),
                    started_at: now,
                    ends_at,
                    stripe_customer_id: refs.customer_id,
                    stripe_subscription_id: refs.subscription_id,
                },
            )
            .await
            .map_err(not_found_as_integrity(user_id))?;

        info!(user_id = %user_id, tier = %tier, ends_at = ?ends_at, "Subscription tier updated");
        let usage = self.usage.get_all(user_id.0).await?;
        Ok(row.into_record(usage)?)
    }

    /// Cancel the subscription, keeping tier and period end untouched:
    /// paid access persists until `ends_at` (the grace period), after
    /// which the expiry sweep reverts the record. Idempotent.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cancel_subscription(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let row = self
            .subscriptions
            .apply_cancel(user_id.0)
            .await
            .map_err(not_found_as_integrity(user_id))?;

        info!(user_id = %user_id, status = %row.status, "Subscription cancelled");
        let usage = self.usage.get_all(user_id.0).await?;
        Ok(row.into_record(usage)?)
    }

    /// Revert unconditionally to `{tier: free, status: expired}` with
    /// no period end and no Stripe subscription ref. Idempotent; safe
    /// to call redundantly from the webhook path and the expiry sweep.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn expire_subscription(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let row = self
            .subscriptions
            .apply_expiry(user_id.0)
            .await
            .map_err(not_found_as_integrity(user_id))?;

        info!(user_id = %user_id, "Subscription expired, reverted to free tier");
        let usage = self.usage.get_all(user_id.0).await?;
        Ok(row.into_record(usage)?)
    }

    /// Whether the user's tier grants the feature. Fail-closed: a
    /// missing record or a feature absent from the gate table is
    /// `false`, never an error.
    ///
    /// Status is deliberately not consulted: a cancelled subscription
    /// keeps its tier (and therefore its access) until the expiry
    /// sweep reverts the tier itself.
    pub async fn check_feature_access(
        &self,
        user_id: UserId,
        feature: &str,
    ) -> Result<bool, SubscriptionError> {
        let Some(row) = self.subscriptions.find_by_user(user_id.0).await? else {
            return Ok(false);
        };
        let Ok(tier) = row.tier.parse::<Tier>() else {
            warn!(user_id = %user_id, tier = %row.tier, "Unparseable tier in store, denying access");
            return Ok(false);
        };
        Ok(gates::tier_allows(feature, tier))
    }

    /// Pre-call guard form of [`check_feature_access`]
    ///
    /// [`check_feature_access`]: Self::check_feature_access
    pub async fn require_feature_access(
        &self,
        user_id: UserId,
        feature: &str,
    ) -> Result<(), SubscriptionError> {
        if self.check_feature_access(user_id, feature).await? {
            Ok(())
        } else {
            Err(SubscriptionError::AccessDenied {
                feature: feature.to_string(),
            })
        }
    }

    /// Whether the user has quota left for a usage-limited feature.
    /// Paid tiers are always `true`; Free compares the counter to the
    /// table quota, treating a missing counter as 0. A feature with no
    /// entry in the limits table is not usage-gated and passes.
    pub async fn check_usage_limit(
        &self,
        user_id: UserId,
        feature: &str,
    ) -> Result<bool, SubscriptionError> {
        let Some(row) = self.subscriptions.find_by_user(user_id.0).await? else {
            return Ok(false);
        };
        if row.tier.parse::<Tier>().is_ok_and(|t| t.is_paid()) {
            return Ok(true);
        }
        let Some(limit) = gates::free_tier_limit(feature) else {
            return Ok(true);
        };
        let current = self.usage.get(user_id.0, feature).await?;
        Ok(current < limit)
    }

    /// Pre-call guard form of [`check_usage_limit`], carrying the limit
    /// and current usage so the denial can be rendered to the user
    ///
    /// [`check_usage_limit`]: Self::check_usage_limit
    pub async fn require_usage_limit(
        &self,
        user_id: UserId,
        feature: &str,
    ) -> Result<(), SubscriptionError> {
        if self.check_usage_limit(user_id, feature).await? {
            return Ok(());
        }
        let limit = gates::free_tier_limit(feature).unwrap_or(0);
        let current = self.usage.get(user_id.0, feature).await?;
        Err(SubscriptionError::QuotaExceeded {
            feature: feature.to_string(),
            limit,
            current,
        })
    }

    /// Record usage after a guarded operation completed. Never fails
    /// for being over-limit: the limit check is a separate, earlier
    /// gate, and tracking always records what actually happened.
    pub async fn track_usage(
        &self,
        user_id: UserId,
        feature: &str,
        amount: i64,
    ) -> Result<(), SubscriptionError> {
        if amount < 0 {
            return Err(SubscriptionError::InvalidAmount(amount));
        }
        self.usage.increment(user_id.0, feature, amount).await?;
        Ok(())
    }

    /// Clear every usage counter for the user (start-of-month reset)
    pub async fn reset_monthly_usage(&self, user_id: UserId) -> Result<(), SubscriptionError> {
        self.usage.reset(user_id.0).await?;
        Ok(())
    }

    /// Usage-stats summary: counters plus the quota table for Free
    /// users, `limits: None` for paid tiers (unlimited)
    pub async fn usage_summary(&self, user_id: UserId) -> Result<UsageSummary, SubscriptionError> {
        let record = self.get_subscription(user_id).await?;
        let limits = (!record.tier.is_paid()).then(|| {
            gates::free_tier_limits()
                .iter()
                .map(|(feature, limit)| (feature.to_string(), *limit))
                .collect()
        });
        Ok(UsageSummary {
            tier: record.tier,
            usage: record.usage,
            limits,
        })
    }

    /// Records whose paid period ended before `as_of` and still carry
    /// benefits — the expiry sweep input
    pub async fn list_overdue(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<UserId>, SubscriptionError> {
        let rows = self.subscriptions.find_expired(as_of).await?;
        Ok(rows.iter().map(skillforge_db::SubscriptionRow::user_id).collect())
    }

    /// Every user on the given tier — the usage reset sweep input
    pub async fn list_users_on_tier(&self, tier: Tier) -> Result<Vec<UserId>, SubscriptionError> {
        let ids = self.subscriptions.find_user_ids_by_tier(tier.as_str()).await?;
        Ok(ids.into_iter().map(UserId).collect())
    }
}

/// Lifecycle transitions hitting a missing row are the same integrity
/// fault as a failed lookup
fn not_found_as_integrity(
    user_id: UserId,
) -> impl FnOnce(skillforge_db::DbError) -> SubscriptionError {
    move |e| match e {
        skillforge_db::DbError::NotFound => {
            tracing::error!(user_id = %user_id, "Lifecycle transition on missing subscription record");
            SubscriptionError::NotFound
        }
        other => SubscriptionError::Database(other),
    }
}
