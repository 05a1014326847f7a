//! Scheduled transition sweeps
//!
//! Two periodic, idempotent batch jobs over the subscription store:
//! the expiry sweep (ends the cancellation grace period and demotes
//! paid records whose renewal webhook never arrived) and the monthly
//! Free-tier usage reset. Each is a single parameterless callable for
//! the scheduler; both isolate per-record failures so one bad record
//! never aborts the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use skillforge_db::{SubscriptionStore, UsageStore};
use skillforge_types::Tier;

use crate::error::SubscriptionError;
use crate::service::SubscriptionService;

/// Counts from one sweep run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Records matching the sweep condition
    pub scanned: usize,
    /// Transitions applied
    pub applied: usize,
    /// Records skipped after a per-record failure
    pub failed: usize,
}

/// Runs the time-driven sweeps over the lifecycle service
pub struct SubscriptionSweeper<S, U> {
    service: Arc<SubscriptionService<S, U>>,
}

impl<S, U> SubscriptionSweeper<S, U>
where
    S: SubscriptionStore,
    U: UsageStore,
{
    /// Create a sweeper over the lifecycle service
    pub fn new(service: Arc<SubscriptionService<S, U>>) -> Self {
        Self { service }
    }

    /// Expire every subscription whose period end has passed
    /// (suggested cadence: hourly)
    pub async fn expire_overdue(&self) -> Result<SweepOutcome, SubscriptionError> {
        self.expire_overdue_as_of(Utc::now()).await
    }

    /// Clock-injected form of [`expire_overdue`]
    ///
    /// [`expire_overdue`]: Self::expire_overdue
    #[instrument(skip(self))]
    pub async fn expire_overdue_as_of(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<SweepOutcome, SubscriptionError> {
        let overdue = self.service.list_overdue(as_of).await?;
        let mut outcome = SweepOutcome {
            scanned: overdue.len(),
            ..SweepOutcome::default()
        };

        for user_id in overdue {
            match self.service.expire_subscription(user_id).await {
                Ok(_) => outcome.applied += 1,
                Err(e) => {
                    // Isolate the failure; the rest of the batch still runs
                    error!(user_id = %user_id, error = %e, "Expiry sweep failed for record");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.scanned > 0 {
            info!(
                scanned = outcome.scanned,
                applied = outcome.applied,
                failed = outcome.failed,
                "Expiry sweep complete"
            );
        }
        Ok(outcome)
    }

    /// Clear usage counters for every Free-tier user (cadence: once at
    /// the start of each calendar month). Paid tiers never track
    /// against a quota, so they carry nothing to reset.
    #[instrument(skip(self))]
    pub async fn reset_free_tier_usage(&self) -> Result<SweepOutcome, SubscriptionError> {
        let users = self.service.list_users_on_tier(Tier::Free).await?;
        let mut outcome = SweepOutcome {
            scanned: users.len(),
            ..SweepOutcome::default()
        };

        for user_id in users {
            match self.service.reset_monthly_usage(user_id).await {
                Ok(()) => outcome.applied += 1,
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Usage reset sweep failed for record");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            scanned = outcome.scanned,
            applied = outcome.applied,
            failed = outcome.failed,
            "Monthly usage reset sweep complete"
        );
        Ok(outcome)
    }
}
