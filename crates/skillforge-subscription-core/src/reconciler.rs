//! Payment webhook reconciler
//!
//! Translates verified processor events into lifecycle calls. Events
//! are applied as pure functions of current state plus event — never
//! incremental deltas — so at-least-once, out-of-order redelivery is
//! naturally safe without a dedup table.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use skillforge_db::{SubscriptionStore, UsageStore};
use skillforge_types::{Tier, UserId};

use crate::error::SubscriptionError;
use crate::service::{ProcessorRefs, SubscriptionService};
use crate::webhook::{PaymentEvent, PaymentEventKind};

/// What the reconciler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A lifecycle transition was applied
    Applied,
    /// Payment notification, logged only
    Logged,
    /// Missing correlation metadata; dropped with a warning
    Dropped,
    /// Event kind the engine does not handle
    Ignored,
}

/// Applies processor events to local subscription state
pub struct WebhookReconciler<S, U> {
    service: Arc<SubscriptionService<S, U>>,
}

impl<S, U> WebhookReconciler<S, U>
where
    S: SubscriptionStore,
    U: UsageStore,
{
    /// Create a reconciler over the lifecycle service
    pub fn new(service: Arc<SubscriptionService<S, U>>) -> Self {
        Self { service }
    }

    /// Apply one verified event. Idempotent: redelivering the same
    /// event, in any order relative to its siblings, converges on the
    /// same record.
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn apply(&self, event: PaymentEvent) -> Result<ReconcileOutcome, SubscriptionError> {
        match event.kind {
            PaymentEventKind::SubscriptionCreated | PaymentEventKind::SubscriptionUpdated => {
                let Some((user_id, tier)) = correlate(&event) else {
                    return Ok(self.drop_uncorrelated(&event));
                };
                self.service
                    .upgrade_tier(
                        user_id,
                        tier,
                        ProcessorRefs {
                            customer_id: event.stripe_customer_id,
                            subscription_id: event.stripe_subscription_id,
                        },
                    )
                    .await?;
                info!(event_id = %event.id, user_id = %user_id, tier = %tier, "Applied subscription state from webhook");
                Ok(ReconcileOutcome::Applied)
            }
            PaymentEventKind::SubscriptionDeleted => {
                let Some(user_id) = event.user_id else {
                    return Ok(self.drop_uncorrelated(&event));
                };
                self.service.expire_subscription(user_id).await?;
                info!(event_id = %event.id, user_id = %user_id, "Expired subscription from webhook");
                Ok(ReconcileOutcome::Applied)
            }
            PaymentEventKind::PaymentSucceeded => {
                info!(event_id = %event.id, user_id = ?event.user_id, "Payment succeeded");
                Ok(ReconcileOutcome::Logged)
            }
            PaymentEventKind::PaymentFailed => {
                warn!(event_id = %event.id, user_id = ?event.user_id, "Payment failed");
                Ok(ReconcileOutcome::Logged)
            }
            PaymentEventKind::Unknown(ref kind) => {
                debug!(event_id = %event.id, kind = %kind, "Ignoring unhandled webhook event kind");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    /// An event without correlating metadata can never be attributed
    /// to a user. Warn and drop — redelivery may carry correct
    /// metadata, or the event is permanently ignorable; applying it to
    /// a guessed user is never an option.
    fn drop_uncorrelated(&self, event: &PaymentEvent) -> ReconcileOutcome {
        warn!(
            event_id = %event.id,
            kind = ?event.kind,
            "Dropping webhook event without user correlation metadata"
        );
        ReconcileOutcome::Dropped
    }
}

fn correlate(event: &PaymentEvent) -> Option<(UserId, Tier)> {
    Some((event.user_id?, event.tier?))
}
