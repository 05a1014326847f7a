//! Access enforcement layer
//!
//! Each guarded operation declares a static [`OperationGate`] value
//! naming its feature gate and/or usage gate. The [`Gatekeeper`] runs
//! both checks before the operation and charges quota only after it
//! completed — rejected attempts and failed operations are never
//! billed against the monthly limit.

use std::sync::Arc;

use skillforge_db::{SubscriptionStore, UsageStore};
use skillforge_types::UserId;

use crate::error::SubscriptionError;
use crate::service::SubscriptionService;

/// Static gate descriptor attached to an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationGate {
    /// Tier-gated feature name, if the operation is tier-restricted
    pub feature: Option<&'static str>,
    /// Usage-limited feature name, if the operation consumes quota
    pub usage: Option<&'static str>,
}

impl OperationGate {
    /// An ungated operation
    pub const fn open() -> Self {
        Self {
            feature: None,
            usage: None,
        }
    }

    /// Tier-gated only
    pub const fn feature(name: &'static str) -> Self {
        Self {
            feature: Some(name),
            usage: None,
        }
    }

    /// Quota-gated only
    pub const fn usage(name: &'static str) -> Self {
        Self {
            feature: None,
            usage: Some(name),
        }
    }

    /// Both tier- and quota-gated
    pub const fn feature_and_usage(feature: &'static str, usage: &'static str) -> Self {
        Self {
            feature: Some(feature),
            usage: Some(usage),
        }
    }
}

/// Request-time enforcement over the lifecycle service
pub struct Gatekeeper<S, U> {
    service: Arc<SubscriptionService<S, U>>,
}

impl<S, U> Gatekeeper<S, U>
where
    S: SubscriptionStore,
    U: UsageStore,
{
    /// Create a gatekeeper over the lifecycle service
    pub fn new(service: Arc<SubscriptionService<S, U>>) -> Self {
        Self { service }
    }

    /// Pre-call check. Pure policy: no side effects on denial, so a
    /// retried request after a denial consumes nothing.
    pub async fn before(
        &self,
        user_id: UserId,
        gate: &OperationGate,
    ) -> Result<(), SubscriptionError> {
        if let Some(feature) = gate.feature {
            self.service.require_feature_access(user_id, feature).await?;
        }
        if let Some(feature) = gate.usage {
            self.service.require_usage_limit(user_id, feature).await?;
        }
        Ok(())
    }

    /// Post-call hook: charge one unit of quota, only invoked by the
    /// caller once the guarded operation completed without error
    pub async fn after_success(
        &self,
        user_id: UserId,
        gate: &OperationGate,
    ) -> Result<(), SubscriptionError> {
        if let Some(feature) = gate.usage {
            self.service.track_usage(user_id, feature, 1).await?;
        }
        Ok(())
    }
}

impl<S, U> Clone for Gatekeeper<S, U> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}
