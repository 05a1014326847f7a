//! SkillForge Subscription Core - Subscription & usage-gating engine
//!
//! The billing core of the platform: tracks each user's tier and
//! lifecycle state, enforces feature gates and Free-tier monthly
//! quotas, reconciles local state with Stripe webhook events, and
//! exposes the time-driven sweeps (expiry, monthly usage reset).
//!
//! # Example
//!
//! ```rust,ignore
//! use skillforge_subscription_core::{SubscriptionService, OperationGate, Gatekeeper};
//!
//! let service = Arc::new(SubscriptionService::new(subscriptions, usage));
//! let gate = OperationGate::feature_and_usage("github_export", "roadmaps");
//!
//! let keeper = Gatekeeper::new(service.clone());
//! keeper.before(user_id, &gate).await?;   // deny before the work runs
//! do_the_work().await?;
//! keeper.after_success(user_id, &gate).await?; // charge quota only on success
//! ```

pub mod error;
pub mod gates;
pub mod guard;
pub mod jobs;
pub mod reconciler;
pub mod service;
pub mod webhook;

pub use error::SubscriptionError;
pub use guard::{Gatekeeper, OperationGate};
pub use jobs::{SubscriptionSweeper, SweepOutcome};
pub use reconciler::{ReconcileOutcome, WebhookReconciler};
pub use service::{ProcessorRefs, SubscriptionService, BILLING_PERIOD_DAYS};
pub use webhook::{PaymentEvent, PaymentEventKind, WebhookVerifier};
