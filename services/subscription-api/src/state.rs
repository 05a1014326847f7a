//! Application state for the Subscription API service.

use std::sync::Arc;

use skillforge_db::pg::{PgSubscriptionStore, PgUsageStore};
use skillforge_db::{DbPool, Stores};
use skillforge_subscription_core::{SubscriptionService, WebhookReconciler, WebhookVerifier};

use crate::config::Config;

/// The lifecycle service over the Postgres stores
pub type PgService = SubscriptionService<PgSubscriptionStore, PgUsageStore>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Subscription lifecycle service (gating, quotas, transitions)
    pub subscriptions: Arc<PgService>,
    /// Webhook reconciler over the same service
    pub reconciler: Arc<WebhookReconciler<PgSubscriptionStore, PgUsageStore>>,
    /// Stripe signature verifier
    pub verifier: WebhookVerifier,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(stores: Stores, pool: DbPool, config: Config) -> Self {
        let subscriptions = Arc::new(SubscriptionService::new(
            Arc::new(stores.subscriptions),
            Arc::new(stores.usage),
        ));
        let reconciler = Arc::new(WebhookReconciler::new(subscriptions.clone()));
        let verifier = WebhookVerifier::new(config.stripe_webhook_secret.clone());

        Self {
            subscriptions,
            reconciler,
            verifier,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
