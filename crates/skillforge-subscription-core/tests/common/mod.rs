//! Shared test fixtures

pub mod mock_stores;

use std::sync::Arc;

use skillforge_subscription_core::SubscriptionService;
use skillforge_types::{Tier, UserId};

use mock_stores::{MockSubscriptionStore, MockUsageStore};

pub type TestService = SubscriptionService<MockSubscriptionStore, MockUsageStore>;

/// Service over fresh in-memory stores
pub fn test_service() -> (Arc<TestService>, Arc<MockSubscriptionStore>, Arc<MockUsageStore>) {
    let subscriptions = Arc::new(MockSubscriptionStore::new());
    let usage = Arc::new(MockUsageStore::new());
    let service = Arc::new(SubscriptionService::new(
        subscriptions.clone(),
        usage.clone(),
    ));
    (service, subscriptions, usage)
}

/// Register a user on the given tier and return their id
pub async fn registered_user(service: &TestService, tier: Tier) -> UserId {
    let user_id = UserId::new();
    service.create_subscription(user_id, Tier::Free).await.unwrap();
    if tier.is_paid() {
        service
            .upgrade_tier(user_id, tier, Default::default())
            .await
            .unwrap();
    }
    user_id
}
