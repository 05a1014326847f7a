//! PostgreSQL store implementations

mod subscription;
mod usage;

pub use subscription::PgSubscriptionStore;
pub use usage::PgUsageStore;

use crate::DbPool;

/// Both stores bundled together
#[derive(Clone)]
pub struct Stores {
    pub subscriptions: PgSubscriptionStore,
    pub usage: PgUsageStore,
}

impl Stores {
    /// Create all stores from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: PgSubscriptionStore::new(pool.clone()),
            usage: PgUsageStore::new(pool),
        }
    }
}
