//! SkillForge DB - Durable subscription store
//!
//! SQLx-based persistence layer for the subscription engine. Exposes
//! two repository traits:
//!
//! - [`SubscriptionStore`]: the per-user subscription row. Every
//!   mutating operation is a single SQL statement, so concurrent
//!   lifecycle transitions serialize on the row inside Postgres and
//!   there is no fetch-then-save window.
//! - [`UsageStore`]: monthly usage counters, incremented with an
//!   atomic upsert rather than read-modify-write.
//!
//! # Example
//!
//! ```rust,ignore
//! use skillforge_db::{create_pool, Stores};
//!
//! let pool = create_pool("postgres://localhost/skillforge").await?;
//! let stores = Stores::new(pool);
//!
//! stores.usage.increment(user_id, "roadmaps", 1).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod store;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Stores;
pub use pool::{create_pool, DbPool};
pub use store::*;
