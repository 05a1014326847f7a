//! Subscription engine errors

use thiserror::Error;

/// Subscription engine errors
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// No subscription record for the user. Records are created at
    /// registration, so hitting this is a data-integrity fault, not a
    /// user error.
    #[error("subscription record not found")]
    NotFound,

    /// Feature not available on the user's current tier. Expected
    /// control flow, surfaced as a 403 with an upgrade prompt.
    #[error("feature '{feature}' requires a paid tier")]
    AccessDenied {
        /// Feature that was denied
        feature: String,
    },

    /// Free-tier monthly quota exhausted for a usage-limited feature
    #[error("monthly limit for '{feature}' reached: {current} of {limit}")]
    QuotaExceeded {
        /// Feature that was denied
        feature: String,
        /// Monthly quota
        limit: i64,
        /// Usage recorded so far this cycle
        current: i64,
    },

    /// Usage amounts must be non-negative
    #[error("invalid usage amount: {0}")]
    InvalidAmount(i64),

    /// Webhook payload failed signature verification or could not be
    /// parsed at all (distinct from events that parse but lack
    /// correlation metadata, which are dropped, not raised)
    #[error("webhook rejected: {0}")]
    WebhookRejected(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] skillforge_db::DbError),
}

impl SubscriptionError {
    /// Expected user-facing denials: never logged as errors, mapped to
    /// 403 with a structured body by the HTTP layer
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::AccessDenied { .. } | Self::QuotaExceeded { .. })
    }
}
