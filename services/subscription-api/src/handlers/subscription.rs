//! Subscription handlers

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use skillforge_types::{SubscriptionRecord, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub user_id: String,
    pub tier: String,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
}

impl From<SubscriptionRecord> for SubscriptionResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            tier: record.tier.to_string(),
            status: record.status.to_string(),
            started_at: record.started_at.to_rfc3339(),
            ends_at: record.ends_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&query.user_id)?;

    let record = state.subscriptions.get_subscription(user_id).await?;

    metrics::histogram!("subscription_operation_duration_seconds", "operation" => "get_subscription")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(record.into()))
}

/// POST /api/v1/subscription/cancel
///
/// Flips status to cancelled; tier and period end stay untouched, so
/// paid access continues until the expiry sweep ends the grace period.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;

    let record = state.subscriptions.cancel_subscription(user_id).await?;

    metrics::counter!("subscription_cancellations_total").increment(1);
    metrics::histogram!("subscription_operation_duration_seconds", "operation" => "cancel")
        .record(start.elapsed().as_secs_f64());

    tracing::info!(user_id = %user_id, "Subscription cancellation requested");

    Ok(Json(record.into()))
}
