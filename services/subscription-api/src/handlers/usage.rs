//! Usage tracking handlers

use std::collections::HashMap;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiError, ApiResult};
use crate::handlers::subscription::{parse_user_id, UserQuery};
use crate::state::AppState;

/// Record operation duration with result label
#[inline]
fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "subscription_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub user_id: String,
    pub feature: String,
    #[serde(default = "default_amount")]
    pub amount: i64,
}

fn default_amount() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct RecordUsageResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UsageSummaryResponse {
    pub tier: String,
    pub usage: HashMap<String, i64>,
    /// Per-feature monthly quotas; absent for paid tiers (unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<HashMap<String, i64>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/usage/record
///
/// The post-success hook: called after a guarded operation completed,
/// so it records unconditionally and never runs the quota gate.
#[instrument(skip(state, req), fields(user_id = %req.user_id, feature = %req.feature, amount = req.amount))]
pub async fn record_usage(
    State(state): State<AppState>,
    Json(req): Json<RecordUsageRequest>,
) -> ApiResult<Json<RecordUsageResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;

    if req.amount < 0 {
        return Err(ApiError::BadRequest(
            "Amount must be non-negative".to_string(),
        ));
    }

    state
        .subscriptions
        .track_usage(user_id, &req.feature, req.amount)
        .await?;

    let feature = req.feature;
    metrics::counter!("usage_recorded_total", "feature" => feature)
        .increment(req.amount as u64);
    record_op_duration("record_usage", start, true);

    Ok(Json(RecordUsageResponse { success: true }))
}

/// GET /api/v1/subscription/usage
#[instrument(skip(state, query), fields(user_id = %query.user_id))]
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<UsageSummaryResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&query.user_id)?;

    let summary = state.subscriptions.usage_summary(user_id).await?;

    record_op_duration("get_usage", start, true);

    Ok(Json(UsageSummaryResponse {
        tier: summary.tier.to_string(),
        usage: summary.usage,
        limits: summary.limits,
    }))
}
