//! Access check handler
//!
//! The pre-call gate other services hit before running a guarded
//! operation: feature gate first, then quota. Denials come back as the
//! structured 403 body so callers can render an upgrade prompt.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiResult;
use crate::handlers::subscription::parse_user_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessCheckRequest {
    pub user_id: String,
    pub feature: String,
    /// Also check the remaining quota, not just the tier gate
    #[serde(default)]
    pub check_quota: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    pub allowed: bool,
}

/// POST /api/v1/access/check
#[instrument(skip(state, req), fields(feature = %req.feature))]
pub async fn check_access(
    State(state): State<AppState>,
    Json(req): Json<AccessCheckRequest>,
) -> ApiResult<Json<AccessCheckResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(&req.user_id)?;

    state
        .subscriptions
        .require_feature_access(user_id, &req.feature)
        .await?;
    if req.check_quota {
        state
            .subscriptions
            .require_usage_limit(user_id, &req.feature)
            .await?;
    }

    metrics::counter!("access_checks_total", "result" => "allowed").increment(1);
    metrics::histogram!("subscription_operation_duration_seconds", "operation" => "check_access")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(AccessCheckResponse { allowed: true }))
}
