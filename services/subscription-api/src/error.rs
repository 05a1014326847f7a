//! Error types for the Subscription API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use skillforge_subscription_core::SubscriptionError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DenialDetails>,
}

/// Structured denial payload, enough for a client to render an upgrade
/// prompt without further round-trips
#[derive(Debug, Serialize)]
pub struct DenialDetails {
    pub feature: String,
    pub upgrade_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<i64>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SubscriptionNotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Subscription(e) => match e {
                SubscriptionError::AccessDenied { .. }
                | SubscriptionError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
                SubscriptionError::NotFound => StatusCode::NOT_FOUND,
                SubscriptionError::InvalidAmount(_)
                | SubscriptionError::WebhookRejected(_) => StatusCode::BAD_REQUEST,
                SubscriptionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Subscription(e) => match e {
                SubscriptionError::AccessDenied { .. } => "FEATURE_NOT_AVAILABLE",
                SubscriptionError::QuotaExceeded { .. } => "USAGE_LIMIT_REACHED",
                SubscriptionError::NotFound => "SUBSCRIPTION_NOT_FOUND",
                SubscriptionError::InvalidAmount(_) => "INVALID_AMOUNT",
                SubscriptionError::WebhookRejected(_) => "WEBHOOK_REJECTED",
                SubscriptionError::Database(_) => "INTERNAL_ERROR",
            },
        }
    }

    fn denial_details(&self) -> Option<DenialDetails> {
        let Self::Subscription(e) = self else {
            return None;
        };
        match e {
            SubscriptionError::AccessDenied { feature } => Some(DenialDetails {
                feature: feature.clone(),
                upgrade_required: true,
                limit: None,
                current_usage: None,
            }),
            SubscriptionError::QuotaExceeded {
                feature,
                limit,
                current,
            } => Some(DenialDetails {
                feature: feature.clone(),
                upgrade_required: true,
                limit: Some(*limit),
                current_usage: Some(*current),
            }),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Denials are expected control flow; only real faults get an
        // error-level log line
        match &self {
            Self::Subscription(e) if e.is_denial() => {
                tracing::debug!(error = %e, "Request denied by gate");
            }
            Self::Subscription(SubscriptionError::Database(e)) => {
                tracing::error!(error = ?e, "Internal API error");
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.denial_details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
