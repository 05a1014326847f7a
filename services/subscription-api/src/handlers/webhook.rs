//! Stripe webhook handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use skillforge_subscription_core::{ReconcileOutcome, SubscriptionError};

use crate::state::AppState;

/// POST /webhooks/stripe
///
/// Raw body in, status code out. Verification happens before the
/// payload is parsed; anything that verifies gets a 200 even when the
/// reconciler drops or ignores it, since Stripe retries non-2xx
/// deliveries and a malformed-but-authentic event will never improve.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();

    let Some(sig_header) = headers.get("stripe-signature") else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };
    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!("Invalid Stripe-Signature header encoding");
        return StatusCode::BAD_REQUEST;
    };

    let event = match state.verifier.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook rejected at verification");
            metrics::counter!("webhooks_processed_total", "status" => "rejected").increment(1);
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.reconciler.apply(event).await {
        Ok(outcome) => {
            let status = match outcome {
                ReconcileOutcome::Applied => "applied",
                ReconcileOutcome::Logged => "logged",
                ReconcileOutcome::Dropped => "dropped",
                ReconcileOutcome::Ignored => "ignored",
            };
            metrics::counter!("webhooks_processed_total", "status" => status).increment(1);
            metrics::histogram!(
                "subscription_operation_duration_seconds",
                "operation" => "process_webhook"
            )
            .record(start.elapsed().as_secs_f64());

            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = ?e, "Webhook reconciliation failed");
            metrics::counter!("webhooks_processed_total", "status" => "error").increment(1);

            match e {
                SubscriptionError::WebhookRejected(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }
}
