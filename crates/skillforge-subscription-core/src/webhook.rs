//! Stripe webhook verification and parsing
//!
//! The transport boundary in front of the reconciler: verifies the
//! `Stripe-Signature` header (HMAC-SHA256 over `timestamp.payload`,
//! constant-time compare, 5-minute freshness window) and lowers the
//! raw payload into a typed [`PaymentEvent`].
//!
//! Correlation back to a platform user relies on the `metadata`
//! object Stripe echoes from subscription creation (`user_id`,
//! `tier`). Events missing it still parse — attributing them is the
//! reconciler's decision, since delivery has no caller to report to.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use skillforge_types::{Tier, UserId};

use crate::error::SubscriptionError;

/// Webhook event kinds the engine understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// `customer.subscription.created`
    SubscriptionCreated,
    /// `customer.subscription.updated`
    SubscriptionUpdated,
    /// `customer.subscription.deleted`
    SubscriptionDeleted,
    /// `invoice.paid`
    PaymentSucceeded,
    /// `invoice.payment_failed`
    PaymentFailed,
    /// Anything else Stripe sends
    Unknown(String),
}

impl From<&str> for PaymentEventKind {
    fn from(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.paid" => Self::PaymentSucceeded,
            "invoice.payment_failed" => Self::PaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Verified, typed payment processor event
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// Processor event id (for log correlation)
    pub id: String,
    /// Event kind
    pub kind: PaymentEventKind,
    /// Platform user, from processor-side metadata
    pub user_id: Option<UserId>,
    /// Target tier, from processor-side metadata
    pub tier: Option<Tier>,
    /// Stripe customer reference
    pub stripe_customer_id: Option<String>,
    /// Stripe subscription reference
    pub stripe_subscription_id: Option<String>,
}

/// Verifies and parses raw Stripe webhook deliveries
#[derive(Clone)]
pub struct WebhookVerifier {
    webhook_secret: String,
}

impl WebhookVerifier {
    /// Create a verifier with the endpoint's signing secret
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the signature header and parse the payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, SubscriptionError> {
        self.verify_signature(payload, signature)?;

        let raw: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| SubscriptionError::WebhookRejected(format!("unparseable payload: {e}")))?;

        debug!(event_id = %raw.id, event_type = %raw.event_type, "Parsed webhook event");

        let kind = PaymentEventKind::from(raw.event_type.as_str());
        Ok(Self::lower_event(raw.id, kind, raw.data.object))
    }

    /// Verify the Stripe `t=timestamp,v1=signature` header
    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), SubscriptionError> {
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            SubscriptionError::WebhookRejected("missing timestamp".to_string())
        })?;
        let sig_v1 = sig_v1.ok_or_else(|| {
            warn!("Missing v1 signature in webhook signature");
            SubscriptionError::WebhookRejected("missing signature".to_string())
        })?;

        let payload_str = std::str::from_utf8(payload).map_err(|_| {
            SubscriptionError::WebhookRejected("invalid payload encoding".to_string())
        })?;
        let signed_payload = format!("{timestamp}.{payload_str}");

        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| SubscriptionError::WebhookRejected("hmac init failed".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            warn!("Webhook signature verification failed");
            return Err(SubscriptionError::WebhookRejected(
                "signature verification failed".to_string(),
            ));
        }

        // Freshness window guards against replay
        let ts: i64 = timestamp.parse().map_err(|_| {
            SubscriptionError::WebhookRejected("invalid timestamp format".to_string())
        })?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            warn!(timestamp = ts, now, "Webhook timestamp outside freshness window");
            return Err(SubscriptionError::WebhookRejected(
                "timestamp too old".to_string(),
            ));
        }

        Ok(())
    }

    /// Lower the raw event object into a typed event. Correlation
    /// fields stay optional here; malformed metadata is for the
    /// reconciler to drop, not a parse failure.
    fn lower_event(id: String, kind: PaymentEventKind, object: serde_json::Value) -> PaymentEvent {
        let obj: RawEventObject = serde_json::from_value(object).unwrap_or_default();

        let user_id = obj
            .metadata
            .as_ref()
            .and_then(|m| m.user_id.as_deref())
            .and_then(|s| UserId::parse(s).ok());
        let tier = obj
            .metadata
            .as_ref()
            .and_then(|m| m.tier.as_deref())
            .and_then(|s| s.parse::<Tier>().ok());

        PaymentEvent {
            id,
            kind,
            user_id,
            tier,
            stripe_customer_id: obj.customer,
            stripe_subscription_id: obj.id,
        }
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Stripe wire shapes, kept private to this module

#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawEventObject {
    id: Option<String>,
    customer: Option<String>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    user_id: Option<String>,
    tier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(payload: &[u8], secret: &str, ts: i64) -> String {
        let signed_payload = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
    }

    fn event_payload(event_type: &str, metadata: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_test_1",
            "type": event_type,
            "created": Utc::now().timestamp(),
            "data": { "object": {
                "id": "sub_test_1",
                "customer": "cus_test_1",
                "metadata": metadata,
            }}
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = WebhookVerifier::new("whsec_test");
        let user_id = UserId::new();
        let payload = event_payload(
            "customer.subscription.created",
            serde_json::json!({ "user_id": user_id.to_string(), "tier": "premium" }),
        );
        let sig = signed(&payload, "whsec_test", Utc::now().timestamp());

        let event = verifier.verify_and_parse(&payload, &sig).unwrap();
        assert_eq!(event.kind, PaymentEventKind::SubscriptionCreated);
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.tier, Some(Tier::Premium));
        assert_eq!(event.stripe_subscription_id.as_deref(), Some("sub_test_1"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = WebhookVerifier::new("whsec_real");
        let payload = event_payload("invoice.paid", serde_json::json!({}));
        let sig = signed(&payload, "whsec_other", Utc::now().timestamp());

        assert!(matches!(
            verifier.verify_and_parse(&payload, &sig),
            Err(SubscriptionError::WebhookRejected(_))
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        let payload = event_payload("invoice.paid", serde_json::json!({}));
        let sig = signed(&payload, "whsec_test", Utc::now().timestamp() - 600);

        assert!(matches!(
            verifier.verify_and_parse(&payload, &sig),
            Err(SubscriptionError::WebhookRejected(_))
        ));
    }

    #[test]
    fn test_missing_metadata_still_parses() {
        let verifier = WebhookVerifier::new("whsec_test");
        let payload = event_payload("customer.subscription.deleted", serde_json::json!({}));
        let sig = signed(&payload, "whsec_test", Utc::now().timestamp());

        let event = verifier.verify_and_parse(&payload, &sig).unwrap();
        assert_eq!(event.kind, PaymentEventKind::SubscriptionDeleted);
        assert_eq!(event.user_id, None);
        assert_eq!(event.tier, None);
    }

    #[test]
    fn test_unknown_event_kind() {
        assert_eq!(
            PaymentEventKind::from("charge.refunded"),
            PaymentEventKind::Unknown("charge.refunded".to_string())
        );
    }
}
