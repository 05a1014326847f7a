//! Webhook security tests
//!
//! Stripe signature verification as exercised by the webhook route:
//! header format, replay window, and tamper detection.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use skillforge_subscription_core::{PaymentEventKind, SubscriptionError, WebhookVerifier};

/// Generate a valid Stripe webhook signature for testing
fn generate_stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    format!("t={},v1={}", timestamp, signature)
}

/// Generate a webhook payload for testing
fn test_webhook_payload(event_type: &str) -> Vec<u8> {
    let payload = serde_json::json!({
        "id": "evt_test_123",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "sub_test_123",
                "customer": "cus_test_123",
                "status": "active",
                "metadata": {
                    "user_id": "7f1b38c2-14f6-4be1-a8f3-0d55a2f3a111",
                    "tier": "premium"
                }
            }
        }
    });
    serde_json::to_vec(&payload).unwrap()
}

#[test]
fn test_valid_signature_accepted() {
    let secret = "whsec_test_secret_key";
    let verifier = WebhookVerifier::new(secret);
    let payload = test_webhook_payload("customer.subscription.created");

    let signature = generate_stripe_signature(&payload, secret, Utc::now().timestamp());

    let event = verifier.verify_and_parse(&payload, &signature).unwrap();
    assert_eq!(event.kind, PaymentEventKind::SubscriptionCreated);
    assert_eq!(event.stripe_customer_id.as_deref(), Some("cus_test_123"));
    assert!(event.user_id.is_some());
}

#[test]
fn test_tampered_payload_rejected() {
    let secret = "whsec_test_secret_key";
    let verifier = WebhookVerifier::new(secret);
    let payload = test_webhook_payload("customer.subscription.created");

    let signature = generate_stripe_signature(&payload, secret, Utc::now().timestamp());

    // Flip the event type after signing
    let tampered = String::from_utf8(payload).unwrap().replace(
        "customer.subscription.created",
        "customer.subscription.deleted",
    );

    assert!(matches!(
        verifier.verify_and_parse(tampered.as_bytes(), &signature),
        Err(SubscriptionError::WebhookRejected(_))
    ));
}

#[test]
fn test_wrong_secret_rejected() {
    let verifier = WebhookVerifier::new("whsec_real_secret");
    let payload = test_webhook_payload("invoice.paid");

    let signature =
        generate_stripe_signature(&payload, "whsec_attacker_guess", Utc::now().timestamp());

    assert!(matches!(
        verifier.verify_and_parse(&payload, &signature),
        Err(SubscriptionError::WebhookRejected(_))
    ));
}

#[test]
fn test_replay_attack_prevention() {
    let secret = "whsec_test_secret";
    let verifier = WebhookVerifier::new(secret);
    let payload = test_webhook_payload("invoice.paid");

    // Signature captured 10 minutes ago, replayed now
    let old_timestamp = Utc::now().timestamp() - 600;
    let old_signature = generate_stripe_signature(&payload, secret, old_timestamp);

    assert!(matches!(
        verifier.verify_and_parse(&payload, &old_signature),
        Err(SubscriptionError::WebhookRejected(_))
    ));

    // Future-dated timestamps are just as invalid
    let future_signature =
        generate_stripe_signature(&payload, secret, Utc::now().timestamp() + 600);
    assert!(matches!(
        verifier.verify_and_parse(&payload, &future_signature),
        Err(SubscriptionError::WebhookRejected(_))
    ));
}

#[test]
fn test_malformed_signature_rejection() {
    let secret = "whsec_test_secret";
    let verifier = WebhookVerifier::new(secret);
    let payload = test_webhook_payload("invoice.paid");

    let malformed = [
        "v1=abc123",                   // missing timestamp
        "t=1234567890",                // missing signature
        "",                            // empty
        "invalid_format",              // no key=value pairs at all
        "t=not_a_number,v1=abc123",    // unparseable timestamp
    ];

    for sig in malformed {
        assert!(
            matches!(
                verifier.verify_and_parse(&payload, sig),
                Err(SubscriptionError::WebhookRejected(_))
            ),
            "signature {sig:?} should be rejected"
        );
    }
}

#[test]
fn test_webhook_event_types() {
    let cases = [
        ("customer.subscription.created", PaymentEventKind::SubscriptionCreated),
        ("customer.subscription.updated", PaymentEventKind::SubscriptionUpdated),
        ("customer.subscription.deleted", PaymentEventKind::SubscriptionDeleted),
        ("invoice.paid", PaymentEventKind::PaymentSucceeded),
        ("invoice.payment_failed", PaymentEventKind::PaymentFailed),
    ];

    let secret = "whsec_test_secret";
    let verifier = WebhookVerifier::new(secret);

    for (event_type, expected) in cases {
        let payload = test_webhook_payload(event_type);
        let signature = generate_stripe_signature(&payload, secret, Utc::now().timestamp());
        let event = verifier.verify_and_parse(&payload, &signature).unwrap();
        assert_eq!(event.kind, expected);
    }
}

#[test]
fn test_unparseable_payload_rejected_after_verification() {
    let secret = "whsec_test_secret";
    let verifier = WebhookVerifier::new(secret);
    let payload = b"not json at all";

    let signature = generate_stripe_signature(payload, secret, Utc::now().timestamp());

    assert!(matches!(
        verifier.verify_and_parse(payload, &signature),
        Err(SubscriptionError::WebhookRejected(_))
    ));
}
