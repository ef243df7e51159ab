mod common;

use common::*;
use axum::http::StatusCode;
use seeds_api::domain::ids::OrderId;
use seeds_api::domain::record::PaymentStatus;
use seeds_api::domain::store::RecordStore;

fn capture_completed_event(order_id: &str, capture_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "WH-1",
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {
            "id": capture_id,
            "status": "COMPLETED",
            "supplementary_data": { "related_ids": { "order_id": order_id } },
            "payer": { "email_address": "payer@example.com", "payer_id": "PAYER1" },
        },
    })
}

// ── 1. unverifiable deliveries are rejected ────────────────────────────────

#[tokio::test]
async fn invalid_signature_is_rejected_with_401() {
    let ctx = context();
    ctx.gateway.reject_webhooks();
    let app = app(&ctx);

    let response = post_json(
        &app,
        "/api/paypal/webhook",
        capture_completed_event("ORDER1", "TXN1"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ── 2. capture-completed completes a pending record ────────────────────────

#[tokio::test]
async fn capture_completed_event_completes_pending_record() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();
    let app = app(&ctx);

    let response = post_json(
        &app,
        "/api/paypal/webhook",
        capture_completed_event("ORDER1", "TXN1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"received": true}));

    let record = ctx
        .store
        .find_by_order_id(&OrderId::new("ORDER1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert_eq!(
        record.external_transaction_id.as_ref().map(|t| t.as_str()),
        Some("TXN1")
    );
    assert_eq!(record.payer_email.as_deref(), Some("payer@example.com"));
    // The event carried the outcome; the gateway was never asked to
    // capture.
    assert_eq!(ctx.gateway.capture_call_count(), 0);
}

// ── 3. denial fails a pending record ───────────────────────────────────────

#[tokio::test]
async fn denied_event_fails_pending_record() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();
    let app = app(&ctx);

    let event = serde_json::json!({
        "id": "WH-2",
        "event_type": "PAYMENT.CAPTURE.DENIED",
        "resource": {
            "id": "TXN1",
            "supplementary_data": { "related_ids": { "order_id": "ORDER1" } },
        },
    });
    let response = post_json(&app, "/api/paypal/webhook", event).await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = ctx
        .store
        .find_by_order_id(&OrderId::new("ORDER1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Failed);
}

// ── 4. refund event moves a completed record to refunded ───────────────────

#[tokio::test]
async fn refunded_event_refunds_completed_record() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();
    let app = app(&ctx);

    post_json(
        &app,
        "/api/paypal/webhook",
        capture_completed_event("ORDER1", "TXN1"),
    )
    .await;

    // Refund resources carry the refund id; the capture is linked under
    // rel="up".
    let refund_event = serde_json::json!({
        "id": "WH-3",
        "event_type": "PAYMENT.CAPTURE.REFUNDED",
        "resource": {
            "id": "REFUND1",
            "links": [
                { "rel": "self", "href": "https://api.paypal.test/v2/payments/refunds/REFUND1" },
                { "rel": "up", "href": "https://api.paypal.test/v2/payments/captures/TXN1" },
            ],
        },
    });
    let response = post_json(&app, "/api/paypal/webhook", refund_event).await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = ctx
        .store
        .find_by_order_id(&OrderId::new("ORDER1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Refunded);
}

// ── 5. unmatched and unhandled events are acknowledged, not errors ─────────

#[tokio::test]
async fn unmatched_order_is_still_acknowledged() {
    let ctx = context();
    let app = app(&ctx);

    let response = post_json(
        &app,
        "/api/paypal/webhook",
        capture_completed_event("NOSUCHORDER", "TXN9"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"received": true}));
}

#[tokio::test]
async fn unhandled_event_type_is_acknowledged() {
    let ctx = context();
    let app = app(&ctx);

    let event = serde_json::json!({
        "id": "WH-4",
        "event_type": "BILLING.SUBSCRIPTION.CREATED",
        "resource": { "id": "SUB1" },
    });
    let response = post_json(&app, "/api/paypal/webhook", event).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.store.record_count(), 0);
}

#[tokio::test]
async fn event_without_resource_id_is_acknowledged() {
    let ctx = context();
    let app = app(&ctx);

    let event = serde_json::json!({
        "id": "WH-5",
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {},
    });
    let response = post_json(&app, "/api/paypal/webhook", event).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"received": true}));
}

// ── 6. event parsing ───────────────────────────────────────────────────────

#[test]
fn declined_is_parsed_like_denied() {
    use seeds_api::adapters::webhook::WebhookEvent;

    for event_type in ["PAYMENT.CAPTURE.DENIED", "PAYMENT.CAPTURE.DECLINED"] {
        let body = serde_json::json!({
            "event_type": event_type,
            "resource": {
                "id": "TXN1",
                "supplementary_data": { "related_ids": { "order_id": "ORDER1" } },
            },
        });
        let parsed = WebhookEvent::parse(&body).unwrap();
        assert_eq!(
            parsed,
            WebhookEvent::CaptureDenied {
                order_id: Some("ORDER1".into()),
                capture_id: "TXN1".into(),
            }
        );
    }
}

#[test]
fn refund_capture_id_comes_from_the_up_link() {
    use seeds_api::adapters::webhook::WebhookEvent;

    let body = serde_json::json!({
        "event_type": "PAYMENT.CAPTURE.REFUNDED",
        "resource": {
            "id": "REFUND1",
            "links": [
                { "rel": "up", "href": "https://api.paypal.test/v2/payments/captures/TXN1" },
            ],
        },
    });
    assert_eq!(
        WebhookEvent::parse(&body).unwrap(),
        WebhookEvent::CaptureRefunded {
            capture_id: Some("TXN1".into())
        }
    );

    // Without links, the resource id is the only candidate.
    let bare = serde_json::json!({
        "event_type": "PAYMENT.CAPTURE.REFUNDED",
        "resource": { "id": "REFUND1" },
    });
    assert_eq!(
        WebhookEvent::parse(&bare).unwrap(),
        WebhookEvent::CaptureRefunded {
            capture_id: Some("REFUND1".into())
        }
    );
}

#[test]
fn envelope_without_event_type_is_unparseable() {
    use seeds_api::adapters::webhook::WebhookEvent;

    assert!(WebhookEvent::parse(&serde_json::json!({ "resource": {} })).is_none());
    assert!(WebhookEvent::parse(&serde_json::json!({ "event_type": 42 })).is_none());
}

// ── 7. approval events are informational ───────────────────────────────────

#[tokio::test]
async fn order_approved_event_changes_nothing() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();
    let app = app(&ctx);

    let event = serde_json::json!({
        "id": "WH-6",
        "event_type": "CHECKOUT.ORDER.APPROVED",
        "resource": { "id": "ORDER1" },
    });
    let response = post_json(&app, "/api/paypal/webhook", event).await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = ctx
        .store
        .find_by_order_id(&OrderId::new("ORDER1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
}
