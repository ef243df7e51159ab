mod common;

use common::*;
use seeds_api::domain::error::AppError;
use seeds_api::domain::ids::{CaptureId, OrderId};
use seeds_api::domain::record::{PaymentStatus, TransactionKind};
use seeds_api::domain::store::RecordStore;
use seeds_api::services::lifecycle::{CaptureNotification, FinalizeOutcome, WebhookOutcome};

// ── 1. initiate creates a pending record with an order id ──────────────────

#[tokio::test]
async fn initiate_creates_pending_record_with_order_id() {
    let ctx = context();

    let initiated = ctx
        .controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    assert_eq!(initiated.record.status, PaymentStatus::Pending);
    assert!(initiated.record.external_order_id.is_some());
    assert!(initiated.record.external_transaction_id.is_none());
    assert_eq!(initiated.record.amount.to_string(), "25.00");
    assert!(initiated.approval_url.starts_with("https://paypal.test/approve/"));
}

// ── 2. failed order creation leaves nothing behind ─────────────────────────

#[tokio::test]
async fn create_order_failure_deletes_pending_record() {
    let ctx = context();
    ctx.gateway.fail_create_order();

    let result = ctx
        .controller
        .initiate_donation(usd("10.00"), donation_details("Ada", false))
        .await;

    assert!(matches!(result, Err(AppError::Gateway(_))));
    assert_eq!(ctx.store.record_count(), 0, "compensating delete ran");
}

// ── 3. the 25.00 / ORDER1 / TXN1 scenario ──────────────────────────────────

#[tokio::test]
async fn capture_completes_pending_record() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.gateway.script_capture(CaptureScript::Completed {
        transaction_id: "TXN1",
        payer_email: Some("payer@example.com"),
        payer_id: Some("PAYER1"),
    });

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let outcome = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();

    let FinalizeOutcome::Completed(record) = outcome else {
        panic!("expected Completed");
    };
    assert_eq!(record.status, PaymentStatus::Completed);
    assert_eq!(record.amount.to_string(), "25.00");
    assert_eq!(
        record.external_transaction_id.as_ref().map(|t| t.as_str()),
        Some("TXN1")
    );
    assert_eq!(record.payer_email.as_deref(), Some("payer@example.com"));
    assert!(record.completed_at.is_some());
}

// ── 4. double finalize is idempotent and skips the second capture ──────────

#[tokio::test]
async fn second_finalize_returns_same_record_without_second_capture() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let first = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();
    let second = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();

    assert!(matches!(&first, FinalizeOutcome::Completed(_)));
    let FinalizeOutcome::AlreadyCompleted(record) = second else {
        panic!("expected AlreadyCompleted");
    };
    assert_eq!(record.id, first.record().id);
    assert_eq!(record.amount, first.record().amount);
    assert_eq!(
        record.external_transaction_id,
        first.record().external_transaction_id
    );
    assert_eq!(ctx.gateway.capture_call_count(), 1, "one capture only");
}

// ── 5. finalize on an unknown order id ─────────────────────────────────────

#[tokio::test]
async fn finalize_unknown_order_is_not_found() {
    let ctx = context();
    let order_id = OrderId::new("NOSUCHORDER").unwrap();

    let result = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(ctx.gateway.capture_call_count(), 0);
}

// ── 6. kind mismatch is treated as not found ───────────────────────────────

#[tokio::test]
async fn finalize_with_wrong_kind_is_not_found() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let result = ctx
        .controller
        .finalize(&order_id, TransactionKind::TicketPurchase)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ── 7. transport error during capture leaves the record pending ────────────

#[tokio::test]
async fn capture_outage_keeps_record_pending_and_retryable() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.gateway.script_capture(CaptureScript::TransportError);

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let result = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await;
    assert!(matches!(result, Err(AppError::Gateway(_))));

    let record = ctx
        .store
        .find_by_order_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending, "no mutation on outage");

    // A retry after the outage still succeeds.
    ctx.gateway.script_capture(CaptureScript::Completed {
        transaction_id: "TXN1",
        payer_email: None,
        payer_id: None,
    });
    let outcome = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();
    assert!(matches!(outcome, FinalizeOutcome::Completed(_)));
}

// ── 8. processor denial marks the record failed ────────────────────────────

#[tokio::test]
async fn declined_capture_marks_record_failed() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");
    ctx.gateway.script_capture(CaptureScript::Declined {
        raw_status: "DECLINED",
    });

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let outcome = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();

    let FinalizeOutcome::Declined { record, raw_status } = outcome else {
        panic!("expected Declined");
    };
    assert_eq!(record.status, PaymentStatus::Failed);
    assert_eq!(raw_status, "DECLINED");

    // Failed is terminal — a later capture attempt is a conflict, not a
    // resurrection.
    let retry = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await;
    assert!(matches!(retry, Err(AppError::Conflict(_))));
}

// ── 9. webhook denial then client capture ──────────────────────────────────

#[tokio::test]
async fn webhook_denial_then_client_capture_conflicts() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let outcome = ctx.controller.mark_denied(&order_id).await.unwrap();
    let WebhookOutcome::Applied(record) = outcome else {
        panic!("expected Applied");
    };
    assert_eq!(record.status, PaymentStatus::Failed);

    let retry = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await;
    assert!(matches!(retry, Err(AppError::Conflict(_))));
    assert_eq!(ctx.gateway.capture_call_count(), 0);
}

// ── 10. webhook capture-completed races the client capture ─────────────────

#[tokio::test]
async fn webhook_completion_makes_client_capture_a_noop() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    let order_id = OrderId::new("ORDER1").unwrap();
    let note = CaptureNotification {
        transaction_id: CaptureId::new("TXN1").unwrap(),
        payer_email: Some("payer@example.com".into()),
        payer_id: Some("PAYER1".into()),
    };
    let outcome = ctx
        .controller
        .record_capture_completed(&order_id, note.clone())
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Applied(_)));

    // Duplicate delivery is a no-op.
    let again = ctx
        .controller
        .record_capture_completed(&order_id, note)
        .await
        .unwrap();
    assert!(matches!(again, WebhookOutcome::AlreadyApplied(_)));

    // Client capture after the webhook: idempotent success, no gateway
    // capture at all.
    let finalize = ctx
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();
    assert!(matches!(finalize, FinalizeOutcome::AlreadyCompleted(_)));
    assert_eq!(ctx.gateway.capture_call_count(), 0);
}

// ── 11. refunds ────────────────────────────────────────────────────────────

#[tokio::test]
async fn refund_applies_only_to_completed_records() {
    let ctx = context();
    ctx.gateway.set_next_order_id("ORDER1");

    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();

    // Never-completed record: the capture id matches nothing, so the
    // refund cannot touch it.
    let capture_id = CaptureId::new("TXN1").unwrap();
    let premature = ctx.controller.mark_refunded(&capture_id).await.unwrap();
    assert!(matches!(premature, WebhookOutcome::Unmatched));

    let order_id = OrderId::new("ORDER1").unwrap();
    let record = ctx
        .store
        .find_by_order_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending, "refund did not apply");

    ctx.controller
        .finalize(&order_id, TransactionKind::Donation)
        .await
        .unwrap();

    let refunded = ctx.controller.mark_refunded(&capture_id).await.unwrap();
    let WebhookOutcome::Applied(record) = refunded else {
        panic!("expected Applied");
    };
    assert_eq!(record.status, PaymentStatus::Refunded);
    // Capture id survives the refund as history.
    assert_eq!(
        record.external_transaction_id.as_ref().map(|t| t.as_str()),
        Some("TXN1")
    );

    // Duplicate refund delivery is a no-op.
    let again = ctx.controller.mark_refunded(&capture_id).await.unwrap();
    assert!(matches!(again, WebhookOutcome::AlreadyApplied(_)));
}

// ── 12. anonymous donations are redacted before persistence ────────────────

#[tokio::test]
async fn anonymous_donation_never_persists_a_name() {
    let ctx = context();

    let initiated = ctx
        .controller
        .initiate_donation(usd("5.00"), donation_details("Ada", true))
        .await
        .unwrap();

    assert!(initiated.record.metadata["name"].is_null());
    assert_eq!(initiated.record.metadata["isAnonymous"], true);
}

// ── 13. completed totals count only completed donations ────────────────────

#[tokio::test]
async fn completed_total_sums_only_completed_donations() {
    let ctx = context();

    ctx.gateway.set_next_order_id("ORDER1");
    ctx.controller
        .initiate_donation(usd("25.00"), donation_details("Ada", false))
        .await
        .unwrap();
    ctx.controller
        .finalize(&OrderId::new("ORDER1").unwrap(), TransactionKind::Donation)
        .await
        .unwrap();

    // Still pending — not counted.
    ctx.gateway.set_next_order_id("ORDER2");
    ctx.controller
        .initiate_donation(usd("40.00"), donation_details("Grace", false))
        .await
        .unwrap();

    let total = ctx
        .controller
        .completed_total(TransactionKind::Donation)
        .await
        .unwrap();
    assert_eq!(total, 2500);
}
