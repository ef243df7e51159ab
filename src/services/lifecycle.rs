use {
    crate::domain::error::AppError,
    crate::domain::gateway::{OrderRequest, PaymentGateway},
    crate::domain::ids::{CaptureId, OrderId},
    crate::domain::money::UsdAmount,
    crate::domain::record::{
        CaptureFields, DonationDetails, DonationType, NewTransaction, PaymentStatus,
        TicketDetails, TransactionKind, TransactionRecord,
    },
    crate::domain::store::RecordStore,
    chrono::Utc,
    std::sync::Arc,
    uuid::Uuid,
};

/// Result of `initiate`: the pending record plus the processor URL the
/// client must be redirected to.
#[derive(Debug, Clone)]
pub struct Initiated {
    pub record: TransactionRecord,
    pub approval_url: String,
}

/// Result of `finalize`.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// This call performed the capture.
    Completed(TransactionRecord),
    /// The record was already completed (duplicate capture or a webhook
    /// got there first); no gateway call was made.
    AlreadyCompleted(TransactionRecord),
    /// The processor declined the capture; the record is now failed.
    Declined {
        record: TransactionRecord,
        raw_status: String,
    },
}

impl FinalizeOutcome {
    pub fn record(&self) -> &TransactionRecord {
        match self {
            Self::Completed(r) | Self::AlreadyCompleted(r) => r,
            Self::Declined { record, .. } => record,
        }
    }
}

/// Result of a webhook-driven transition. The ingress logs these; none of
/// them is an error from the processor's point of view.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Applied(TransactionRecord),
    /// Record exists but the transition had already happened (duplicate
    /// delivery or lost race) — idempotent no-op.
    AlreadyApplied(Uuid),
    /// No record matches the event's ids. Logged for operational
    /// follow-up; never surfaced to the processor.
    Unmatched,
}

/// Capture data carried by a PAYMENT.CAPTURE.COMPLETED notification.
#[derive(Debug, Clone)]
pub struct CaptureNotification {
    pub transaction_id: CaptureId,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
}

/// Drives every status transition a `TransactionRecord` can make. Handlers
/// and the webhook ingress never touch the store's mutating operations
/// directly.
pub struct LifecycleController {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    frontend_base_url: String,
    org_name: String,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        frontend_base_url: impl Into<String>,
        org_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            frontend_base_url: frontend_base_url.into(),
            org_name: org_name.into(),
        }
    }

    pub async fn initiate_donation(
        &self,
        amount: UsdAmount,
        details: DonationDetails,
    ) -> Result<Initiated, AppError> {
        let details = details.redact_if_anonymous();
        let mut description = format!("Donation to {}", self.org_name);
        if details.donation_type != DonationType::default() {
            description.push_str(&format!(" ({})", details.donation_type.as_str()));
        }
        let new = NewTransaction {
            kind: TransactionKind::Donation,
            amount,
            metadata: serde_json::to_value(&details)?,
        };
        self.initiate(new, description).await
    }

    pub async fn initiate_ticket_purchase(
        &self,
        amount: UsdAmount,
        details: TicketDetails,
    ) -> Result<Initiated, AppError> {
        let description = format!(
            "{} ticket(s) for {}",
            details.quantity, details.event_title
        );
        let new = NewTransaction {
            kind: TransactionKind::TicketPurchase,
            amount,
            metadata: serde_json::to_value(&details)?,
        };
        self.initiate(new, description).await
    }

    /// Create a pending record, create the processor order, persist the
    /// order id. If order creation fails the record is deleted again
    /// (compensating delete) and the gateway error is surfaced.
    pub async fn initiate(
        &self,
        new: NewTransaction,
        description: String,
    ) -> Result<Initiated, AppError> {
        let record = self.store.create_pending(new).await?;
        let (return_url, cancel_url) = self.redirect_urls(record.kind, record.id);

        let request = OrderRequest {
            amount: record.amount,
            description,
            return_url,
            cancel_url,
            custom_id: format!("{}-{}", record.kind.custom_id_prefix(), record.id),
        };

        match self.gateway.create_order(&request).await {
            Ok(created) => {
                let record = self.store.set_order_id(record.id, &created.order_id).await?;
                tracing::info!(
                    record_id = %record.id,
                    kind = %record.kind,
                    order_id = %created.order_id,
                    amount = %record.amount,
                    "order created, awaiting approval"
                );
                Ok(Initiated {
                    record,
                    approval_url: created.approval_url,
                })
            }
            Err(err) => {
                if let Err(del_err) = self.store.delete(record.id).await {
                    tracing::error!(
                        record_id = %record.id,
                        error = %del_err,
                        "compensating delete failed, orphan pending record left behind"
                    );
                }
                Err(err)
            }
        }
    }

    /// Capture an approved order. Safe to call more than once: a record
    /// that is already completed is returned as-is without a second
    /// gateway capture. A gateway transport error leaves the record
    /// pending and retryable.
    pub async fn finalize(
        &self,
        order_id: &OrderId,
        expected_kind: TransactionKind,
    ) -> Result<FinalizeOutcome, AppError> {
        let record = self
            .store
            .find_by_order_id(order_id)
            .await?
            .filter(|r| r.kind == expected_kind)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no {} found for order {order_id}",
                    expected_kind.as_str()
                ))
            })?;

        match record.status {
            PaymentStatus::Completed => Ok(FinalizeOutcome::AlreadyCompleted(record)),
            PaymentStatus::Failed | PaymentStatus::Refunded => Err(AppError::Conflict(format!(
                "order {order_id} is {} and cannot be captured",
                record.status
            ))),
            PaymentStatus::Pending => self.capture_pending(record, order_id).await,
        }
    }

    async fn capture_pending(
        &self,
        record: TransactionRecord,
        order_id: &OrderId,
    ) -> Result<FinalizeOutcome, AppError> {
        // Transport errors propagate here with the record untouched: a
        // failed call is not a denial, and the record stays pending for a
        // later webhook delivery or client retry.
        let outcome = self.gateway.capture_order(order_id).await?;

        if outcome.completed {
            let transaction_id = outcome.transaction_id.ok_or_else(|| {
                AppError::Gateway(format!(
                    "capture of {order_id} reported completed without a capture id"
                ))
            })?;
            let fields = CaptureFields {
                transaction_id,
                payer_email: outcome.payer_email,
                payer_id: outcome.payer_id,
                completed_at: Utc::now(),
            };
            match self.store.complete_if_pending(record.id, &fields).await? {
                Some(updated) => {
                    tracing::info!(
                        record_id = %updated.id,
                        kind = %updated.kind,
                        order_id = %order_id,
                        transaction_id = ?updated.external_transaction_id,
                        "payment captured"
                    );
                    Ok(FinalizeOutcome::Completed(updated))
                }
                // Lost the race against the webhook path; report whatever
                // the winner wrote.
                None => self.reread_after_race(record.id, order_id).await,
            }
        } else {
            match self.store.fail_if_pending(record.id).await? {
                Some(updated) => {
                    tracing::warn!(
                        record_id = %updated.id,
                        order_id = %order_id,
                        status = %outcome.raw_status,
                        "capture not completed, payment failed"
                    );
                    Ok(FinalizeOutcome::Declined {
                        record: updated,
                        raw_status: outcome.raw_status,
                    })
                }
                None => self.reread_after_race(record.id, order_id).await,
            }
        }
    }

    async fn reread_after_race(
        &self,
        id: Uuid,
        order_id: &OrderId,
    ) -> Result<FinalizeOutcome, AppError> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record for order {order_id} vanished")))?;
        match current.status {
            PaymentStatus::Completed => Ok(FinalizeOutcome::AlreadyCompleted(current)),
            status => Err(AppError::Conflict(format!(
                "order {order_id} moved to {status} concurrently"
            ))),
        }
    }

    /// Webhook path for PAYMENT.CAPTURE.COMPLETED. The event already
    /// carries the capture outcome, so no gateway call is made.
    pub async fn record_capture_completed(
        &self,
        order_id: &OrderId,
        note: CaptureNotification,
    ) -> Result<WebhookOutcome, AppError> {
        let Some(record) = self.store.find_by_order_id(order_id).await? else {
            return Ok(WebhookOutcome::Unmatched);
        };
        if record.status != PaymentStatus::Pending {
            tracing::info!(
                record_id = %record.id,
                status = %record.status,
                "capture notification for non-pending record, ignoring"
            );
            return Ok(WebhookOutcome::AlreadyApplied(record.id));
        }
        let fields = CaptureFields {
            transaction_id: note.transaction_id,
            payer_email: note.payer_email,
            payer_id: note.payer_id,
            completed_at: Utc::now(),
        };
        match self.store.complete_if_pending(record.id, &fields).await? {
            Some(updated) => {
                tracing::info!(
                    record_id = %updated.id,
                    order_id = %order_id,
                    "payment completed via webhook"
                );
                Ok(WebhookOutcome::Applied(updated))
            }
            None => Ok(WebhookOutcome::AlreadyApplied(record.id)),
        }
    }

    /// Webhook path for PAYMENT.CAPTURE.DENIED / DECLINED.
    pub async fn mark_denied(&self, order_id: &OrderId) -> Result<WebhookOutcome, AppError> {
        let Some(record) = self.store.find_by_order_id(order_id).await? else {
            return Ok(WebhookOutcome::Unmatched);
        };
        if record.status != PaymentStatus::Pending {
            tracing::info!(
                record_id = %record.id,
                status = %record.status,
                "denial for non-pending record, ignoring"
            );
            return Ok(WebhookOutcome::AlreadyApplied(record.id));
        }
        match self.store.fail_if_pending(record.id).await? {
            Some(updated) => {
                tracing::warn!(record_id = %updated.id, order_id = %order_id, "payment denied");
                Ok(WebhookOutcome::Applied(updated))
            }
            None => Ok(WebhookOutcome::AlreadyApplied(record.id)),
        }
    }

    /// Webhook path for PAYMENT.CAPTURE.REFUNDED. Only `completed`
    /// records can be refunded; the capture id stays on the record as
    /// history.
    pub async fn mark_refunded(&self, capture_id: &CaptureId) -> Result<WebhookOutcome, AppError> {
        let Some(record) = self.store.find_by_capture_id(capture_id).await? else {
            return Ok(WebhookOutcome::Unmatched);
        };
        match record.status {
            PaymentStatus::Refunded => Ok(WebhookOutcome::AlreadyApplied(record.id)),
            PaymentStatus::Completed => {
                match self.store.refund_if_completed(record.id).await? {
                    Some(updated) => {
                        tracing::info!(
                            record_id = %updated.id,
                            capture_id = %capture_id,
                            "payment refunded"
                        );
                        Ok(WebhookOutcome::Applied(updated))
                    }
                    None => Ok(WebhookOutcome::AlreadyApplied(record.id)),
                }
            }
            status => Err(AppError::Conflict(format!(
                "refund for capture {capture_id} rejected: record is {status}, not completed"
            ))),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<TransactionRecord, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))
    }

    /// Sum of completed amounts for a kind, in cents.
    pub async fn completed_total(&self, kind: TransactionKind) -> Result<i64, AppError> {
        self.store.completed_total(kind).await
    }

    fn redirect_urls(&self, kind: TransactionKind, id: Uuid) -> (String, String) {
        let base = self.frontend_base_url.trim_end_matches('/');
        match kind {
            TransactionKind::Donation => (
                format!("{base}/donation/success?donationId={id}"),
                format!("{base}/donation/cancel?donationId={id}"),
            ),
            TransactionKind::TicketPurchase => (
                format!("{base}/tickets/success?ticketId={id}"),
                format!("{base}/tickets/cancel?ticketId={id}"),
            ),
        }
    }
}
