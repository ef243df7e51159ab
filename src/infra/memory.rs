use {
    crate::domain::{
        error::AppError,
        ids::{CaptureId, OrderId},
        intake::{ContactForm, ContactMessage, TicketOrder, TicketOrderForm},
        record::{
            CaptureFields, EventInfo, NewTransaction, PaymentStatus, TransactionKind,
            TransactionRecord,
        },
        store::RecordStore,
    },
    async_trait::async_trait,
    chrono::Utc,
    std::collections::HashMap,
    std::sync::{Mutex, MutexGuard},
    uuid::Uuid,
};

#[derive(Default)]
struct Inner {
    transactions: HashMap<Uuid, TransactionRecord>,
    events: HashMap<i64, EventInfo>,
    ticket_orders: Vec<TicketOrder>,
    contact_messages: Vec<ContactMessage>,
}

/// Mutex-guarded in-memory store. Backs the test suite and local
/// development; the mutex gives the conditional updates the same
/// atomicity the SQL `UPDATE ... WHERE status = ...` form has.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("record store mutex poisoned")
    }

    pub fn insert_event(&self, event: EventInfo) {
        self.lock().events.insert(event.id, event);
    }

    pub fn record_count(&self) -> usize {
        self.lock().transactions.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_pending(&self, new: NewTransaction) -> Result<TransactionRecord, AppError> {
        let record = TransactionRecord {
            id: Uuid::now_v7(),
            kind: new.kind,
            amount: new.amount,
            status: PaymentStatus::Pending,
            external_order_id: None,
            external_transaction_id: None,
            payer_email: None,
            payer_id: None,
            metadata: new.metadata,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.lock().transactions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        Ok(self.lock().transactions.get(&id).cloned())
    }

    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<TransactionRecord>, AppError> {
        Ok(self
            .lock()
            .transactions
            .values()
            .find(|r| r.external_order_id.as_ref() == Some(order_id))
            .cloned())
    }

    async fn find_by_capture_id(
        &self,
        capture_id: &CaptureId,
    ) -> Result<Option<TransactionRecord>, AppError> {
        Ok(self
            .lock()
            .transactions
            .values()
            .find(|r| r.external_transaction_id.as_ref() == Some(capture_id))
            .cloned())
    }

    async fn set_order_id(
        &self,
        id: Uuid,
        order_id: &OrderId,
    ) -> Result<TransactionRecord, AppError> {
        let mut inner = self.lock();
        if inner
            .transactions
            .values()
            .any(|r| r.id != id && r.external_order_id.as_ref() == Some(order_id))
        {
            return Err(AppError::Conflict(format!(
                "order id {order_id} already assigned"
            )));
        }
        let record = inner
            .transactions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))?;
        record.external_order_id = Some(order_id.clone());
        Ok(record.clone())
    }

    async fn complete_if_pending(
        &self,
        id: Uuid,
        capture: &CaptureFields,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let mut inner = self.lock();
        let Some(record) = inner.transactions.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != PaymentStatus::Pending {
            return Ok(None);
        }
        record.status = PaymentStatus::Completed;
        record.external_transaction_id = Some(capture.transaction_id.clone());
        record.payer_email = capture.payer_email.clone();
        record.payer_id = capture.payer_id.clone();
        record.completed_at = Some(capture.completed_at);
        Ok(Some(record.clone()))
    }

    async fn fail_if_pending(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let mut inner = self.lock();
        let Some(record) = inner.transactions.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != PaymentStatus::Pending {
            return Ok(None);
        }
        record.status = PaymentStatus::Failed;
        Ok(Some(record.clone()))
    }

    async fn refund_if_completed(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let mut inner = self.lock();
        let Some(record) = inner.transactions.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != PaymentStatus::Completed {
            return Ok(None);
        }
        // The capture id stays behind as history of the completed state.
        record.status = PaymentStatus::Refunded;
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.lock().transactions.remove(&id);
        Ok(())
    }

    async fn completed_total(&self, kind: TransactionKind) -> Result<i64, AppError> {
        Ok(self
            .lock()
            .transactions
            .values()
            .filter(|r| r.kind == kind && r.status == PaymentStatus::Completed)
            .map(|r| r.amount.cents())
            .sum())
    }

    async fn find_event(&self, id: i64) -> Result<Option<EventInfo>, AppError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn create_ticket_order(&self, form: TicketOrderForm) -> Result<TicketOrder, AppError> {
        let order = TicketOrder {
            id: Uuid::now_v7(),
            form,
            created_at: Utc::now(),
        };
        self.lock().ticket_orders.push(order.clone());
        Ok(order)
    }

    async fn find_ticket_order(&self, id: Uuid) -> Result<Option<TicketOrder>, AppError> {
        Ok(self
            .lock()
            .ticket_orders
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn list_ticket_orders(&self) -> Result<Vec<TicketOrder>, AppError> {
        let mut orders = self.lock().ticket_orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn create_contact_message(&self, form: ContactForm) -> Result<ContactMessage, AppError> {
        let message = ContactMessage {
            id: Uuid::now_v7(),
            form,
            created_at: Utc::now(),
        };
        self.lock().contact_messages.push(message.clone());
        Ok(message)
    }
}
