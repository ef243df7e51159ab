use {
    super::error::AppError,
    super::ids::{CaptureId, OrderId},
    super::intake::{ContactForm, ContactMessage, TicketOrder, TicketOrderForm},
    super::record::{CaptureFields, EventInfo, NewTransaction, TransactionKind, TransactionRecord},
    async_trait::async_trait,
    uuid::Uuid,
};

/// Persistence seam for the lifecycle controller. All operations are
/// single-record; the `*_if_*` methods are atomic conditional updates and
/// return `None` when the precondition no longer holds, which is how the
/// capture/webhook race is decided.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_pending(&self, new: NewTransaction) -> Result<TransactionRecord, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError>;

    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<TransactionRecord>, AppError>;

    async fn find_by_capture_id(
        &self,
        capture_id: &CaptureId,
    ) -> Result<Option<TransactionRecord>, AppError>;

    /// Assign the processor order id once order creation succeeds.
    async fn set_order_id(
        &self,
        id: Uuid,
        order_id: &OrderId,
    ) -> Result<TransactionRecord, AppError>;

    /// `pending → completed`, applying the gateway-sourced capture fields.
    async fn complete_if_pending(
        &self,
        id: Uuid,
        capture: &CaptureFields,
    ) -> Result<Option<TransactionRecord>, AppError>;

    /// `pending → failed`.
    async fn fail_if_pending(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError>;

    /// `completed → refunded`. The capture id is kept as history.
    async fn refund_if_completed(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError>;

    /// Compensating delete for records whose order creation failed. Not
    /// used anywhere else.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Sum of completed amounts for a kind, in cents.
    async fn completed_total(&self, kind: TransactionKind) -> Result<i64, AppError>;

    async fn find_event(&self, id: i64) -> Result<Option<EventInfo>, AppError>;

    async fn create_ticket_order(&self, form: TicketOrderForm) -> Result<TicketOrder, AppError>;

    async fn find_ticket_order(&self, id: Uuid) -> Result<Option<TicketOrder>, AppError>;

    async fn list_ticket_orders(&self) -> Result<Vec<TicketOrder>, AppError>;

    async fn create_contact_message(&self, form: ContactForm) -> Result<ContactMessage, AppError>;
}
