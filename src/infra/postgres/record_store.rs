use {
    crate::domain::{
        error::AppError,
        ids::{CaptureId, OrderId},
        intake::{
            CommunicationChannel, ContactForm, ContactMessage, TicketOrder, TicketOrderForm,
        },
        money::UsdAmount,
        record::{
            CaptureFields, EventInfo, NewTransaction, PaymentStatus, TransactionKind,
            TransactionRecord,
        },
        store::RecordStore,
    },
    async_trait::async_trait,
    chrono::{DateTime, NaiveDate, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

const TX_COLUMNS: &str = "id, kind, amount_cents, status, external_order_id, \
     external_transaction_id, payer_email, payer_id, metadata, created_at, completed_at";

#[derive(sqlx::FromRow)]
struct TxRow {
    id: Uuid,
    kind: String,
    amount_cents: i64,
    status: String,
    external_order_id: Option<String>,
    external_transaction_id: Option<String>,
    payer_email: Option<String>,
    payer_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TxRow {
    fn into_record(self) -> Result<TransactionRecord, AppError> {
        Ok(TransactionRecord {
            id: self.id,
            kind: TransactionKind::try_from(self.kind.as_str())?,
            amount: UsdAmount::from_cents(self.amount_cents)?,
            status: PaymentStatus::try_from(self.status.as_str())?,
            external_order_id: self.external_order_id.map(OrderId::new).transpose()?,
            external_transaction_id: self
                .external_transaction_id
                .map(CaptureId::new)
                .transpose()?,
            payer_email: self.payer_email,
            payer_id: self.payer_id,
            metadata: self.metadata,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketOrderRow {
    id: Uuid,
    name: String,
    email: String,
    birthdate: NaiveDate,
    mailing_address: String,
    mailing_city: String,
    mailing_state: String,
    mailing_zip_code: String,
    phone_number: String,
    text_number: Option<String>,
    preferred_communication: String,
    is_group_order: bool,
    group_members: serde_json::Value,
    needs_airport_transportation: bool,
    wants_catered_dinner: bool,
    protein_requests: Option<String>,
    food_allergies: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

const TICKET_ORDER_COLUMNS: &str = "id, name, email, birthdate, mailing_address, mailing_city, \
     mailing_state, mailing_zip_code, phone_number, text_number, preferred_communication, \
     is_group_order, group_members, needs_airport_transportation, wants_catered_dinner, \
     protein_requests, food_allergies, notes, created_at";

impl TicketOrderRow {
    fn into_order(self) -> Result<TicketOrder, AppError> {
        Ok(TicketOrder {
            id: self.id,
            form: TicketOrderForm {
                name: self.name,
                email: self.email,
                birthdate: self.birthdate,
                mailing_address: self.mailing_address,
                mailing_city: self.mailing_city,
                mailing_state: self.mailing_state,
                mailing_zip_code: self.mailing_zip_code,
                phone_number: self.phone_number,
                text_number: self.text_number,
                preferred_communication: CommunicationChannel::try_from(
                    self.preferred_communication.as_str(),
                )?,
                is_group_order: self.is_group_order,
                group_members: serde_json::from_value(self.group_members)?,
                needs_airport_transportation: self.needs_airport_transportation,
                wants_catered_dinner: self.wants_catered_dinner,
                protein_requests: self.protein_requests,
                food_allergies: self.food_allergies,
                notes: self.notes,
            },
            created_at: self.created_at,
        })
    }
}

/// `RecordStore` over Postgres. The conditional updates rely on the
/// `UPDATE ... WHERE status = ...` form being atomic per row, so no
/// explicit locking is needed for the capture/webhook race.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_pending(&self, new: NewTransaction) -> Result<TransactionRecord, AppError> {
        let query = format!(
            "INSERT INTO transactions (id, kind, amount_cents, status, metadata) \
             VALUES ($1, $2, $3, 'pending', $4) RETURNING {TX_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TxRow>(&query)
            .bind(Uuid::now_v7())
            .bind(new.kind.as_str())
            .bind(new.amount.cents())
            .bind(&new.metadata)
            .fetch_one(&self.pool)
            .await?;
        row.into_record()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let query = format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = $1");
        sqlx::query_as::<_, TxRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let query =
            format!("SELECT {TX_COLUMNS} FROM transactions WHERE external_order_id = $1");
        sqlx::query_as::<_, TxRow>(&query)
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn find_by_capture_id(
        &self,
        capture_id: &CaptureId,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let query =
            format!("SELECT {TX_COLUMNS} FROM transactions WHERE external_transaction_id = $1");
        sqlx::query_as::<_, TxRow>(&query)
            .bind(capture_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn set_order_id(
        &self,
        id: Uuid,
        order_id: &OrderId,
    ) -> Result<TransactionRecord, AppError> {
        let query = format!(
            "UPDATE transactions SET external_order_id = $2, updated_at = now() \
             WHERE id = $1 RETURNING {TX_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TxRow>(&query)
            .bind(id)
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))?;
        row.into_record()
    }

    async fn complete_if_pending(
        &self,
        id: Uuid,
        capture: &CaptureFields,
    ) -> Result<Option<TransactionRecord>, AppError> {
        let query = format!(
            "UPDATE transactions SET status = 'completed', external_transaction_id = $2, \
             payer_email = $3, payer_id = $4, completed_at = $5, updated_at = now() \
             WHERE id = $1 AND status = 'pending' RETURNING {TX_COLUMNS}"
        );
        sqlx::query_as::<_, TxRow>(&query)
            .bind(id)
            .bind(capture.transaction_id.as_str())
            .bind(&capture.payer_email)
            .bind(&capture.payer_id)
            .bind(capture.completed_at)
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn fail_if_pending(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let query = format!(
            "UPDATE transactions SET status = 'failed', updated_at = now() \
             WHERE id = $1 AND status = 'pending' RETURNING {TX_COLUMNS}"
        );
        sqlx::query_as::<_, TxRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn refund_if_completed(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let query = format!(
            "UPDATE transactions SET status = 'refunded', updated_at = now() \
             WHERE id = $1 AND status = 'completed' RETURNING {TX_COLUMNS}"
        );
        sqlx::query_as::<_, TxRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TxRow::into_record)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn completed_total(&self, kind: TransactionKind) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM transactions \
             WHERE kind = $1 AND status = 'completed'",
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn find_event(&self, id: i64) -> Result<Option<EventInfo>, AppError> {
        let row = sqlx::query_as::<_, (i64, String, Option<i64>, bool)>(
            "SELECT id, title, ticket_price_cents, is_active FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, title, price_cents, is_active)| EventInfo {
            id,
            title,
            ticket_price: price_cents.and_then(|c| UsdAmount::from_cents(c).ok()),
            is_active,
        }))
    }

    async fn create_ticket_order(&self, form: TicketOrderForm) -> Result<TicketOrder, AppError> {
        let query = format!(
            "INSERT INTO ticket_orders (id, name, email, birthdate, mailing_address, \
             mailing_city, mailing_state, mailing_zip_code, phone_number, text_number, \
             preferred_communication, is_group_order, group_members, \
             needs_airport_transportation, wants_catered_dinner, protein_requests, \
             food_allergies, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18) RETURNING {TICKET_ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TicketOrderRow>(&query)
            .bind(Uuid::now_v7())
            .bind(&form.name)
            .bind(&form.email)
            .bind(form.birthdate)
            .bind(&form.mailing_address)
            .bind(&form.mailing_city)
            .bind(&form.mailing_state)
            .bind(&form.mailing_zip_code)
            .bind(&form.phone_number)
            .bind(&form.text_number)
            .bind(form.preferred_communication.as_str())
            .bind(form.is_group_order)
            .bind(serde_json::to_value(&form.group_members)?)
            .bind(form.needs_airport_transportation)
            .bind(form.wants_catered_dinner)
            .bind(&form.protein_requests)
            .bind(&form.food_allergies)
            .bind(&form.notes)
            .fetch_one(&self.pool)
            .await?;
        row.into_order()
    }

    async fn find_ticket_order(&self, id: Uuid) -> Result<Option<TicketOrder>, AppError> {
        let query = format!("SELECT {TICKET_ORDER_COLUMNS} FROM ticket_orders WHERE id = $1");
        sqlx::query_as::<_, TicketOrderRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TicketOrderRow::into_order)
            .transpose()
    }

    async fn list_ticket_orders(&self) -> Result<Vec<TicketOrder>, AppError> {
        let query = format!(
            "SELECT {TICKET_ORDER_COLUMNS} FROM ticket_orders ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, TicketOrderRow>(&query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TicketOrderRow::into_order)
            .collect()
    }

    async fn create_contact_message(&self, form: ContactForm) -> Result<ContactMessage, AppError> {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO contact_messages (id, name, email, message) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(&form.name)
        .bind(&form.email)
        .bind(&form.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(ContactMessage {
            id: row.0,
            form,
            created_at: row.1,
        })
    }
}
