use {
    super::error::AppError,
    super::ids::{CaptureId, OrderId},
    super::money::UsdAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// The full transition matrix. `Failed` and `Refunded` are terminal;
    /// `Completed` can only move to `Refunded`.
    pub fn can_transition_to(&self, new: &PaymentStatus) -> bool {
        matches!(
            (self, new),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(AppError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Donation,
    TicketPurchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Donation => "donation",
            Self::TicketPurchase => "ticket_purchase",
        }
    }

    /// Prefix used in the processor-side `custom_id` ("donation-<uuid>").
    pub fn custom_id_prefix(&self) -> &'static str {
        match self {
            Self::Donation => "donation",
            Self::TicketPurchase => "ticket",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "donation" => Ok(Self::Donation),
            "ticket_purchase" => Ok(Self::TicketPurchase),
            other => Err(AppError::Validation(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

/// A monetary transaction (donation or ticket purchase) as persisted.
///
/// `amount` is immutable after creation; only `status` and the
/// gateway-sourced fields change, and only through the store's conditional
/// updates.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount: UsdAmount,
    pub status: PaymentStatus,
    pub external_order_id: Option<OrderId>,
    pub external_transaction_id: Option<CaptureId>,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for `RecordStore::create_pending`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: UsdAmount,
    pub metadata: serde_json::Value,
}

/// Gateway-sourced fields applied when a capture completes. Payer details
/// come from the capture response, never from user input.
#[derive(Debug, Clone)]
pub struct CaptureFields {
    pub transaction_id: CaptureId,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DonationType {
    #[default]
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "annual")]
    Annual,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }
}

impl TryFrom<&str> for DonationType {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "one-time" => Ok(Self::OneTime),
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            other => Err(AppError::Validation(format!(
                "donation type must be one-time, monthly, or annual, got: {other}"
            ))),
        }
    }
}

/// Donation payload stored in `TransactionRecord::metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DonationDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub message: Option<String>,
    #[serde(default)]
    pub donation_type: DonationType,
    #[serde(default)]
    pub request_tax_receipt: bool,
}

impl DonationDetails {
    /// Anonymous donations never persist a donor name. Invoked explicitly
    /// before persistence rather than as a save hook.
    pub fn redact_if_anonymous(mut self) -> Self {
        if self.is_anonymous {
            self.name = None;
        }
        self
    }
}

/// Ticket-purchase payload stored in `TransactionRecord::metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    pub event_id: i64,
    pub event_title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub attendee_names: Option<Vec<String>>,
    pub special_requests: Option<String>,
}

/// Event row referenced by ticket purchases.
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub id: i64,
    pub title: String,
    pub ticket_price: Option<UsdAmount>,
    pub is_active: bool,
}
