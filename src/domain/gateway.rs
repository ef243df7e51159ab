use {
    super::error::AppError,
    super::ids::{CaptureId, OrderId},
    super::money::UsdAmount,
    async_trait::async_trait,
};

/// Input to `PaymentGateway::create_order`.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount: UsdAmount,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
    /// Our reference carried on the processor side ("donation-<uuid>").
    pub custom_id: String,
}

/// A processor-side order awaiting buyer approval.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub approval_url: String,
}

/// What the processor reported for a capture attempt. A non-completed
/// outcome is a processor decision (denied, declined), distinct from a
/// transport failure which surfaces as `AppError::Gateway`.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub completed: bool,
    /// Processor's literal capture status ("COMPLETED", "DECLINED", ...).
    pub raw_status: String,
    pub transaction_id: Option<CaptureId>,
    pub payer_email: Option<String>,
    pub payer_id: Option<String>,
}

/// Signature headers accompanying a webhook delivery. Fields are optional
/// because verification must tolerate malformed requests and answer `false`
/// rather than erroring.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    pub transmission_id: Option<String>,
    pub transmission_time: Option<String>,
    pub transmission_sig: Option<String>,
    pub cert_url: Option<String>,
    pub auth_algo: Option<String>,
}

/// The payment processor, reduced to the three calls this system makes.
/// No idempotency is added here; repeat-capture handling belongs to the
/// lifecycle controller.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, req: &OrderRequest) -> Result<CreatedOrder, AppError>;

    async fn capture_order(&self, order_id: &OrderId) -> Result<CaptureOutcome, AppError>;

    /// `false` on anything malformed or unverifiable; never errors.
    async fn verify_webhook(&self, headers: &WebhookHeaders, raw_body: &str) -> bool;
}
