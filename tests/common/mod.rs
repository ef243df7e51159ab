#![allow(dead_code)]

use seeds_api::AppState;
use seeds_api::domain::error::AppError;
use seeds_api::domain::gateway::{
    CaptureOutcome, CreatedOrder, OrderRequest, PaymentGateway, WebhookHeaders,
};
use seeds_api::domain::ids::{CaptureId, OrderId};
use seeds_api::domain::money::UsdAmount;
use seeds_api::domain::record::{DonationDetails, EventInfo};
use seeds_api::infra::memory::MemoryRecordStore;
use seeds_api::services::lifecycle::LifecycleController;
use seeds_api::services::mailer::NullMailer;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::sync::Arc;

/// What the next `capture_order` call should report.
#[derive(Debug, Clone)]
pub enum CaptureScript {
    Completed {
        transaction_id: &'static str,
        payer_email: Option<&'static str>,
        payer_id: Option<&'static str>,
    },
    Declined {
        raw_status: &'static str,
    },
    /// Simulates a network failure / processor outage, not a denial.
    TransportError,
}

/// Scripted gateway double. Counts calls so tests can assert the
/// idempotency guard really skips the second capture.
pub struct MockGateway {
    pub create_calls: AtomicU64,
    pub capture_calls: AtomicU64,
    create_fails: AtomicBool,
    verify_ok: AtomicBool,
    next_order: Mutex<Option<String>>,
    order_seq: AtomicU64,
    capture_script: Mutex<CaptureScript>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            create_calls: AtomicU64::new(0),
            capture_calls: AtomicU64::new(0),
            create_fails: AtomicBool::new(false),
            verify_ok: AtomicBool::new(true),
            next_order: Mutex::new(None),
            order_seq: AtomicU64::new(0),
            capture_script: Mutex::new(CaptureScript::Completed {
                transaction_id: "TXN1",
                payer_email: Some("payer@example.com"),
                payer_id: Some("PAYER1"),
            }),
        }
    }

    pub fn fail_create_order(&self) {
        self.create_fails.store(true, Ordering::SeqCst);
    }

    pub fn reject_webhooks(&self) {
        self.verify_ok.store(false, Ordering::SeqCst);
    }

    /// Force the order id the next `create_order` hands out.
    pub fn set_next_order_id(&self, id: &str) {
        *self.next_order.lock().unwrap() = Some(id.to_string());
    }

    pub fn script_capture(&self, script: CaptureScript) {
        *self.capture_script.lock().unwrap() = script;
    }

    pub fn capture_call_count(&self) -> u64 {
        self.capture_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, _req: &OrderRequest) -> Result<CreatedOrder, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.create_fails.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("simulated network error".into()));
        }
        let id = self.next_order.lock().unwrap().take().unwrap_or_else(|| {
            format!("ORDER{}", self.order_seq.fetch_add(1, Ordering::SeqCst) + 1)
        });
        Ok(CreatedOrder {
            order_id: OrderId::new(id.clone())?,
            approval_url: format!("https://paypal.test/approve/{id}"),
        })
    }

    async fn capture_order(&self, _order_id: &OrderId) -> Result<CaptureOutcome, AppError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        match self.capture_script.lock().unwrap().clone() {
            CaptureScript::Completed {
                transaction_id,
                payer_email,
                payer_id,
            } => Ok(CaptureOutcome {
                completed: true,
                raw_status: "COMPLETED".into(),
                transaction_id: Some(CaptureId::new(transaction_id)?),
                payer_email: payer_email.map(String::from),
                payer_id: payer_id.map(String::from),
            }),
            CaptureScript::Declined { raw_status } => Ok(CaptureOutcome {
                completed: false,
                raw_status: raw_status.into(),
                transaction_id: None,
                payer_email: None,
                payer_id: None,
            }),
            CaptureScript::TransportError => {
                Err(AppError::Gateway("simulated capture outage".into()))
            }
        }
    }

    async fn verify_webhook(&self, _headers: &WebhookHeaders, _raw_body: &str) -> bool {
        self.verify_ok.load(Ordering::SeqCst)
    }
}

pub struct TestContext {
    pub store: Arc<MemoryRecordStore>,
    pub gateway: Arc<MockGateway>,
    pub controller: Arc<LifecycleController>,
}

pub fn context() -> TestContext {
    let store = Arc::new(MemoryRecordStore::new());
    let gateway = Arc::new(MockGateway::new());
    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        gateway.clone(),
        "http://localhost:3000",
        "Seeds of Hope",
    ));
    TestContext {
        store,
        gateway,
        controller,
    }
}

pub fn app(ctx: &TestContext) -> Router {
    seeds_api::app(AppState {
        controller: ctx.controller.clone(),
        store: ctx.store.clone(),
        gateway: ctx.gateway.clone(),
        mailer: Arc::new(NullMailer),
        org_name: "Seeds of Hope".into(),
        admin_email: None,
        send_user_confirmation: false,
    })
}

pub fn donation_details(name: &str, anonymous: bool) -> DonationDetails {
    DonationDetails {
        name: Some(name.to_string()),
        email: Some("donor@example.com".to_string()),
        is_anonymous: anonymous,
        message: None,
        donation_type: Default::default(),
        request_tax_receipt: false,
    }
}

pub fn usd(raw: &str) -> UsdAmount {
    UsdAmount::parse(raw).unwrap()
}

pub fn seed_event(ctx: &TestContext, id: i64, title: &str, price: Option<&str>) {
    ctx.store.insert_event(EventInfo {
        id,
        title: title.to_string(),
        ticket_price: price.map(usd),
        is_active: true,
    });
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    use tower::ServiceExt;
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    use tower::ServiceExt;
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
