pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{
    domain::{gateway::PaymentGateway, store::RecordStore},
    services::{lifecycle::LifecycleController, mailer::Mailer},
};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<LifecycleController>,
    pub store: Arc<dyn RecordStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub org_name: String,
    pub admin_email: Option<String>,
    pub send_user_confirmation: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/donations/create",
            post(adapters::donations::create_donation),
        )
        .route(
            "/api/donations/capture",
            post(adapters::donations::capture_donation),
        )
        .route(
            "/api/donations/total",
            get(adapters::donations::donations_total),
        )
        .route("/api/donations/{id}", get(adapters::donations::get_donation))
        .route(
            "/api/tickets/purchase",
            post(adapters::tickets::purchase_tickets),
        )
        .route(
            "/api/tickets/capture",
            post(adapters::tickets::capture_tickets),
        )
        .route("/api/tickets/{id}", get(adapters::tickets::get_ticket))
        .route(
            "/api/ticket-orders",
            post(adapters::ticket_orders::create_ticket_order)
                .get(adapters::ticket_orders::list_ticket_orders),
        )
        .route(
            "/api/ticket-orders/{id}",
            get(adapters::ticket_orders::get_ticket_order),
        )
        .route("/api/contact", post(adapters::contact::submit_contact))
        .route(
            "/api/paypal/webhook",
            post(adapters::webhook::paypal_webhook_handler),
        )
        .layer(DefaultBodyLimit::max(128 * 1024))
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "message": "Server is running",
        "timestamp": chrono::Utc::now(),
    }))
}
