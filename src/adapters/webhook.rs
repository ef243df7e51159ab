use {
    crate::{
        AppState,
        domain::{
            gateway::WebhookHeaders,
            ids::{CaptureId, OrderId},
        },
        services::lifecycle::{CaptureNotification, WebhookOutcome},
    },
    axum::{
        Json,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
};

/// Payment-processor notification, reduced to the closed set of event
/// types this system reacts to. Everything else is `Unhandled` and only
/// logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CaptureCompleted {
        order_id: Option<String>,
        capture_id: String,
        payer_email: Option<String>,
        payer_id: Option<String>,
    },
    CaptureDenied {
        order_id: Option<String>,
        capture_id: String,
    },
    CaptureRefunded {
        capture_id: Option<String>,
    },
    OrderApproved {
        order_id: String,
    },
    Unhandled {
        event_type: String,
    },
}

fn str_at<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str()
}

fn related_order_id(resource: &serde_json::Value) -> Option<String> {
    str_at(resource, &["supplementary_data", "related_ids", "order_id"]).map(String::from)
}

/// For refund events the resource id is the refund id; the capture it
/// reverses is linked under rel="up".
fn refunded_capture_id(resource: &serde_json::Value) -> Option<String> {
    let links = resource.get("links")?.as_array()?;
    let href = links
        .iter()
        .find(|l| l.get("rel").and_then(|r| r.as_str()) == Some("up"))?
        .get("href")?
        .as_str()?;
    href.rsplit('/').next().map(String::from)
}

impl WebhookEvent {
    /// `None` when the envelope has no usable event type or the resource
    /// lacks the id the event type requires.
    pub fn parse(body: &serde_json::Value) -> Option<WebhookEvent> {
        let event_type = body.get("event_type")?.as_str()?;
        let resource = body.get("resource").cloned().unwrap_or_default();

        let event = match event_type {
            "PAYMENT.CAPTURE.COMPLETED" => WebhookEvent::CaptureCompleted {
                order_id: related_order_id(&resource),
                capture_id: resource.get("id")?.as_str()?.to_string(),
                payer_email: str_at(&resource, &["payer", "email_address"]).map(String::from),
                payer_id: str_at(&resource, &["payer", "payer_id"]).map(String::from),
            },
            "PAYMENT.CAPTURE.DENIED" | "PAYMENT.CAPTURE.DECLINED" => {
                WebhookEvent::CaptureDenied {
                    order_id: related_order_id(&resource),
                    capture_id: resource.get("id")?.as_str()?.to_string(),
                }
            }
            "PAYMENT.CAPTURE.REFUNDED" => WebhookEvent::CaptureRefunded {
                capture_id: refunded_capture_id(&resource)
                    .or_else(|| resource.get("id").and_then(|i| i.as_str()).map(String::from)),
            },
            "CHECKOUT.ORDER.APPROVED" => WebhookEvent::OrderApproved {
                order_id: resource.get("id")?.as_str()?.to_string(),
            },
            other => WebhookEvent::Unhandled {
                event_type: other.to_string(),
            },
        };
        Some(event)
    }
}

fn signature_headers(headers: &HeaderMap) -> WebhookHeaders {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    WebhookHeaders {
        transmission_id: get("paypal-transmission-id"),
        transmission_time: get("paypal-transmission-time"),
        transmission_sig: get("paypal-transmission-sig"),
        cert_url: get("paypal-cert-url"),
        auth_algo: get("paypal-auth-algo"),
    }
}

fn ack() -> Response {
    Json(serde_json::json!({ "received": true })).into_response()
}

fn log_outcome(context: &str, outcome: &WebhookOutcome) {
    match outcome {
        WebhookOutcome::Applied(record) => {
            tracing::info!(record_id = %record.id, status = %record.status, "{context}: applied");
        }
        WebhookOutcome::AlreadyApplied(id) => {
            tracing::info!(record_id = %id, "{context}: already applied, no-op");
        }
        // The main operational risk here is silent data loss, so every
        // unmatched event is logged for follow-up.
        WebhookOutcome::Unmatched => {
            tracing::warn!("{context}: no matching record");
        }
    }
}

/// POST /api/paypal/webhook
///
/// Rejects unverifiable deliveries with 401; past that point every
/// internal failure is swallowed and logged, and the processor always
/// gets a 200 acknowledgment so it does not retry-storm.
pub async fn paypal_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let sig_headers = signature_headers(&headers);
    if !state.gateway.verify_webhook(&sig_headers, &body).await {
        tracing::warn!("invalid webhook signature, rejecting");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let json: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(err) => {
            tracing::error!(error = %err, "verified webhook body failed to parse");
            return ack();
        }
    };

    let Some(event) = WebhookEvent::parse(&json) else {
        tracing::warn!("webhook event missing event_type or resource id, ignoring");
        return ack();
    };

    match event {
        WebhookEvent::CaptureCompleted {
            order_id: Some(order_id),
            capture_id,
            payer_email,
            payer_id,
        } => {
            let parsed = OrderId::new(order_id).and_then(|oid| {
                CaptureId::new(capture_id).map(|cid| (oid, cid))
            });
            match parsed {
                Ok((order_id, capture_id)) => {
                    let note = CaptureNotification {
                        transaction_id: capture_id,
                        payer_email,
                        payer_id,
                    };
                    match state.controller.record_capture_completed(&order_id, note).await {
                        Ok(outcome) => log_outcome("capture completed", &outcome),
                        Err(err) => {
                            tracing::error!(error = %err, %order_id, "capture-completed event failed");
                        }
                    }
                }
                Err(err) => tracing::warn!(error = %err, "capture-completed event with bad ids"),
            }
        }
        WebhookEvent::CaptureCompleted { order_id: None, capture_id, .. } => {
            tracing::warn!(%capture_id, "capture-completed event without an order id");
        }
        WebhookEvent::CaptureDenied {
            order_id: Some(order_id),
            capture_id,
        } => match OrderId::new(order_id) {
            Ok(order_id) => match state.controller.mark_denied(&order_id).await {
                Ok(outcome) => log_outcome("capture denied", &outcome),
                Err(err) => {
                    tracing::error!(error = %err, %order_id, %capture_id, "denial event failed");
                }
            },
            Err(err) => tracing::warn!(error = %err, "denial event with bad order id"),
        },
        WebhookEvent::CaptureDenied { order_id: None, capture_id } => {
            tracing::warn!(%capture_id, "denial event without an order id");
        }
        WebhookEvent::CaptureRefunded { capture_id: Some(capture_id) } => {
            match CaptureId::new(capture_id) {
                Ok(capture_id) => match state.controller.mark_refunded(&capture_id).await {
                    Ok(outcome) => log_outcome("capture refunded", &outcome),
                    Err(err) => {
                        tracing::error!(error = %err, %capture_id, "refund event failed");
                    }
                },
                Err(err) => tracing::warn!(error = %err, "refund event with bad capture id"),
            }
        }
        WebhookEvent::CaptureRefunded { capture_id: None } => {
            tracing::warn!("refund event without a capture id");
        }
        // Approval is informational; capture happens via the client
        // capture endpoint or the capture-completed webhook.
        WebhookEvent::OrderApproved { order_id } => {
            tracing::info!(%order_id, "order approved, awaiting capture");
        }
        WebhookEvent::Unhandled { event_type } => {
            tracing::info!(%event_type, "unhandled webhook event type, ignoring");
        }
    }

    ack()
}
