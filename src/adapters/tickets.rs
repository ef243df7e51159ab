use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, donations::CaptureRequest, validate},
        domain::{
            error::AppError,
            ids::OrderId,
            record::{TicketDetails, TransactionKind, TransactionRecord},
        },
        services::{
            lifecycle::FinalizeOutcome,
            mailer::{send_best_effort, ticket_confirmation},
        },
    },
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    uuid::Uuid,
};

const MAX_TICKETS_PER_ORDER: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    event_id: i64,
    quantity: u32,
    attendee_names: Option<Vec<String>>,
    special_requests: Option<String>,
}

/// POST /api/tickets/purchase
pub async fn purchase_tickets(
    State(state): State<AppState>,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.event_id < 1 {
        return Err(AppError::Validation("valid event ID is required".into()).into());
    }
    if body.quantity < 1 || body.quantity > MAX_TICKETS_PER_ORDER {
        return Err(AppError::Validation(format!(
            "quantity must be between 1 and {MAX_TICKETS_PER_ORDER}"
        ))
        .into());
    }
    let special_requests =
        validate::optional_text(body.special_requests, "special requests", 500)?;
    if let Some(names) = &body.attendee_names {
        if names.iter().any(|n| n.trim().is_empty() || n.len() > 255) {
            return Err(
                AppError::Validation("attendee names must be 1-255 characters".into()).into(),
            );
        }
    }

    let event = state
        .store
        .find_event(body.event_id)
        .await?
        .filter(|e| e.is_active)
        .ok_or_else(|| AppError::NotFound("event not found".into()))?;

    let unit_price = event.ticket_price.ok_or_else(|| {
        AppError::Validation("event does not have a valid ticket price".into())
    })?;
    let total = unit_price.times(body.quantity)?;

    let details = TicketDetails {
        event_id: event.id,
        event_title: event.title.clone(),
        quantity: body.quantity,
        unit_price_cents: unit_price.cents(),
        attendee_names: body.attendee_names,
        special_requests,
    };

    let initiated = state
        .controller
        .initiate_ticket_purchase(total, details)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "ticketId": initiated.record.id,
        "orderId": initiated.record.external_order_id,
        "approvalUrl": initiated.approval_url,
        "totalAmount": initiated.record.amount.to_string(),
        "message": "Ticket order created successfully. Redirect user to approvalUrl to complete payment.",
    })))
}

fn ticket_body(record: &TransactionRecord, details: &TicketDetails) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "quantity": details.quantity,
        "totalAmount": record.amount.to_string(),
        "status": record.status.as_str(),
        "transactionId": record.external_transaction_id,
        "event": {
            "id": details.event_id,
            "title": details.event_title,
        },
    })
}

fn parse_details(record: &TransactionRecord) -> Result<TicketDetails, AppError> {
    serde_json::from_value(record.metadata.clone()).map_err(AppError::from)
}

/// POST /api/tickets/capture
pub async fn capture_tickets(
    State(state): State<AppState>,
    Json(body): Json<CaptureRequest>,
) -> Result<Response, ApiError> {
    let order_id = OrderId::new(body.order_id)?;
    let outcome = state
        .controller
        .finalize(&order_id, TransactionKind::TicketPurchase)
        .await?;

    match outcome {
        FinalizeOutcome::Completed(record) => {
            let details = parse_details(&record)?;
            if let Some(to) = record.payer_email.clone() {
                let mail = ticket_confirmation(&state.org_name, &record, &details, to);
                send_best_effort(state.mailer.as_ref(), mail).await;
            }
            Ok(Json(serde_json::json!({
                "success": true,
                "message": "Ticket payment captured successfully",
                "ticket": ticket_body(&record, &details),
            }))
            .into_response())
        }
        FinalizeOutcome::AlreadyCompleted(record) => {
            let details = parse_details(&record)?;
            Ok(Json(serde_json::json!({
                "success": true,
                "message": "Ticket payment captured successfully",
                "ticket": ticket_body(&record, &details),
            }))
            .into_response())
        }
        FinalizeOutcome::Declined { raw_status, .. } => Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": "Payment capture was not completed",
                "status": raw_status,
            })),
        )
            .into_response()),
    }
}

/// GET /api/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state.controller.get(id).await?;
    if record.kind != TransactionKind::TicketPurchase {
        return Err(AppError::NotFound(format!("ticket purchase {id} not found")).into());
    }
    let details = parse_details(&record)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "ticket": {
            "id": record.id,
            "quantity": details.quantity,
            "totalAmount": record.amount.to_string(),
            "paymentStatus": record.status.as_str(),
            "createdAt": record.created_at,
            "event": {
                "id": details.event_id,
                "title": details.event_title,
            },
        },
    })))
}
