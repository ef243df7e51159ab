use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, validate},
        domain::{
            error::AppError,
            ids::OrderId,
            money::AmountInput,
            record::{DonationDetails, DonationType, TransactionKind, TransactionRecord},
        },
        services::{
            lifecycle::FinalizeOutcome,
            mailer::{donation_receipt, send_best_effort},
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    amount: AmountInput,
    email: Option<String>,
    name: Option<String>,
    #[serde(default)]
    is_anonymous: bool,
    #[serde(default)]
    request_tax_receipt: bool,
    message: Option<String>,
    donation_type: Option<String>,
}

/// POST /api/donations/create
pub async fn create_donation(
    State(state): State<AppState>,
    Json(body): Json<CreateDonationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let amount = body.amount.into_amount()?;
    let email = body
        .email
        .as_deref()
        .map(|e| validate::validate_email(e, "email"))
        .transpose()?;
    let name = validate::optional_text(body.name, "name", 255)?;
    let message = validate::optional_text(body.message, "message", 1000)?;
    let donation_type = match body.donation_type.as_deref() {
        Some(raw) => DonationType::try_from(raw)?,
        None => DonationType::default(),
    };

    let details = DonationDetails {
        name,
        email,
        is_anonymous: body.is_anonymous,
        message,
        donation_type,
        request_tax_receipt: body.request_tax_receipt,
    };

    let initiated = state.controller.initiate_donation(amount, details).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "donationId": initiated.record.id,
        "orderId": initiated.record.external_order_id,
        "approvalUrl": initiated.approval_url,
        "message": "Donation order created successfully. Redirect user to approvalUrl to complete payment.",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub order_id: String,
}

fn donation_body(record: &TransactionRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "amount": record.amount.to_string(),
        "status": record.status.as_str(),
        "transactionId": record.external_transaction_id,
    })
}

/// POST /api/donations/capture
pub async fn capture_donation(
    State(state): State<AppState>,
    Json(body): Json<CaptureRequest>,
) -> Result<Response, ApiError> {
    let order_id = OrderId::new(body.order_id)?;
    let outcome = state
        .controller
        .finalize(&order_id, TransactionKind::Donation)
        .await?;

    match outcome {
        FinalizeOutcome::Completed(record) => {
            send_receipt(&state, &record).await;
            Ok(Json(serde_json::json!({
                "success": true,
                "message": "Donation payment captured successfully",
                "donation": donation_body(&record),
            }))
            .into_response())
        }
        // Duplicate capture (client retry, or the webhook won the race):
        // same successful response, nothing re-processed.
        FinalizeOutcome::AlreadyCompleted(record) => Ok(Json(serde_json::json!({
            "success": true,
            "message": "Donation payment captured successfully",
            "donation": donation_body(&record),
        }))
        .into_response()),
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

async fn send_receipt(state: &AppState, record: &TransactionRecord) {
    let Ok(details) = serde_json::from_value::<DonationDetails>(record.metadata.clone()) else {
        tracing::warn!(record_id = %record.id, "donation metadata unreadable, skipping receipt");
        return;
    };
    let recipient = details
        .email
        .clone()
        .or_else(|| record.payer_email.clone());
    let Some(to) = recipient else {
        tracing::debug!(record_id = %record.id, "no recipient address, skipping receipt");
        return;
    };
    let mail = donation_receipt(&state.org_name, record, &details, to);
    send_best_effort(state.mailer.as_ref(), mail).await;
}

/// GET /api/donations/{id}
pub async fn get_donation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state.controller.get(id).await?;
    if record.kind != TransactionKind::Donation {
        return Err(AppError::NotFound(format!("donation {id} not found")).into());
    }
    let details: DonationDetails =
        serde_json::from_value(record.metadata.clone()).map_err(AppError::from)?;

    // Public view: the donor name is suppressed for anonymous donations.
    let name = if details.is_anonymous {
        None
    } else {
        details.name
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "donation": {
            "id": record.id,
            "amount": record.amount.to_string(),
            "paymentStatus": record.status.as_str(),
            "createdAt": record.created_at,
            "name": name,
        },
    })))
}

/// GET /api/donations/total — sum of completed donation amounts.
pub async fn donations_total(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cents = state
        .controller
        .completed_total(TransactionKind::Donation)
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "total": format!("{}.{:02}", cents / 100, cents % 100),
        "currency": "USD",
    })))
}
