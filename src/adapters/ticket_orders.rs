use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, validate},
        domain::{
            error::AppError,
            intake::{CommunicationChannel, TicketOrder, TicketOrderForm},
        },
    },
    axum::{
        Json,
        extract::{Path, State},
    },
    chrono::{NaiveDate, Utc},
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketOrderRequest {
    name: String,
    email: String,
    birthdate: String,
    mailing_address: String,
    mailing_city: String,
    mailing_state: String,
    mailing_zip_code: String,
    phone_number: String,
    text_number: Option<String>,
    preferred_communication: String,
    #[serde(default)]
    is_group_order: bool,
    #[serde(default)]
    group_members: Vec<String>,
    #[serde(default)]
    needs_airport_transportation: bool,
    #[serde(default)]
    wants_catered_dinner: bool,
    protein_requests: Option<String>,
    food_allergies: Option<String>,
    notes: Option<String>,
}

fn parse_birthdate(raw: &str) -> Result<NaiveDate, AppError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation("valid birthdate is required (YYYY-MM-DD format)".into())
    })?;
    let today = Utc::now().date_naive();
    let age = today.years_since(date);
    match age {
        Some(age) if age <= 150 => Ok(date),
        _ => Err(AppError::Validation("invalid birthdate".into())),
    }
}

impl TicketOrderRequest {
    fn into_form(self) -> Result<TicketOrderForm, AppError> {
        let group_members = self
            .group_members
            .into_iter()
            .map(|m| validate::required_text(&m, "group member name", 255))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TicketOrderForm {
            name: validate::required_text(&self.name, "name", 255)?,
            email: validate::validate_email(&self.email, "email address")?,
            birthdate: parse_birthdate(&self.birthdate)?,
            mailing_address: validate::required_text(&self.mailing_address, "mailing address", 255)?,
            mailing_city: validate::required_text(&self.mailing_city, "mailing city", 100)?,
            mailing_state: validate::required_text(&self.mailing_state, "mailing state", 50)?,
            mailing_zip_code: validate::required_text(
                &self.mailing_zip_code,
                "mailing ZIP code",
                20,
            )?,
            phone_number: validate::required_text(&self.phone_number, "phone number", 20)?,
            text_number: validate::optional_text(self.text_number, "text number", 20)?,
            preferred_communication: CommunicationChannel::try_from(
                self.preferred_communication.trim(),
            )?,
            is_group_order: self.is_group_order,
            group_members,
            needs_airport_transportation: self.needs_airport_transportation,
            wants_catered_dinner: self.wants_catered_dinner,
            protein_requests: validate::optional_text(
                self.protein_requests,
                "protein requests",
                1000,
            )?,
            food_allergies: validate::optional_text(self.food_allergies, "food allergies", 1000)?,
            notes: validate::optional_text(self.notes, "notes", 2000)?,
        })
    }
}

fn order_body(order: &TicketOrder) -> Result<serde_json::Value, AppError> {
    let mut body = serde_json::to_value(&order.form)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("id".into(), serde_json::json!(order.id));
        map.insert("createdAt".into(), serde_json::json!(order.created_at));
    }
    Ok(body)
}

/// POST /api/ticket-orders
pub async fn create_ticket_order(
    State(state): State<AppState>,
    Json(body): Json<TicketOrderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = body.into_form()?;
    let order = state.store.create_ticket_order(form).await?;
    tracing::info!(order_id = %order.id, "ticket order submitted");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Ticket order submitted successfully",
        "ticketOrder": order_body(&order)?,
    })))
}

/// GET /api/ticket-orders
pub async fn list_ticket_orders(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let orders = state.store.list_ticket_orders().await?;
    let bodies = orders
        .iter()
        .map(order_body)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(serde_json::json!({
        "success": true,
        "ticketOrders": bodies,
    })))
}

/// GET /api/ticket-orders/{id}
pub async fn get_ticket_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = state
        .store
        .find_ticket_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("ticket order {id} not found")))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "ticketOrder": order_body(&order)?,
    })))
}
