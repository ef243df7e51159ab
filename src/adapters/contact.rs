use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, validate},
        domain::intake::ContactForm,
        services::mailer::{contact_admin_notice, contact_confirmation, send_best_effort},
    },
    axum::{Json, extract::State},
    serde::Deserialize,
};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    name: String,
    email: String,
    message: String,
}

/// POST /api/contact — persist the submission, then notify by email
/// best-effort.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = ContactForm {
        name: validate::required_text(&body.name, "name", 255)?,
        email: validate::validate_email(&body.email, "email")?,
        message: validate::required_text(&body.message, "message", 2000)?,
    };

    let stored = state.store.create_contact_message(form.clone()).await?;
    tracing::info!(message_id = %stored.id, "contact form submission stored");

    if let Some(admin) = state.admin_email.clone() {
        send_best_effort(state.mailer.as_ref(), contact_admin_notice(&form, admin)).await;
    }
    if state.send_user_confirmation {
        send_best_effort(
            state.mailer.as_ref(),
            contact_confirmation(&state.org_name, &form),
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Your message has been sent successfully. We will get back to you soon!",
    })))
}
