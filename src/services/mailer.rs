use {
    crate::config::SmtpConfig,
    crate::domain::error::AppError,
    crate::domain::intake::ContactForm,
    crate::domain::record::{DonationDetails, TicketDetails, TransactionRecord},
    async_trait::async_trait,
    lettre::{
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        message::{Mailbox, MultiPart},
        transport::smtp::authentication::Credentials,
    },
};

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Email delivery seam. Every send in the payment path is best-effort:
/// callers log failures and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundEmail) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    pub admin_to: String,
    pub send_user_confirmation: bool,
}

impl SmtpMailer {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .map_err(|e| AppError::Mail(format!("smtp relay {}: {e}", cfg.host)))?
            .port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.user, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = format!("{} <{}>", cfg.from_name, cfg.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("bad from address: {e}")))?;
        Ok(Self {
            transport: builder.build(),
            from,
            admin_to: cfg.admin_email.clone(),
            send_user_confirmation: cfg.send_user_confirmation,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutboundEmail) -> Result<(), AppError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("bad recipient {:?}: {e}", mail.to)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(mail.text, mail.html))
            .map_err(|e| AppError::Mail(format!("build message: {e}")))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(format!("smtp send: {e}")))?;
        tracing::info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(())
    }
}

/// Stand-in when SMTP is not configured: logs the drop and succeeds.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, mail: OutboundEmail) -> Result<(), AppError> {
        tracing::warn!(to = %mail.to, subject = %mail.subject, "smtp not configured, dropping email");
        Ok(())
    }
}

pub async fn send_best_effort(mailer: &dyn Mailer, mail: OutboundEmail) {
    let subject = mail.subject.clone();
    if let Err(err) = mailer.send(mail).await {
        tracing::warn!(error = %err, subject = %subject, "email delivery failed");
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn donation_receipt(
    org_name: &str,
    record: &TransactionRecord,
    details: &DonationDetails,
    to: String,
) -> OutboundEmail {
    let donor = details.name.as_deref().unwrap_or("Friend");
    let text = format!(
        "Dear {donor},\n\nThank you for your {} donation of ${} to {org_name}.\n\
         Transaction reference: {}.\n\nWith gratitude,\nThe {org_name} Team\n",
        details.donation_type.as_str(),
        record.amount,
        record
            .external_transaction_id
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
    );
    let html = format!(
        "<h2>Thank You for Your Donation</h2>\
         <p>Dear {},</p>\
         <p>Thank you for your {} donation of <strong>${}</strong> to {}.</p>\
         <p>Transaction reference: {}</p>\
         <p>With gratitude,<br>The {} Team</p>",
        escape_html(donor),
        details.donation_type.as_str(),
        record.amount,
        escape_html(org_name),
        record
            .external_transaction_id
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        escape_html(org_name),
    );
    OutboundEmail {
        to,
        subject: format!("Thank you for donating to {org_name}"),
        html,
        text,
    }
}

pub fn ticket_confirmation(
    org_name: &str,
    record: &TransactionRecord,
    details: &TicketDetails,
    to: String,
) -> OutboundEmail {
    let text = format!(
        "Your purchase of {} ticket(s) for {} is confirmed.\n\
         Total paid: ${}.\nOrder reference: {}.\n\nSee you there,\nThe {org_name} Team\n",
        details.quantity,
        details.event_title,
        record.amount,
        record.id,
    );
    let html = format!(
        "<h2>Ticket Purchase Confirmed</h2>\
         <p>Your purchase of <strong>{}</strong> ticket(s) for <strong>{}</strong> is confirmed.</p>\
         <p>Total paid: ${}</p>\
         <p>Order reference: {}</p>\
         <p>See you there,<br>The {} Team</p>",
        details.quantity,
        escape_html(&details.event_title),
        record.amount,
        record.id,
        escape_html(org_name),
    );
    OutboundEmail {
        to,
        subject: format!("Your {org_name} tickets"),
        html,
        text,
    }
}

pub fn contact_admin_notice(form: &ContactForm, to: String) -> OutboundEmail {
    let text = format!(
        "New contact form submission\n\nName: {}\nEmail: {}\n\n{}\n",
        form.name, form.email, form.message,
    );
    let html = format!(
        "<h2>New Contact Form Submission</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Message:</strong></p><p>{}</p>",
        escape_html(&form.name),
        escape_html(&form.email),
        escape_html(&form.message).replace('\n', "<br>"),
    );
    OutboundEmail {
        to,
        subject: format!("New Contact Form Submission from {}", form.name),
        html,
        text,
    }
}

pub fn contact_confirmation(org_name: &str, form: &ContactForm) -> OutboundEmail {
    let text = format!(
        "Dear {},\n\nWe have received your message and will get back to you as soon as \
         possible.\n\nYour message:\n{}\n\nBest regards,\nThe {org_name} Team\n",
        form.name, form.message,
    );
    let html = format!(
        "<h2>Thank You for Contacting {}</h2>\
         <p>Dear {},</p>\
         <p>We have received your message and will get back to you as soon as possible.</p>\
         <p><strong>Your message:</strong></p><p>{}</p>\
         <p>Best regards,<br>The {} Team</p>",
        escape_html(org_name),
        escape_html(&form.name),
        escape_html(&form.message).replace('\n', "<br>"),
        escape_html(org_name),
    );
    OutboundEmail {
        to: form.email.clone(),
        subject: format!("Thank You for Contacting {org_name}"),
        html,
        text,
    }
}
