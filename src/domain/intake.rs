use {
    super::error::AppError,
    chrono::{DateTime, NaiveDate, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationChannel {
    Text,
    Email,
}

impl CommunicationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for CommunicationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for CommunicationChannel {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "text" => Ok(Self::Text),
            "email" => Ok(Self::Email),
            other => Err(AppError::Validation(format!(
                "unknown communication channel: {other}"
            ))),
        }
    }
}

/// Pre-payment ticket intake form, submitted before any money moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketOrderForm {
    pub name: String,
    pub email: String,
    pub birthdate: NaiveDate,
    pub mailing_address: String,
    pub mailing_city: String,
    pub mailing_state: String,
    pub mailing_zip_code: String,
    pub phone_number: String,
    pub text_number: Option<String>,
    pub preferred_communication: CommunicationChannel,
    #[serde(default)]
    pub is_group_order: bool,
    #[serde(default)]
    pub group_members: Vec<String>,
    #[serde(default)]
    pub needs_airport_transportation: bool,
    #[serde(default)]
    pub wants_catered_dinner: bool,
    pub protein_requests: Option<String>,
    pub food_allergies: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TicketOrder {
    pub id: Uuid,
    pub form: TicketOrderForm,
    pub created_at: DateTime<Utc>,
}

/// Contact-form submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub id: Uuid,
    pub form: ContactForm,
    pub created_at: DateTime<Utc>,
}
