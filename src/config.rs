use {crate::domain::error::AppError, std::env};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalEnvironment {
    Sandbox,
    Live,
}

impl PayPalEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Live => "https://api-m.paypal.com",
            Self::Sandbox => "https://api-m.sandbox.paypal.com",
        }
    }

    fn from_env_value(raw: &str) -> Self {
        match raw {
            "production" | "live" => Self::Live,
            _ => Self::Sandbox,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub environment: PayPalEnvironment,
    /// Required: webhook deliveries are rejected unless their signature
    /// verifies against this id.
    pub webhook_id: String,
    pub brand_name: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub admin_email: String,
    pub send_user_confirmation: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub frontend_base_url: String,
    pub cors_origins: Vec<String>,
    pub paypal: PayPalConfig,
    /// Absent SMTP config downgrades email to a logged no-op.
    pub smtp: Option<SmtpConfig>,
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} must be set")))
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .map_err(|_| AppError::Validation("PORT must be a number".into()))?;

        let frontend_base_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let cors_origins = frontend_base_url
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let frontend_base_url = cors_origins
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".into());

        let paypal = PayPalConfig {
            client_id: required("PAYPAL_CLIENT_ID")?,
            client_secret: required("PAYPAL_CLIENT_SECRET")?,
            environment: PayPalEnvironment::from_env_value(
                &env::var("PAYPAL_ENVIRONMENT").unwrap_or_else(|_| "sandbox".into()),
            ),
            webhook_id: required("PAYPAL_WEBHOOK_ID")?,
            brand_name: env::var("PAYPAL_BRAND_NAME").unwrap_or_else(|_| "Seeds of Hope".into()),
        };

        let smtp = match env::var("SMTP_HOST") {
            Err(_) => None,
            Ok(host) => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".into())
                    .parse()
                    .map_err(|_| AppError::Validation("SMTP_PORT must be a number".into()))?,
                user: env::var("SMTP_USER").ok(),
                password: env::var("SMTP_PASS").ok(),
                from_email: required("FROM_EMAIL")?,
                from_name: env::var("FROM_NAME").unwrap_or_else(|_| "Seeds of Hope".into()),
                admin_email: required("TO_EMAIL")?,
                send_user_confirmation: env::var("SEND_USER_CONFIRMATION")
                    .map(|v| v == "true")
                    .unwrap_or(false),
            }),
        };

        Ok(Self {
            port,
            database_url: required("DATABASE_URL")?,
            frontend_base_url,
            cors_origins,
            paypal,
            smtp,
        })
    }
}
