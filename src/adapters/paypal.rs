use {
    crate::config::PayPalConfig,
    crate::domain::{
        error::AppError,
        gateway::{CaptureOutcome, CreatedOrder, OrderRequest, PaymentGateway, WebhookHeaders},
        ids::{CaptureId, OrderId},
    },
    async_trait::async_trait,
    serde::Deserialize,
    std::time::{Duration, Instant},
    tokio::sync::RwLock,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Refresh the OAuth token this long before the processor expires it.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// PayPal REST client: OAuth2 client-credentials auth, Checkout Orders v2,
/// and the webhook signature verification API.
pub struct PayPalGateway {
    http: reqwest::Client,
    cfg: PayPalConfig,
    token: RwLock<Option<CachedToken>>,
}

impl PayPalGateway {
    pub fn new(cfg: PayPalConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Gateway(format!("http client: {e}")))?;
        Ok(Self {
            http,
            cfg,
            token: RwLock::new(None),
        })
    }

    fn base_url(&self) -> &str {
        self.cfg.environment.base_url()
    }

    async fn access_token(&self) -> Result<String, AppError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = &*cached {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url()))
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("token request: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "token request rejected: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("token response: {e}")))?;

        let expires_at = Instant::now()
            + Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_SLACK);
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        Ok(access_token)
    }

    async fn read_error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("{status}: {body}")
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    rel: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CapturePayer {
    email_address: Option<String>,
    payer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptureDetail {
    id: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<CaptureDetail>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    payments: Option<UnitPayments>,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: Option<String>,
    payer: Option<CapturePayer>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn create_order(&self, req: &OrderRequest) -> Result<CreatedOrder, AppError> {
        let token = self.access_token().await?;

        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": "USD",
                    "value": req.amount.to_string(),
                },
                "description": req.description,
                "custom_id": req.custom_id,
            }],
            "application_context": {
                "brand_name": self.cfg.brand_name,
                "landing_page": "BILLING",
                "user_action": "PAY_NOW",
                "return_url": req.return_url,
                "cancel_url": req.cancel_url,
            },
        });

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.base_url()))
            .bearer_auth(&token)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("create order: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "create order rejected: {}",
                Self::read_error_body(response).await
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("create order response: {e}")))?;

        let approval_url = order
            .links
            .iter()
            .find(|l| l.rel == "approve")
            .map(|l| l.href.clone())
            .ok_or_else(|| {
                AppError::Gateway(format!("order {} has no approval link", order.id))
            })?;

        Ok(CreatedOrder {
            order_id: OrderId::new(order.id)?,
            approval_url,
        })
    }

    async fn capture_order(&self, order_id: &OrderId) -> Result<CaptureOutcome, AppError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url(),
                order_id
            ))
            .bearer_auth(&token)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("capture order {order_id}: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "capture order {order_id} rejected: {}",
                Self::read_error_body(response).await
            )));
        }

        let capture: CaptureResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("capture response: {e}")))?;

        let detail = capture
            .purchase_units
            .first()
            .and_then(|u| u.payments.as_ref())
            .and_then(|p| p.captures.first());

        let raw_status = detail
            .and_then(|d| d.status.clone())
            .or(capture.status)
            .unwrap_or_else(|| "UNKNOWN".into());

        let transaction_id = match detail {
            Some(d) => Some(CaptureId::new(d.id.clone())?),
            None => None,
        };

        Ok(CaptureOutcome {
            completed: raw_status == "COMPLETED",
            raw_status,
            transaction_id,
            payer_email: capture.payer.as_ref().and_then(|p| p.email_address.clone()),
            payer_id: capture.payer.as_ref().and_then(|p| p.payer_id.clone()),
        })
    }

    /// Strict verification against PayPal's verify-webhook-signature API.
    /// Anything short of an explicit SUCCESS — missing headers, unparsable
    /// body, transport failure — is `false`.
    async fn verify_webhook(&self, headers: &WebhookHeaders, raw_body: &str) -> bool {
        let (Some(tid), Some(time), Some(sig), Some(cert), Some(algo)) = (
            headers.transmission_id.as_deref(),
            headers.transmission_time.as_deref(),
            headers.transmission_sig.as_deref(),
            headers.cert_url.as_deref(),
            headers.auth_algo.as_deref(),
        ) else {
            tracing::warn!("webhook delivery missing signature headers");
            return false;
        };

        let event: serde_json::Value = match serde_json::from_str(raw_body) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "webhook body is not valid json");
                return false;
            }
        };

        let token = match self.access_token().await {
            Ok(t) => t,
            Err(err) => {
                tracing::error!(error = %err, "could not obtain token for webhook verification");
                return false;
            }
        };

        let body = serde_json::json!({
            "auth_algo": algo,
            "cert_url": cert,
            "transmission_id": tid,
            "transmission_sig": sig,
            "transmission_time": time,
            "webhook_id": self.cfg.webhook_id,
            "webhook_event": event,
        });

        let response = self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.base_url()
            ))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::error!(status = %r.status(), "webhook verification call rejected");
                return false;
            }
            Err(err) => {
                tracing::error!(error = %err, "webhook verification call failed");
                return false;
            }
        };

        #[derive(Deserialize)]
        struct VerifyResponse {
            verification_status: String,
        }

        match response.json::<VerifyResponse>().await {
            Ok(v) => v.verification_status == "SUCCESS",
            Err(err) => {
                tracing::error!(error = %err, "webhook verification response unreadable");
                false
            }
        }
    }
}
