//! Payment provider client (customers, subscriptions, charges, PIX, balance).

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use db::models::invoice::InvoiceStatus;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;
use ts_rs::TS;

const DEFAULT_BASE_URL: &str = "https://api.asaas.com/v3";

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("rejected by provider: {0}")]
    Rejected(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: PAYMENT_GATEWAY_API_KEY environment variable not set")]
    MissingApiKey,
}

impl PaymentGatewayError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Boleto,
    Pix,
    CreditCard,
    Undefined,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayPaymentStatus {
    Pending,
    Received,
    Confirmed,
    Overdue,
    Refunded,
    ReceivedInCash,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl GatewayPaymentStatus {
    /// Local invoice status mirrored from the provider status.
    pub fn invoice_status(&self) -> InvoiceStatus {
        match self {
            Self::Received | Self::Confirmed | Self::ReceivedInCash => InvoiceStatus::Paid,
            Self::Refunded | Self::Deleted => InvoiceStatus::Cancelled,
            Self::Pending | Self::Overdue | Self::Unknown => InvoiceStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub cpf_cnpj: Option<String>,
    pub email: Option<String>,
    pub mobile_phone: Option<String>,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCustomer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub customer: String,
    pub billing_type: BillingType,
    pub value: f64,
    pub next_due_date: NaiveDate,
    pub cycle: &'static str,
    pub description: Option<String>,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscription {
    pub id: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub customer: String,
    pub billing_type: BillingType,
    pub value: f64,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub external_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayment {
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub value: f64,
    pub due_date: Option<NaiveDate>,
    pub invoice_url: Option<String>,
    pub installment: Option<String>,
    pub installment_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PixQrCode {
    pub encoded_image: String,
    pub payload: String,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Balance {
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    description: String,
}

/// Provider operations used by billing
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<GatewayCustomer, PaymentGatewayError>;

    async fn create_subscription(
        &self,
        subscription: &NewSubscription,
    ) -> Result<GatewaySubscription, PaymentGatewayError>;

    async fn create_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<GatewayPayment, PaymentGatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentGatewayError>;

    async fn installment_payments(
        &self,
        installment_id: &str,
    ) -> Result<Vec<GatewayPayment>, PaymentGatewayError>;

    async fn pix_qr_code(&self, payment_id: &str) -> Result<PixQrCode, PaymentGatewayError>;

    async fn balance(&self) -> Result<Balance, PaymentGatewayError>;
}

/// HTTP client for the payment provider
#[derive(Debug, Clone)]
pub struct PaymentGatewayClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
}

impl PaymentGatewayClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client from `PAYMENT_GATEWAY_API_KEY` and optional `PAYMENT_GATEWAY_URL`
    pub fn from_env() -> Result<Self, PaymentGatewayError> {
        let api_key = std::env::var("PAYMENT_GATEWAY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PaymentGatewayError::MissingApiKey)?;
        let base_url = std::env::var("PAYMENT_GATEWAY_URL").ok();
        Self::new(SecretString::from(api_key), base_url)
    }

    pub fn new(api_key: SecretString, base_url: Option<String>) -> Result<Self, PaymentGatewayError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("creche-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaymentGatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PaymentGatewayError> {
        let res = self
            .http
            .post(self.url(path))
            .header("access_token", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        handle_response(res).await
    }

    async fn get_once<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, PaymentGatewayError> {
        let res = self
            .http
            .get(self.url(path))
            .header("access_token", self.api_key.expose_secret())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        handle_response(res).await
    }

    /// Reads are idempotent, so transient failures are retried.
    async fn get<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, PaymentGatewayError> {
        (|| async { self.get_once(path).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &PaymentGatewayError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Payment gateway call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}

#[async_trait]
impl PaymentGateway for PaymentGatewayClient {
    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<GatewayCustomer, PaymentGatewayError> {
        self.post("/customers", customer).await
    }

    async fn create_subscription(
        &self,
        subscription: &NewSubscription,
    ) -> Result<GatewaySubscription, PaymentGatewayError> {
        self.post("/subscriptions", subscription).await
    }

    async fn create_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<GatewayPayment, PaymentGatewayError> {
        self.post("/payments", payment).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentGatewayError> {
        self.get(&format!("/payments/{payment_id}")).await
    }

    async fn installment_payments(
        &self,
        installment_id: &str,
    ) -> Result<Vec<GatewayPayment>, PaymentGatewayError> {
        let list: ListResponse<GatewayPayment> = self
            .get(&format!("/payments?installment={installment_id}"))
            .await?;
        Ok(list.data)
    }

    async fn pix_qr_code(&self, payment_id: &str) -> Result<PixQrCode, PaymentGatewayError> {
        self.get(&format!("/payments/{payment_id}/pixQrCode")).await
    }

    async fn balance(&self) -> Result<Balance, PaymentGatewayError> {
        self.get("/finance/balance").await
    }
}

async fn handle_response<T: DeserializeOwned>(
    res: reqwest::Response,
) -> Result<T, PaymentGatewayError> {
    match res.status() {
        s if s.is_success() => res
            .json::<T>()
            .await
            .map_err(|e| PaymentGatewayError::Serde(e.to_string())),
        StatusCode::UNAUTHORIZED => Err(PaymentGatewayError::InvalidApiKey),
        StatusCode::TOO_MANY_REQUESTS => Err(PaymentGatewayError::RateLimited),
        s => {
            let status = s.as_u16();
            let body = res.text().await.unwrap_or_default();
            Err(rejection_or_http(status, body))
        }
    }
}

/// 4xx bodies carry a list of validation errors worth surfacing to the user.
fn rejection_or_http(status: u16, body: String) -> PaymentGatewayError {
    if !(400..500).contains(&status) {
        return PaymentGatewayError::Http { status, body };
    }
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => PaymentGatewayError::Rejected(
            parsed
                .errors
                .into_iter()
                .map(|e| e.description)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => PaymentGatewayError::Http { status, body },
    }
}

fn map_reqwest_error(e: reqwest::Error) -> PaymentGatewayError {
    if e.is_timeout() {
        PaymentGatewayError::Timeout
    } else {
        PaymentGatewayError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_serializes_camel_case() {
        let payment = NewPayment {
            customer: "cus_000005".into(),
            billing_type: BillingType::Pix,
            value: 450.0,
            due_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            description: Some("Mensalidade".into()),
            external_reference: None,
            installment_count: Some(3),
            installment_value: Some(150.0),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["billingType"], "PIX");
        assert_eq!(json["dueDate"], "2025-04-10");
        assert_eq!(json["installmentCount"], 3);
    }

    #[test]
    fn test_single_payment_omits_installment_fields() {
        let payment = NewPayment {
            customer: "cus_1".into(),
            billing_type: BillingType::Boleto,
            value: 10.0,
            due_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            description: None,
            external_reference: None,
            installment_count: None,
            installment_value: None,
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert!(json.get("installmentCount").is_none());
    }

    #[test]
    fn test_payment_response_status_mapping() {
        let payment: GatewayPayment = serde_json::from_str(
            r#"{"id":"pay_1","status":"RECEIVED","value":450.0,"dueDate":"2025-04-10","invoiceUrl":"https://pay/1"}"#,
        )
        .unwrap();
        assert_eq!(payment.status.invoice_status(), InvoiceStatus::Paid);

        let odd: GatewayPayment =
            serde_json::from_str(r#"{"id":"pay_2","status":"AWAITING_RISK_ANALYSIS","value":1}"#)
                .unwrap();
        assert_eq!(odd.status, GatewayPaymentStatus::Unknown);
        assert_eq!(odd.status.invoice_status(), InvoiceStatus::Pending);
    }

    #[test]
    fn test_rejection_message_extracted() {
        let err = rejection_or_http(
            400,
            r#"{"errors":[{"code":"invalid_cpfCnpj","description":"CPF inválido"}]}"#.into(),
        );
        assert!(matches!(err, PaymentGatewayError::Rejected(ref m) if m == "CPF inválido"));
        assert!(!err.should_retry());

        let err = rejection_or_http(502, "bad gateway".into());
        assert!(err.should_retry());
    }
}
