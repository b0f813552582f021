//! E-signature provider client: documents with one embedded signer.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use db::models::contract::ContractStatus;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.zapsign.com.br/api/v1";

#[derive(Debug, Clone, Error)]
pub enum ESignError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api token")]
    InvalidToken,
    #[error("document not found at provider")]
    DocumentNotFound,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api token: ESIGN_API_TOKEN environment variable not set")]
    MissingToken,
}

impl ESignError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSigner {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    pub name: String,
    pub markdown_text: String,
    pub external_id: Option<String>,
    pub lang: &'static str,
    pub signers: Vec<NewSigner>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
    Refused,
    #[serde(other)]
    Unknown,
}

impl DocumentStatus {
    pub fn contract_status(&self) -> ContractStatus {
        match self {
            Self::Signed => ContractStatus::Signed,
            Self::Refused => ContractStatus::Refused,
            Self::Pending | Self::Unknown => ContractStatus::Sent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signer {
    pub token: String,
    pub sign_url: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub token: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub signers: Vec<Signer>,
}

impl Document {
    /// Sign link of the single embedded signer.
    pub fn sign_url(&self) -> Option<&str> {
        self.signers.first().and_then(|s| s.sign_url.as_deref())
    }
}

#[async_trait]
pub trait SignatureProvider: Send + Sync {
    async fn create_document(&self, document: &NewDocument) -> Result<Document, ESignError>;

    async fn get_document(&self, token: &str) -> Result<Document, ESignError>;
}

#[derive(Debug, Clone)]
pub struct ESignClient {
    http: Client,
    api_token: SecretString,
    base_url: String,
}

impl ESignClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client from `ESIGN_API_TOKEN` and optional `ESIGN_API_URL`
    pub fn from_env() -> Result<Self, ESignError> {
        let token = std::env::var("ESIGN_API_TOKEN")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ESignError::MissingToken)?;
        Self::new(SecretString::from(token), std::env::var("ESIGN_API_URL").ok())
    }

    pub fn new(api_token: SecretString, base_url: Option<String>) -> Result<Self, ESignError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("creche-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ESignError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_token,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn get_once<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, ESignError> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        handle_response(res).await
    }
}

#[async_trait]
impl SignatureProvider for ESignClient {
    async fn create_document(&self, document: &NewDocument) -> Result<Document, ESignError> {
        let res = self
            .http
            .post(format!("{}/docs/", self.base_url))
            .bearer_auth(self.api_token.expose_secret())
            .json(document)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        handle_response(res).await
    }

    async fn get_document(&self, token: &str) -> Result<Document, ESignError> {
        let path = format!("/docs/{token}/");
        (|| async { self.get_once(&path).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &ESignError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "E-signature call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}

async fn handle_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ESignError> {
    match res.status() {
        s if s.is_success() => res
            .json::<T>()
            .await
            .map_err(|e| ESignError::Serde(e.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ESignError::InvalidToken),
        StatusCode::NOT_FOUND => Err(ESignError::DocumentNotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(ESignError::RateLimited),
        s => Err(ESignError::Http {
            status: s.as_u16(),
            body: res.text().await.unwrap_or_default(),
        }),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ESignError {
    if e.is_timeout() {
        ESignError::Timeout
    } else {
        ESignError::Transport(e.to_string())
    }
}
