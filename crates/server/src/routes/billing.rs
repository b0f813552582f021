//! Payment provider endpoints; all answer 503 when the gateway is not configured.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    invoice::InvoiceWithStatus,
    subscription::Subscription,
};
use serde::{Deserialize, Serialize};
use services::services::{
    billing::ChargeResult,
    payment_gateway::{Balance, BillingType},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ChargeRequest {
    pub billing_type: BillingType,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PixCode {
    pub payload: String,
}

/// Charge an invoice at the payment provider, splitting installments
pub async fn charge_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<ChargeRequest>,
) -> Result<ResponseJson<ApiResponse<ChargeResult>>, ApiError> {
    let result = deployment
        .billing()?
        .charge_invoice(id, payload.billing_type)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

/// Refresh an invoice's status from the payment provider
pub async fn sync_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithStatus>>, ApiError> {
    let invoice = deployment.billing()?.sync_invoice(id).await?;
    Ok(ResponseJson(ApiResponse::success(
        invoice.with_status(utils::date::today()),
    )))
}

/// PIX copy-and-paste code for a charged invoice
pub async fn pix_code(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PixCode>>, ApiError> {
    let payload = deployment.billing()?.pix_code(id).await?;
    Ok(ResponseJson(ApiResponse::success(PixCode { payload })))
}

/// Current account balance at the payment provider
pub async fn balance(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Balance>>, ApiError> {
    let balance = deployment.billing()?.balance().await?;
    Ok(ResponseJson(ApiResponse::success(balance)))
}

/// Register a subscription as a recurring charge
pub async fn activate_subscription(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<ChargeRequest>,
) -> Result<ResponseJson<ApiResponse<Subscription>>, ApiError> {
    let subscription = deployment
        .billing()?
        .activate_subscription(id, payload.billing_type, utils::date::today())
        .await?;
    Ok(ResponseJson(ApiResponse::success(subscription)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/invoices/{id}/charge", post(charge_invoice))
        .route("/invoices/{id}/sync", post(sync_invoice))
        .route("/invoices/{id}/pix", get(pix_code))
        .route("/subscriptions/{id}/activate", post(activate_subscription))
        .route("/billing/balance", get(balance))
}
