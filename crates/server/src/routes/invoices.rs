use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use db::models::{
    invoice::{
        CreateInvoice, Invoice, InvoiceFilter, InvoiceInstallment, InvoiceStatus,
        InvoiceWithStatus, UpdateInvoice,
    },
    validation::{non_negative, require},
};
use serde::{Deserialize, Serialize};
use services::services::{
    billing::BillingService,
    installments::{self, InstallmentPlan},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InvoiceDetail {
    pub invoice: InvoiceWithStatus,
    pub installments: Vec<InvoiceInstallment>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatus {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize, TS)]
pub struct InstallmentPreviewRequest {
    pub amount: f64,
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
}

/// List invoices, optionally filtered by status
pub async fn list_invoices(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<InvoiceWithStatus>>>, ApiError> {
    let today = utils::date::today();
    let invoices = Invoice::find_filtered(&deployment.db().pool, &filter)
        .await?
        .into_iter()
        .map(|i| i.with_status(today))
        .collect();
    Ok(ResponseJson(ApiResponse::success(invoices)))
}

/// Invoice with its installments and display status
pub async fn get_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InvoiceDetail>>, ApiError> {
    let pool = &deployment.db().pool;
    let invoice = Invoice::find_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("invoice"))?;
    let installments = InvoiceInstallment::find_by_invoice_id(pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(InvoiceDetail {
        invoice: invoice.with_status(utils::date::today()),
        installments,
    })))
}

/// Local invoice; a coupon code is redeemed here, before any provider charge.
pub async fn create_invoice(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateInvoice>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithStatus>>, ApiError> {
    let invoice = BillingService::create_invoice(&deployment.db().pool, &payload, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(
        invoice.with_status(utils::date::today()),
    )))
}

/// Edit an invoice
pub async fn update_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateInvoice>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithStatus>>, ApiError> {
    require("descrição", &payload.description)?;
    non_negative("valor", payload.amount)?;
    let invoice = Invoice::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("invoice"))?;
    Ok(ResponseJson(ApiResponse::success(
        invoice.with_status(utils::date::today()),
    )))
}

/// Manually mark an invoice paid, pending or cancelled
pub async fn set_invoice_status(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetStatus>,
) -> Result<ResponseJson<ApiResponse<InvoiceWithStatus>>, ApiError> {
    let invoice = Invoice::update_status(&deployment.db().pool, id, payload.status)
        .await?
        .ok_or(ApiError::NotFound("invoice"))?;
    tracing::info!(invoice_id = %id, status = %payload.status, "Invoice status set manually");
    Ok(ResponseJson(ApiResponse::success(
        invoice.with_status(utils::date::today()),
    )))
}

/// Delete an invoice
pub async fn delete_invoice(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Invoice::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("invoice"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Installment split for an amount, without saving anything
pub async fn preview_installments(
    axum::Json(payload): axum::Json<InstallmentPreviewRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<InstallmentPlan>>>, ApiError> {
    let plan = installments::split(
        payload.amount,
        payload.installment_count,
        payload.first_due_date,
    )?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/invoices",
        Router::new()
            .route("/", get(list_invoices).post(create_invoice))
            .route("/installments/preview", post(preview_installments))
            .route(
                "/{id}",
                get(get_invoice).put(update_invoice).delete(delete_invoice),
            )
            .route("/{id}/status", post(set_invoice_status)),
    )
}
