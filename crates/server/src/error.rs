use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::validation::ValidationError;
use services::services::{
    billing::BillingError, contracts::ContractError, coupons::CouponError, crm::CrmError,
    esign::ESignError, installments::InstallmentError, nutrition::NutritionError,
    payment_gateway::PaymentGatewayError, storage::StorageError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    Nutrition(#[from] NutritionError),
    #[error(transparent)]
    Installment(#[from] InstallmentError),
    #[error(transparent)]
    PaymentGateway(#[from] PaymentGatewayError),
    #[error(transparent)]
    ESign(#[from] ESignError),
    #[error(transparent)]
    Crm(#[from] CrmError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0} integration is not configured")]
    NotConfigured(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Installment(_)
            | ApiError::BadRequest(_)
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PaymentGateway(_) | ApiError::ESign(_) | ApiError::Crm(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Coupon(e) => match e {
                CouponError::NotFound(_) => StatusCode::NOT_FOUND,
                CouponError::NotRedeemable { .. } => StatusCode::BAD_REQUEST,
                CouponError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Nutrition(e) => match e {
                NutritionError::MealNotFound => StatusCode::NOT_FOUND,
                NutritionError::InvalidPeriod { .. } => StatusCode::BAD_REQUEST,
                NutritionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Storage(e) => match e {
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Billing(e) => match e {
                BillingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BillingError::Gateway(_) => StatusCode::BAD_GATEWAY,
                BillingError::Coupon(CouponError::Database(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                BillingError::Coupon(CouponError::NotFound(_))
                | BillingError::InvoiceNotFound
                | BillingError::SubscriptionNotFound
                | BillingError::ChildNotFound => StatusCode::NOT_FOUND,
                BillingError::AlreadyCharged
                | BillingError::NotCharged
                | BillingError::NotChargeable(_) => StatusCode::CONFLICT,
                BillingError::Validation(_)
                | BillingError::Installment(_)
                | BillingError::Coupon(CouponError::NotRedeemable { .. }) => {
                    StatusCode::BAD_REQUEST
                }
            },
            ApiError::Contract(e) => match e {
                ContractError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ContractError::ESign(_) => StatusCode::BAD_GATEWAY,
                ContractError::Validation(_) => StatusCode::BAD_REQUEST,
                ContractError::NotFound | ContractError::ChildNotFound => StatusCode::NOT_FOUND,
                ContractError::NotDraft(_) | ContractError::NotSent => StatusCode::CONFLICT,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "API error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        // Internal failures are logged in full and reported generically
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Erro interno do servidor".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
