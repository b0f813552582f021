use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::fixed_expense::{CreateFixedExpense, FixedExpense};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub is_active: bool,
}

/// List fixed expenses, active first
pub async fn list_expenses(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<FixedExpense>>>, ApiError> {
    let expenses = FixedExpense::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(expenses)))
}

/// Create a fixed expense
pub async fn create_expense(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateFixedExpense>,
) -> Result<ResponseJson<ApiResponse<FixedExpense>>, ApiError> {
    payload.validate()?;
    let expense = FixedExpense::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

/// Update a fixed expense
pub async fn update_expense(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateFixedExpense>,
) -> Result<ResponseJson<ApiResponse<FixedExpense>>, ApiError> {
    payload.validate()?;
    let expense = FixedExpense::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("fixed expense"))?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

/// Activate or deactivate a fixed expense
pub async fn set_expense_active(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetActive>,
) -> Result<ResponseJson<ApiResponse<FixedExpense>>, ApiError> {
    let expense = FixedExpense::set_active(&deployment.db().pool, id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("fixed expense"))?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

/// Delete a fixed expense
pub async fn delete_expense(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if FixedExpense::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("fixed expense"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/expenses",
        Router::new()
            .route("/", get(list_expenses).post(create_expense))
            .route("/{id}", put(update_expense).delete(delete_expense))
            .route("/{id}/active", post(set_expense_active)),
    )
}
