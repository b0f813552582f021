use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::contract::{Contract, ContractStatus, CreateContract};
use serde::Deserialize;
use services::services::contracts::ContractService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SetStatus {
    pub status: ContractStatus,
}

/// List contracts
pub async fn list_contracts(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Contract>>>, ApiError> {
    let contracts = Contract::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(contracts)))
}

/// Get a single contract
pub async fn get_contract(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = Contract::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("contract"))?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// Create a draft contract
pub async fn create_contract(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateContract>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = ContractService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// Manual status change, e.g. cancelling a contract signed on paper.
pub async fn set_contract_status(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetStatus>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = Contract::update_status(&deployment.db().pool, id, payload.status)
        .await?
        .ok_or(ApiError::NotFound("contract"))?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// Delete a contract
pub async fn delete_contract(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Contract::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("contract"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Send a draft contract to the e-signature provider
pub async fn send_for_signature(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = deployment.contracts()?.send_for_signature(id).await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

/// Refresh a contract's signature status from the provider
pub async fn refresh_status(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Contract>>, ApiError> {
    let contract = deployment.contracts()?.refresh_status(id).await?;
    Ok(ResponseJson(ApiResponse::success(contract)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/contracts",
        Router::new()
            .route("/", get(list_contracts).post(create_contract))
            .route("/{id}", get(get_contract).delete(delete_contract))
            .route("/{id}/status", post(set_contract_status))
            .route("/{id}/send", post(send_for_signature))
            .route("/{id}/refresh", post(refresh_status)),
    )
}
