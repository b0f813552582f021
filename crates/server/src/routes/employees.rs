use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::employee_profile::{CreateEmployeeProfile, EmployeeProfile};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// List employee profiles
pub async fn list_employees(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<EmployeeProfile>>>, ApiError> {
    let employees = EmployeeProfile::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(employees)))
}

/// Get a single employee profile
pub async fn get_employee(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<EmployeeProfile>>, ApiError> {
    let employee = EmployeeProfile::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    Ok(ResponseJson(ApiResponse::success(employee)))
}

/// Create an employee profile
pub async fn create_employee(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateEmployeeProfile>,
) -> Result<ResponseJson<ApiResponse<EmployeeProfile>>, ApiError> {
    payload.validate()?;
    let employee =
        EmployeeProfile::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(employee)))
}

/// Update an employee profile
pub async fn update_employee(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateEmployeeProfile>,
) -> Result<ResponseJson<ApiResponse<EmployeeProfile>>, ApiError> {
    payload.validate()?;
    let employee = EmployeeProfile::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("employee"))?;
    Ok(ResponseJson(ApiResponse::success(employee)))
}

/// Delete an employee profile
pub async fn delete_employee(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if EmployeeProfile::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("employee"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/employees",
        Router::new()
            .route("/", get(list_employees).post(create_employee))
            .route(
                "/{id}",
                get(get_employee).put(update_employee).delete(delete_employee),
            ),
    )
}
