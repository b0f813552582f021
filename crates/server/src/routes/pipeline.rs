use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::Deserialize;
use services::services::crm::{KanbanBoard, Opportunity, Pipeline};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct MoveOpportunity {
    pub stage_id: String,
}

/// Pipelines available at the CRM
pub async fn list_pipelines(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Pipeline>>>, ApiError> {
    let pipelines = deployment.pipeline()?.pipelines().await?;
    Ok(ResponseJson(ApiResponse::success(pipelines)))
}

/// Kanban board of a CRM pipeline
pub async fn get_board(
    State(deployment): State<DeploymentImpl>,
    Path(pipeline_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<KanbanBoard>>, ApiError> {
    let board = deployment.pipeline()?.board(&pipeline_id).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// Move an opportunity to another stage
pub async fn move_opportunity(
    State(deployment): State<DeploymentImpl>,
    Path(opportunity_id): Path<String>,
    axum::Json(payload): axum::Json<MoveOpportunity>,
) -> Result<ResponseJson<ApiResponse<Opportunity>>, ApiError> {
    let moved = deployment
        .pipeline()?
        .move_opportunity(&opportunity_id, &payload.stage_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(moved)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/pipeline",
        Router::new()
            .route("/", get(list_pipelines))
            .route("/{pipeline_id}/board", get(get_board))
            .route("/opportunities/{opportunity_id}/move", post(move_opportunity)),
    )
}
