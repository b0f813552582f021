use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::announcement::{Announcement, Audience, CreateAnnouncement};
use serde::Deserialize;
use services::services::events::ChangeKind;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

const TABLE: &str = "announcements";

#[derive(Debug, Deserialize)]
pub struct AudienceQuery {
    pub audience: Option<Audience>,
}

#[derive(Debug, Deserialize)]
pub struct SetPinned {
    pub pinned: bool,
}

/// List announcements, pinned first
pub async fn list_announcements(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<AudienceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Announcement>>>, ApiError> {
    let announcements =
        Announcement::find_for_audience(&deployment.db().pool, query.audience).await?;
    Ok(ResponseJson(ApiResponse::success(announcements)))
}

/// Get a single announcement
pub async fn get_announcement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Announcement>>, ApiError> {
    let announcement = Announcement::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("announcement"))?;
    Ok(ResponseJson(ApiResponse::success(announcement)))
}

/// Publish an announcement
pub async fn create_announcement(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateAnnouncement>,
) -> Result<ResponseJson<ApiResponse<Announcement>>, ApiError> {
    payload.validate()?;
    let announcement =
        Announcement::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    deployment
        .events()
        .publish(TABLE, ChangeKind::Insert, announcement.id, &announcement);
    Ok(ResponseJson(ApiResponse::success(announcement)))
}

/// Edit an announcement
pub async fn update_announcement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateAnnouncement>,
) -> Result<ResponseJson<ApiResponse<Announcement>>, ApiError> {
    payload.validate()?;
    let announcement = Announcement::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("announcement"))?;
    deployment
        .events()
        .publish(TABLE, ChangeKind::Update, announcement.id, &announcement);
    Ok(ResponseJson(ApiResponse::success(announcement)))
}

/// Pin or unpin an announcement
pub async fn set_pinned(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetPinned>,
) -> Result<ResponseJson<ApiResponse<Announcement>>, ApiError> {
    let announcement = Announcement::set_pinned(&deployment.db().pool, id, payload.pinned)
        .await?
        .ok_or(ApiError::NotFound("announcement"))?;
    deployment
        .events()
        .publish(TABLE, ChangeKind::Update, announcement.id, &announcement);
    Ok(ResponseJson(ApiResponse::success(announcement)))
}

/// Delete an announcement
pub async fn delete_announcement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Announcement::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("announcement"));
    }
    deployment
        .events()
        .publish(TABLE, ChangeKind::Delete, id, &serde_json::json!({ "id": id }));
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/announcements",
        Router::new()
            .route("/", get(list_announcements).post(create_announcement))
            .route(
                "/{id}",
                get(get_announcement)
                    .put(update_announcement)
                    .delete(delete_announcement),
            )
            .route("/{id}/pin", post(set_pinned)),
    )
}
