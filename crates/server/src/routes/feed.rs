use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::feed_post::{CreateFeedPost, FeedPost};
use serde::Deserialize;
use services::services::{events::ChangeKind, storage::StoredFile};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, routes::storage::read_upload};

const TABLE: &str = "feed_posts";

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub child_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Feed posts, newest first
pub async fn list_feed(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<FeedQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<FeedPost>>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let posts = FeedPost::find_feed(&deployment.db().pool, query.child_id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

/// Publish a feed post
pub async fn create_post(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateFeedPost>,
) -> Result<ResponseJson<ApiResponse<FeedPost>>, ApiError> {
    payload.validate()?;
    let post = FeedPost::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    deployment
        .events()
        .publish(TABLE, ChangeKind::Insert, post.id, &post);
    Ok(ResponseJson(ApiResponse::success(post)))
}

/// Upload media into the `feed-media` bucket; the returned URL goes into a post.
pub async fn upload_media(
    State(deployment): State<DeploymentImpl>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<StoredFile>>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let stored = deployment
        .storage()
        .upload("feed-media", &filename, &bytes)
        .await?;
    Ok(ResponseJson(ApiResponse::success(stored)))
}

/// Delete a feed post
pub async fn delete_post(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if FeedPost::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("feed post"));
    }
    deployment
        .events()
        .publish(TABLE, ChangeKind::Delete, id, &serde_json::json!({ "id": id }));
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/feed",
        Router::new()
            .route("/", get(list_feed).post(create_post))
            .route("/media", post(upload_media))
            .route("/{id}", delete(delete_post)),
    )
}
