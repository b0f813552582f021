use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::message::{CreateMessage, Message};
use serde::{Deserialize, Serialize};
use services::services::events::ChangeKind;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

const DEFAULT_HISTORY: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub reader_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UnreadCount {
    pub unread: i64,
}

/// Messages exchanged about a child
pub async fn list_messages(
    State(deployment): State<DeploymentImpl>,
    Path(child_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Message>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, 500);
    let messages = Message::find_by_child_id(&deployment.db().pool, child_id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(messages)))
}

/// Send a message about a child
pub async fn send_message(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateMessage>,
) -> Result<ResponseJson<ApiResponse<Message>>, ApiError> {
    payload.validate()?;
    let message = Message::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    deployment
        .events()
        .publish("messages", ChangeKind::Insert, message.id, &message);
    Ok(ResponseJson(ApiResponse::success(message)))
}

/// Mark a message as read
pub async fn mark_read(
    State(deployment): State<DeploymentImpl>,
    Path(child_id): Path<Uuid>,
    Query(reader): Query<ReaderQuery>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let updated = Message::mark_read(&deployment.db().pool, child_id, reader.reader_id).await?;
    if updated > 0 {
        deployment.events().publish(
            "messages",
            ChangeKind::Update,
            child_id,
            &serde_json::json!({ "child_id": child_id, "read_by": reader.reader_id }),
        );
    }
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Messages about a child not yet read by the reader
pub async fn unread_count(
    State(deployment): State<DeploymentImpl>,
    Path(child_id): Path<Uuid>,
    Query(reader): Query<ReaderQuery>,
) -> Result<ResponseJson<ApiResponse<UnreadCount>>, ApiError> {
    let unread = Message::count_unread(&deployment.db().pool, child_id, reader.reader_id).await?;
    Ok(ResponseJson(ApiResponse::success(UnreadCount { unread })))
}

/// Delete a message
pub async fn delete_message(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Message::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("message"));
    }
    deployment.events().publish(
        "messages",
        ChangeKind::Delete,
        id,
        &serde_json::json!({ "id": id }),
    );
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/{id}", delete(delete_message))
        .nest(
            "/children/{id}/messages",
            Router::new()
                .route("/", get(list_messages))
                .route("/read", post(mark_read))
                .route("/unread", get(unread_count)),
        )
}
