use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    child::Child,
    subscription::{CreateSubscription, Subscription, SubscriptionStatus},
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SetStatus {
    pub status: SubscriptionStatus,
}

/// List subscriptions
pub async fn list_subscriptions(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Subscription>>>, ApiError> {
    let subscriptions = Subscription::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(subscriptions)))
}

/// Get a single subscription
pub async fn get_subscription(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Subscription>>, ApiError> {
    let subscription = Subscription::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("subscription"))?;
    Ok(ResponseJson(ApiResponse::success(subscription)))
}

/// Create a subscription for a child
pub async fn create_subscription(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateSubscription>,
) -> Result<ResponseJson<ApiResponse<Subscription>>, ApiError> {
    payload.validate()?;
    let pool = &deployment.db().pool;
    if Child::find_by_id(pool, payload.child_id).await?.is_none() {
        return Err(ApiError::NotFound("child"));
    }
    let subscription = Subscription::create(pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(subscription)))
}

/// Change a subscription's status
pub async fn set_subscription_status(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetStatus>,
) -> Result<ResponseJson<ApiResponse<Subscription>>, ApiError> {
    let subscription = Subscription::update_status(&deployment.db().pool, id, payload.status)
        .await?
        .ok_or(ApiError::NotFound("subscription"))?;
    Ok(ResponseJson(ApiResponse::success(subscription)))
}

/// Delete a subscription
pub async fn delete_subscription(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Subscription::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("subscription"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/subscriptions",
        Router::new()
            .route("/", get(list_subscriptions).post(create_subscription))
            .route("/{id}", get(get_subscription).delete(delete_subscription))
            .route("/{id}/status", post(set_subscription_status)),
    )
}
