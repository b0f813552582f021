use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::NaiveDate;
use db::models::{
    child::{Child, CreateChild},
    daily_record::DailyRecord,
    invoice::{Invoice, InvoiceFilter, InvoiceWithStatus},
    subscription::Subscription,
};
use serde::Deserialize;
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, routes::storage::read_upload};

#[derive(Debug, Deserialize)]
pub struct ChildListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub is_active: bool,
}

/// List children, optionally only active ones
pub async fn list_children(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ChildListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Child>>>, ApiError> {
    let pool = &deployment.db().pool;
    let children = if query.active_only {
        Child::find_active(pool).await?
    } else {
        Child::find_all(pool).await?
    };
    Ok(ResponseJson(ApiResponse::success(children)))
}

/// Get a single child
pub async fn get_child(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Child>>, ApiError> {
    let child = Child::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("child"))?;
    Ok(ResponseJson(ApiResponse::success(child)))
}

/// Register a child
pub async fn create_child(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateChild>,
) -> Result<ResponseJson<ApiResponse<Child>>, ApiError> {
    payload.validate()?;
    let child = Child::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    info!(child_id = %child.id, "Child enrolled");
    Ok(ResponseJson(ApiResponse::success(child)))
}

/// Update a child's registration
pub async fn update_child(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateChild>,
) -> Result<ResponseJson<ApiResponse<Child>>, ApiError> {
    payload.validate()?;
    let child = Child::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("child"))?;
    Ok(ResponseJson(ApiResponse::success(child)))
}

/// Activate or deactivate a child
pub async fn set_child_active(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetActive>,
) -> Result<ResponseJson<ApiResponse<Child>>, ApiError> {
    let child = Child::set_active(&deployment.db().pool, id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("child"))?;
    Ok(ResponseJson(ApiResponse::success(child)))
}

/// Delete a child and everything attached to it
pub async fn delete_child(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Child::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("child"));
    }
    info!(child_id = %id, "Child removed");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Multipart upload of the child's photo into the `child-photos` bucket.
pub async fn upload_child_photo(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Child>>, ApiError> {
    let pool = &deployment.db().pool;
    if Child::find_by_id(pool, id).await?.is_none() {
        return Err(ApiError::NotFound("child"));
    }
    let (filename, bytes) = read_upload(multipart).await?;
    let stored = deployment
        .storage()
        .upload("child-photos", &filename, &bytes)
        .await?;
    Child::set_photo_url(pool, id, &stored.public_url).await?;

    let child = Child::find_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("child"))?;
    Ok(ResponseJson(ApiResponse::success(child)))
}

/// Daily records of a child within a date range
pub async fn child_records(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Query(range): Query<RangeQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<DailyRecord>>>, ApiError> {
    if range.from > range.to {
        return Err(ApiError::BadRequest("from must not be after to".into()));
    }
    let records =
        DailyRecord::find_by_child_in_range(&deployment.db().pool, id, range.from, range.to)
            .await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

/// Invoices of a child with their display status
pub async fn child_invoices(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<InvoiceWithStatus>>>, ApiError> {
    let filter = InvoiceFilter {
        child_id: Some(id),
        status: None,
    };
    let today = utils::date::today();
    let invoices = Invoice::find_filtered(&deployment.db().pool, &filter)
        .await?
        .into_iter()
        .map(|i| i.with_status(today))
        .collect();
    Ok(ResponseJson(ApiResponse::success(invoices)))
}

/// Subscriptions of a child
pub async fn child_subscriptions(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Subscription>>>, ApiError> {
    let subscriptions = Subscription::find_by_child_id(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(subscriptions)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/children",
        Router::new()
            .route("/", get(list_children).post(create_child))
            .route(
                "/{id}",
                get(get_child).put(update_child).delete(delete_child),
            )
            .route("/{id}/active", post(set_child_active))
            .route("/{id}/photo", post(upload_child_photo))
            .route("/{id}/records", get(child_records))
            .route("/{id}/invoices", get(child_invoices))
            .route("/{id}/subscriptions", get(child_subscriptions)),
    )
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use chrono::NaiveTime;

    use super::*;
    use crate::deployment::tests::test_deployment;

    fn payload(name: &str) -> CreateChild {
        CreateChild {
            full_name: name.into(),
            birth_date: NaiveDate::from_ymd_opt(2023, 3, 14).unwrap(),
            classroom: Some("Berçário".into()),
            guardian_name: "Marcos Souza".into(),
            guardian_email: Some("marcos@example.com".into()),
            guardian_phone: None,
            guardian_document: None,
            photo_url: None,
            allergies: Some("lactose".into()),
            notes: None,
            expected_arrival: NaiveTime::from_hms_opt(8, 0, 0),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_child_lifecycle_through_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;

        let Json(created) = create_child(State(deployment.clone()), Json(payload("Théo Souza")))
            .await
            .unwrap();
        let child = created.into_data().unwrap();
        assert!(child.is_active);

        let Json(updated) = set_child_active(
            State(deployment.clone()),
            Path(child.id),
            Json(SetActive { is_active: false }),
        )
        .await
        .unwrap();
        assert!(!updated.into_data().unwrap().is_active);

        let Json(active) = list_children(
            State(deployment.clone()),
            Query(ChildListQuery { active_only: true }),
        )
        .await
        .unwrap();
        assert!(active.into_data().unwrap().is_empty());

        delete_child(State(deployment.clone()), Path(child.id))
            .await
            .unwrap();
        assert!(matches!(
            get_child(State(deployment), Path(child.id)).await,
            Err(ApiError::NotFound("child"))
        ));
    }

    #[tokio::test]
    async fn test_invalid_child_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        let result = create_child(State(deployment), Json(payload("  "))).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
