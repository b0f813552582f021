use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::Utc;
use db::models::{
    coupon::{CouponWithStatus, CreateDiscountCoupon, DiscountCoupon},
    validation::non_negative,
};
use serde::Deserialize;
use services::services::coupons::{AppliedCoupon, CouponService};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, TS)]
pub struct CouponPreviewRequest {
    pub code: String,
    pub amount: f64,
}

/// List coupons with their derived status
pub async fn list_coupons(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<CouponWithStatus>>>, ApiError> {
    let now = Utc::now();
    let coupons = DiscountCoupon::find_all(&deployment.db().pool)
        .await?
        .into_iter()
        .map(|c| c.with_status(now))
        .collect();
    Ok(ResponseJson(ApiResponse::success(coupons)))
}

/// Get a single coupon with its derived status
pub async fn get_coupon(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CouponWithStatus>>, ApiError> {
    let coupon = DiscountCoupon::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("coupon"))?;
    Ok(ResponseJson(ApiResponse::success(coupon.with_status(Utc::now()))))
}

/// Create a coupon; codes are unique
pub async fn create_coupon(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateDiscountCoupon>,
) -> Result<ResponseJson<ApiResponse<CouponWithStatus>>, ApiError> {
    payload.validate()?;
    let pool = &deployment.db().pool;
    if DiscountCoupon::find_by_code(pool, &payload.code).await?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "coupon code {} already exists",
            payload.code.trim().to_uppercase()
        )));
    }
    let coupon = DiscountCoupon::create(pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(coupon.with_status(Utc::now()))))
}

/// Update a coupon
pub async fn update_coupon(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateDiscountCoupon>,
) -> Result<ResponseJson<ApiResponse<CouponWithStatus>>, ApiError> {
    payload.validate()?;
    let coupon = DiscountCoupon::update(&deployment.db().pool, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("coupon"))?;
    Ok(ResponseJson(ApiResponse::success(coupon.with_status(Utc::now()))))
}

/// Activate or deactivate a coupon
pub async fn set_coupon_active(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<SetActive>,
) -> Result<ResponseJson<ApiResponse<CouponWithStatus>>, ApiError> {
    let coupon = DiscountCoupon::set_active(&deployment.db().pool, id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("coupon"))?;
    Ok(ResponseJson(ApiResponse::success(coupon.with_status(Utc::now()))))
}

/// Delete a coupon
pub async fn delete_coupon(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if DiscountCoupon::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("coupon"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Price an amount with a coupon without consuming a use.
pub async fn preview_coupon(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CouponPreviewRequest>,
) -> Result<ResponseJson<ApiResponse<AppliedCoupon>>, ApiError> {
    non_negative("valor", payload.amount)?;
    let applied =
        CouponService::preview(&deployment.db().pool, &payload.code, payload.amount, Utc::now())
            .await?;
    Ok(ResponseJson(ApiResponse::success(applied)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/coupons",
        Router::new()
            .route("/", get(list_coupons).post(create_coupon))
            .route("/preview", post(preview_coupon))
            .route(
                "/{id}",
                get(get_coupon).put(update_coupon).delete(delete_coupon),
            )
            .route("/{id}/active", post(set_coupon_active)),
    )
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use db::models::coupon::DiscountType;

    use super::*;
    use crate::deployment::tests::test_deployment;

    #[tokio::test]
    async fn test_preview_rejects_negative_amount() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        DiscountCoupon::create(
            &deployment.db().pool,
            &CreateDiscountCoupon {
                code: "IRMAOS10".into(),
                description: None,
                discount_type: DiscountType::Percentage,
                discount_value: 10.0,
                valid_from: None,
                valid_until: None,
                max_uses: None,
                is_active: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let preview = |amount: f64| {
            preview_coupon(
                State(deployment.clone()),
                Json(CouponPreviewRequest {
                    code: "IRMAOS10".into(),
                    amount,
                }),
            )
        };
        assert!(matches!(
            preview(-100.0).await,
            Err(ApiError::Validation(_))
        ));

        let Json(response) = preview(800.0).await.unwrap();
        let applied = response.into_data().unwrap();
        assert_eq!(applied.discount_amount, 80.0);
        assert_eq!(applied.final_amount, 720.0);
    }
}
