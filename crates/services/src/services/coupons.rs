//! Applying discount coupons to charges.

use chrono::{DateTime, Utc};
use db::models::coupon::{CouponStatus, DiscountCoupon};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("coupon {0} not found")]
    NotFound(String),
    #[error("coupon {code} cannot be used: {label}")]
    NotRedeemable { code: String, label: &'static str },
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount_amount: f64,
    pub final_amount: f64,
}

pub struct CouponService;

impl CouponService {
    /// Price `amount` with the coupon `code` without consuming a use.
    pub async fn preview(
        pool: &SqlitePool,
        code: &str,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let coupon = DiscountCoupon::find_by_code(pool, code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;

        let status = coupon.status_at(now);
        if status != CouponStatus::Active {
            return Err(CouponError::NotRedeemable {
                code: coupon.code,
                label: status.label(),
            });
        }

        let discount_amount = coupon.discount_for(amount);
        Ok(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            discount_amount,
            final_amount: utils::date::round_cents(amount - discount_amount),
        })
    }

    /// Price `amount` and count one use of the coupon.
    pub async fn redeem(
        pool: &SqlitePool,
        code: &str,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let applied = Self::preview(pool, code, amount, now).await?;
        // Another redemption may have taken the last use since the preview
        if !DiscountCoupon::increment_uses(pool, applied.coupon_id).await? {
            return Err(CouponError::NotRedeemable {
                code: applied.code,
                label: CouponStatus::Exhausted.label(),
            });
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use db::{
        DBService,
        models::coupon::{CreateDiscountCoupon, DiscountType},
    };

    use super::*;

    async fn seed(db: &DBService, code: &str, valid_until: Option<DateTime<Utc>>) {
        let data = CreateDiscountCoupon {
            code: code.into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 15.0,
            valid_from: None,
            valid_until,
            max_uses: Some(2),
            is_active: None,
        };
        DiscountCoupon::create(&db.pool, &data, Uuid::new_v4())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_redeem_until_exhausted() {
        let db = DBService::new_in_memory().await.unwrap();
        seed(&db, "VOLTA15", None).await;
        let now = Utc::now();

        let applied = CouponService::redeem(&db.pool, "volta15", 1000.0, now)
            .await
            .unwrap();
        assert_eq!(applied.discount_amount, 150.0);
        assert_eq!(applied.final_amount, 850.0);

        CouponService::redeem(&db.pool, "VOLTA15", 1000.0, now)
            .await
            .unwrap();
        let err = CouponService::redeem(&db.pool, "VOLTA15", 1000.0, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CouponError::NotRedeemable { label: "Esgotado", .. }));
    }

    #[tokio::test]
    async fn test_expired_coupon_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let now = Utc::now();
        seed(&db, "VERAO", Some(now - TimeDelta::days(1))).await;
        let err = CouponService::preview(&db.pool, "VERAO", 500.0, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CouponError::NotRedeemable { label: "Expirado", .. }));

        assert!(matches!(
            CouponService::preview(&db.pool, "NADA", 500.0, now).await,
            Err(CouponError::NotFound(_))
        ));
    }
}
