use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, in_range, non_negative, require};

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "discount_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Derived coupon status, never stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CouponStatus {
    Inactive,
    Expired,
    Scheduled,
    Exhausted,
    Active,
}

impl CouponStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CouponStatus::Inactive => "Inativo",
            CouponStatus::Expired => "Expirado",
            CouponStatus::Scheduled => "Agendado",
            CouponStatus::Exhausted => "Esgotado",
            CouponStatus::Active => "Ativo",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DiscountCoupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CouponWithStatus {
    #[serde(flatten)]
    #[ts(flatten)]
    pub coupon: DiscountCoupon,
    pub status: CouponStatus,
    pub status_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDiscountCoupon {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub is_active: Option<bool>,
}

impl CreateDiscountCoupon {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("código", &self.code)?;
        match self.discount_type {
            DiscountType::Percentage => in_range("percentual", self.discount_value, 0.0, 100.0)?,
            DiscountType::Fixed => non_negative("valor do desconto", self.discount_value)?,
        }
        if let Some(max_uses) = self.max_uses {
            in_range("limite de usos", max_uses as f64, 1.0, f64::MAX)?;
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until < from {
                return Err(ValidationError::Invalid(
                    "validade final anterior à inicial".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl DiscountCoupon {
    /// Status precedence: inactive, expired, scheduled, exhausted, active.
    pub fn status_at(&self, now: DateTime<Utc>) -> CouponStatus {
        if !self.is_active {
            return CouponStatus::Inactive;
        }
        if self.valid_until.is_some_and(|until| until < now) {
            return CouponStatus::Expired;
        }
        if self.valid_from.is_some_and(|from| from > now) {
            return CouponStatus::Scheduled;
        }
        if self.max_uses.is_some_and(|max| self.current_uses >= max) {
            return CouponStatus::Exhausted;
        }
        CouponStatus::Active
    }

    pub fn with_status(self, now: DateTime<Utc>) -> CouponWithStatus {
        let status = self.status_at(now);
        CouponWithStatus {
            coupon: self,
            status,
            status_label: status.label().to_string(),
        }
    }

    /// Discount granted on `amount`, never larger than `amount`.
    pub fn discount_for(&self, amount: f64) -> f64 {
        let discount = match self.discount_type {
            DiscountType::Percentage => amount * self.discount_value.clamp(0.0, 100.0) / 100.0,
            DiscountType::Fixed => self.discount_value.max(0.0),
        };
        utils::date::round_cents(discount.min(amount))
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(
            r#"SELECT * FROM discount_coupons ORDER BY created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(r#"SELECT * FROM discount_coupons WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(
            r#"SELECT * FROM discount_coupons WHERE code = $1 COLLATE NOCASE"#,
        )
        .bind(code.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateDiscountCoupon,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(
            r#"INSERT INTO discount_coupons (id, code, description, discount_type, discount_value, valid_from, valid_until, max_uses, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.code.trim().to_uppercase())
        .bind(&data.description)
        .bind(data.discount_type)
        .bind(data.discount_value)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .bind(data.max_uses)
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateDiscountCoupon,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(
            r#"UPDATE discount_coupons
               SET code = $2, description = $3, discount_type = $4, discount_value = $5,
                   valid_from = $6, valid_until = $7, max_uses = $8,
                   is_active = COALESCE($9, is_active), updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.code.trim().to_uppercase())
        .bind(&data.description)
        .bind(data.discount_type)
        .bind(data.discount_value)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .bind(data.max_uses)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiscountCoupon>(
            r#"UPDATE discount_coupons SET is_active = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
    }

    /// Count one use; the guard keeps `current_uses` from passing `max_uses`.
    pub async fn increment_uses(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE discount_coupons
               SET current_uses = current_uses + 1, updated_at = datetime('now', 'subsec')
               WHERE id = $1 AND (max_uses IS NULL OR current_uses < max_uses)"#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM discount_coupons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::DBService;

    fn coupon(is_active: bool) -> DiscountCoupon {
        DiscountCoupon {
            id: Uuid::new_v4(),
            code: "MATRICULA10".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            current_uses: 0,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_inactive_wins_over_dates() {
        let now = Utc::now();
        let mut c = coupon(false);
        c.valid_until = Some(now - TimeDelta::days(3));
        c.valid_from = Some(now + TimeDelta::days(3));
        assert_eq!(c.status_at(now), CouponStatus::Inactive);
        assert_eq!(c.status_at(now).label(), "Inativo");
    }

    #[test]
    fn test_expired_when_valid_until_passed() {
        let now = Utc::now();
        let mut c = coupon(true);
        c.valid_until = Some(now - TimeDelta::hours(1));
        assert_eq!(c.status_at(now).label(), "Expirado");
    }

    #[test]
    fn test_exhausted_checked_after_expiry() {
        let now = Utc::now();
        let mut c = coupon(true);
        c.max_uses = Some(5);
        c.current_uses = 5;
        assert_eq!(c.status_at(now).label(), "Esgotado");

        c.valid_until = Some(now - TimeDelta::days(1));
        assert_eq!(c.status_at(now), CouponStatus::Expired);
    }

    #[test]
    fn test_scheduled_and_active() {
        let now = Utc::now();
        let mut c = coupon(true);
        assert_eq!(c.status_at(now), CouponStatus::Active);
        c.valid_from = Some(now + TimeDelta::days(2));
        assert_eq!(c.status_at(now).label(), "Agendado");
    }

    #[test]
    fn test_discount_is_capped() {
        let mut c = coupon(true);
        assert_eq!(c.discount_for(1200.0), 120.0);
        c.discount_type = DiscountType::Fixed;
        c.discount_value = 500.0;
        assert_eq!(c.discount_for(300.0), 300.0);
    }

    #[test]
    fn test_percentage_above_100_rejected() {
        let data = CreateDiscountCoupon {
            code: "X".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 120.0,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            is_active: None,
        };
        assert!(matches!(
            data.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_increment_stops_at_max_uses() {
        let db = DBService::new_in_memory().await.unwrap();
        let data = CreateDiscountCoupon {
            code: "irmaos".into(),
            description: Some("Desconto para irmãos".into()),
            discount_type: DiscountType::Fixed,
            discount_value: 50.0,
            valid_from: None,
            valid_until: None,
            max_uses: Some(1),
            is_active: None,
        };
        let created = DiscountCoupon::create(&db.pool, &data, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(created.code, "IRMAOS");

        assert!(DiscountCoupon::increment_uses(&db.pool, created.id).await.unwrap());
        assert!(!DiscountCoupon::increment_uses(&db.pool, created.id).await.unwrap());

        let found = DiscountCoupon::find_by_code(&db.pool, "Irmaos")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.current_uses, 1);
        assert_eq!(found.status_at(Utc::now()), CouponStatus::Exhausted);
    }
}
