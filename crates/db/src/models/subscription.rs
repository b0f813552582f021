use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, in_range, non_negative, require};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Cancelled,
}

/// Recurring monthly charge for a child
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Subscription {
    pub id: Uuid,
    pub child_id: Uuid,
    pub description: String,
    pub value: f64,
    pub billing_day: i64,
    pub status: SubscriptionStatus,
    pub provider_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSubscription {
    pub child_id: Uuid,
    pub description: String,
    pub value: f64,
    pub billing_day: i64,
}

impl CreateSubscription {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("descrição", &self.description)?;
        non_negative("valor", self.value)?;
        in_range("dia de cobrança", self.billing_day as f64, 1.0, 28.0)
    }
}

impl Subscription {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(r#"SELECT * FROM subscriptions ORDER BY created_at DESC"#)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_child_id(
        pool: &SqlitePool,
        child_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"SELECT * FROM subscriptions WHERE child_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(child_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(r#"SELECT * FROM subscriptions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateSubscription,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"INSERT INTO subscriptions (id, child_id, description, value, billing_day)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.child_id)
        .bind(&data.description)
        .bind(data.value)
        .bind(data.billing_day)
        .fetch_one(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"UPDATE subscriptions SET status = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_provider_subscription_id(
        pool: &SqlitePool,
        id: Uuid,
        provider_subscription_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE subscriptions SET provider_subscription_id = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(provider_subscription_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Monthly recurring revenue of active subscriptions.
    pub async fn sum_active_value(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(value), 0.0) FROM subscriptions WHERE status = 'active'"#,
        )
        .fetch_one(pool)
        .await
    }
}
