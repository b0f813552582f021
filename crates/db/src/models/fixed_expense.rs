use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, non_negative, require};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FixedExpense {
    pub id: Uuid,
    pub description: String,
    pub category: Option<String>,
    pub amount: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFixedExpense {
    pub description: String,
    pub category: Option<String>,
    pub amount: f64,
    pub is_active: Option<bool>,
}

impl CreateFixedExpense {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("descrição", &self.description)?;
        non_negative("valor", self.amount)
    }
}

impl FixedExpense {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FixedExpense>(
            r#"SELECT * FROM fixed_expenses ORDER BY is_active DESC, description ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FixedExpense>(r#"SELECT * FROM fixed_expenses WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateFixedExpense,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FixedExpense>(
            r#"INSERT INTO fixed_expenses (id, description, category, amount, is_active)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.amount)
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateFixedExpense,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FixedExpense>(
            r#"UPDATE fixed_expenses
               SET description = $2, category = $3, amount = $4, is_active = COALESCE($5, is_active),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.amount)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FixedExpense>(
            r#"UPDATE fixed_expenses SET is_active = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM fixed_expenses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn sum_active(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(amount), 0.0) FROM fixed_expenses WHERE is_active = 1"#,
        )
        .fetch_one(pool)
        .await
    }
}
