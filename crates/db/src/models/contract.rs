use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, non_negative, require};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Draft,
    Sent,
    Signed,
    Refused,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Contract {
    pub id: Uuid,
    pub child_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub monthly_fee: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub document_token: Option<String>, // E-signature provider document id
    pub sign_url: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateContract {
    pub child_id: Uuid,
    pub title: String,
    pub monthly_fee: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl CreateContract {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("título", &self.title)?;
        non_negative("mensalidade", self.monthly_fee)?;
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err(ValidationError::Invalid(
                "término anterior ao início do contrato".to_string(),
            ));
        }
        Ok(())
    }
}

impl Contract {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(r#"SELECT * FROM contracts ORDER BY created_at DESC"#)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(r#"SELECT * FROM contracts WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_document_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(r#"SELECT * FROM contracts WHERE document_token = $1"#)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateContract,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"INSERT INTO contracts (id, child_id, title, monthly_fee, start_date, end_date)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.child_id)
        .bind(&data.title)
        .bind(data.monthly_fee)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(pool)
        .await
    }

    /// Record the document sent for signature.
    pub async fn mark_sent(
        pool: &SqlitePool,
        id: Uuid,
        body: &str,
        document_token: &str,
        sign_url: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"UPDATE contracts
               SET body = $2, document_token = $3, sign_url = $4, status = 'sent',
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(body)
        .bind(document_token)
        .bind(sign_url)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ContractStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contract>(
            r#"UPDATE contracts
               SET status = $2,
                   signed_at = CASE WHEN $2 = 'signed' THEN COALESCE(signed_at, datetime('now', 'subsec')) ELSE signed_at END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
