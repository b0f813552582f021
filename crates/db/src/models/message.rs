use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, require};

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "sender_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SenderRole {
    Parent,
    Staff,
    Admin,
}

/// Chat message between a child's guardians and the staff
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Message {
    pub id: Uuid,
    pub child_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMessage {
    pub child_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: SenderRole,
    pub content: String,
}

impl CreateMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("mensagem", &self.content)
    }
}

impl Message {
    pub async fn find_by_child_id(
        pool: &SqlitePool,
        child_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // Newest `limit` messages, returned oldest first for display
        sqlx::query_as::<_, Message>(
            r#"SELECT * FROM (
                   SELECT * FROM messages WHERE child_id = $1 ORDER BY created_at DESC LIMIT $2
               ) ORDER BY created_at ASC"#,
        )
        .bind(child_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMessage,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"INSERT INTO messages (id, child_id, sender_id, sender_role, content)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.child_id)
        .bind(data.sender_id)
        .bind(data.sender_role)
        .bind(data.content.trim())
        .fetch_one(pool)
        .await
    }

    /// Mark every unread message of `child_id` not sent by `reader_id` as read.
    pub async fn mark_read(
        pool: &SqlitePool,
        child_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE messages SET read_at = datetime('now', 'subsec')
               WHERE child_id = $1 AND sender_id != $2 AND read_at IS NULL"#,
        )
        .bind(child_id)
        .bind(reader_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unread(
        pool: &SqlitePool,
        child_id: Uuid,
        reader_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM messages
               WHERE child_id = $1 AND sender_id != $2 AND read_at IS NULL"#,
        )
        .bind(child_id)
        .bind(reader_id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
