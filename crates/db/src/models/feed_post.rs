use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::ValidationError;

/// Photo/caption post shown in the parents' feed
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FeedPost {
    pub id: Uuid,
    pub child_id: Option<Uuid>, // None means the whole creche
    pub author_id: Uuid,
    pub caption: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFeedPost {
    pub child_id: Option<Uuid>,
    pub author_id: Uuid,
    pub caption: Option<String>,
    pub media_url: Option<String>,
}

impl CreateFeedPost {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_caption = self.caption.as_deref().is_some_and(|c| !c.trim().is_empty());
        if !has_caption && self.media_url.is_none() {
            return Err(ValidationError::Required("legenda ou mídia"));
        }
        Ok(())
    }
}

impl FeedPost {
    /// Posts visible to a child's family: the child's own and creche-wide ones.
    pub async fn find_feed(
        pool: &SqlitePool,
        child_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FeedPost>(
            r#"SELECT * FROM feed_posts
               WHERE $1 IS NULL OR child_id = $1 OR child_id IS NULL
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(child_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateFeedPost,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FeedPost>(
            r#"INSERT INTO feed_posts (id, child_id, author_id, caption, media_url)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.child_id)
        .bind(data.author_id)
        .bind(&data.caption)
        .bind(&data.media_url)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM feed_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
