use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, require};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "audience", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Audience {
    #[default]
    All,
    Parents,
    Staff,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub pinned: bool,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAnnouncement {
    pub title: String,
    pub body: String,
    pub audience: Option<Audience>,
    pub pinned: Option<bool>,
}

impl CreateAnnouncement {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("título", &self.title)?;
        require("texto", &self.body)
    }
}

impl Announcement {
    /// Pinned first, then newest; `audience` also matches announcements for everyone.
    pub async fn find_for_audience(
        pool: &SqlitePool,
        audience: Option<Audience>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements
               WHERE $1 IS NULL OR audience = $1 OR audience = 'all'
               ORDER BY pinned DESC, published_at DESC"#,
        )
        .bind(audience)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(r#"SELECT * FROM announcements WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateAnnouncement,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"INSERT INTO announcements (id, title, body, audience, pinned)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.body)
        .bind(data.audience.unwrap_or_default())
        .bind(data.pinned.unwrap_or(false))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateAnnouncement,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"UPDATE announcements
               SET title = $2, body = $3, audience = COALESCE($4, audience), pinned = COALESCE($5, pinned)
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.body)
        .bind(data.audience)
        .bind(data.pinned)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_pinned(
        pool: &SqlitePool,
        id: Uuid,
        pinned: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"UPDATE announcements SET pinned = $2 WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(pinned)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn test_audience_filter_includes_everyone_posts() {
        let db = DBService::new_in_memory().await.unwrap();
        for (title, audience, pinned) in [
            ("Festa junina", Audience::All, false),
            ("Reunião pedagógica", Audience::Staff, false),
            ("Vacinação", Audience::Parents, true),
        ] {
            let data = CreateAnnouncement {
                title: title.into(),
                body: "Detalhes no mural.".into(),
                audience: Some(audience),
                pinned: Some(pinned),
            };
            Announcement::create(&db.pool, &data, Uuid::new_v4())
                .await
                .unwrap();
        }

        let for_parents = Announcement::find_for_audience(&db.pool, Some(Audience::Parents))
            .await
            .unwrap();
        let titles: Vec<_> = for_parents.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Vacinação", "Festa junina"]);

        let all = Announcement::find_for_audience(&db.pool, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
