use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, require};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Child {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub classroom: Option<String>,
    pub guardian_name: String,
    pub guardian_email: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_document: Option<String>, // CPF, required by the payment provider
    pub photo_url: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
    pub expected_arrival: Option<NaiveTime>,
    pub payment_customer_id: Option<String>, // Mirror of the provider customer id
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateChild {
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub classroom: Option<String>,
    pub guardian_name: String,
    pub guardian_email: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_document: Option<String>,
    pub photo_url: Option<String>,
    pub allergies: Option<String>,
    pub notes: Option<String>,
    pub expected_arrival: Option<NaiveTime>,
    pub is_active: Option<bool>,
}

impl CreateChild {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("nome da criança", &self.full_name)?;
        require("nome do responsável", &self.guardian_name)?;
        if let Some(email) = self
            .guardian_email
            .as_deref()
            .filter(|e| !e.is_empty() && !e.contains('@'))
        {
            return Err(ValidationError::Invalid(format!("e-mail inválido: {email}")));
        }
        Ok(())
    }
}

impl Child {
    /// Age in whole months at `on`, used for classroom placement.
    pub fn age_in_months(&self, on: NaiveDate) -> i32 {
        use chrono::Datelike;
        let mut months = (on.year() - self.birth_date.year()) * 12
            + on.month() as i32
            - self.birth_date.month() as i32;
        if on.day() < self.birth_date.day() {
            months -= 1;
        }
        months.max(0)
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Child>(r#"SELECT * FROM children ORDER BY full_name ASC"#)
            .fetch_all(pool)
            .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Child>(
            r#"SELECT * FROM children WHERE is_active = 1 ORDER BY full_name ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Child>(r#"SELECT * FROM children WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateChild,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Child>(
            r#"INSERT INTO children (id, full_name, birth_date, classroom, guardian_name, guardian_email, guardian_phone, guardian_document, photo_url, allergies, notes, expected_arrival, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.full_name)
        .bind(data.birth_date)
        .bind(&data.classroom)
        .bind(&data.guardian_name)
        .bind(&data.guardian_email)
        .bind(&data.guardian_phone)
        .bind(&data.guardian_document)
        .bind(&data.photo_url)
        .bind(&data.allergies)
        .bind(&data.notes)
        .bind(data.expected_arrival)
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateChild,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Child>(
            r#"UPDATE children
               SET full_name = $2, birth_date = $3, classroom = $4, guardian_name = $5, guardian_email = $6,
                   guardian_phone = $7, guardian_document = $8, photo_url = $9, allergies = $10, notes = $11,
                   expected_arrival = $12, is_active = COALESCE($13, is_active),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.full_name)
        .bind(data.birth_date)
        .bind(&data.classroom)
        .bind(&data.guardian_name)
        .bind(&data.guardian_email)
        .bind(&data.guardian_phone)
        .bind(&data.guardian_document)
        .bind(&data.photo_url)
        .bind(&data.allergies)
        .bind(&data.notes)
        .bind(data.expected_arrival)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(
        pool: &SqlitePool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Child>(
            r#"UPDATE children SET is_active = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_photo_url(
        pool: &SqlitePool,
        id: Uuid,
        photo_url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE children SET photo_url = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(photo_url)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_payment_customer_id(
        pool: &SqlitePool,
        id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE children SET payment_customer_id = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::DBService;

    pub(crate) fn sample_child(name: &str) -> CreateChild {
        CreateChild {
            full_name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2022, 5, 20).unwrap(),
            classroom: Some("Berçário II".to_string()),
            guardian_name: "Maria Souza".to_string(),
            guardian_email: Some("maria@example.com".to_string()),
            guardian_phone: Some("+55 11 99999-0000".to_string()),
            guardian_document: Some("12345678909".to_string()),
            photo_url: None,
            allergies: None,
            notes: None,
            expected_arrival: NaiveTime::from_hms_opt(8, 0, 0),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_child_crud() {
        let db = DBService::new_in_memory().await.unwrap();
        let id = Uuid::new_v4();
        let child = Child::create(&db.pool, &sample_child("Lucas"), id).await.unwrap();
        assert_eq!(child.full_name, "Lucas");
        assert!(child.is_active);
        assert_eq!(child.expected_arrival, NaiveTime::from_hms_opt(8, 0, 0));

        let mut update = sample_child("Lucas Souza");
        update.allergies = Some("Lactose".to_string());
        let updated = Child::update(&db.pool, id, &update).await.unwrap().unwrap();
        assert_eq!(updated.full_name, "Lucas Souza");
        assert_eq!(updated.allergies.as_deref(), Some("Lactose"));

        let inactive = Child::set_active(&db.pool, id, false).await.unwrap().unwrap();
        assert!(!inactive.is_active);
        assert!(Child::find_active(&db.pool).await.unwrap().is_empty());

        assert_eq!(Child::delete(&db.pool, id).await.unwrap(), 1);
        assert!(Child::find_by_id(&db.pool, id).await.unwrap().is_none());
    }

    #[test]
    fn test_validate_rejects_missing_guardian() {
        let mut data = sample_child("Lucas");
        data.guardian_name = String::new();
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_age_in_months() {
        let child = Child {
            id: Uuid::new_v4(),
            full_name: "Ana".into(),
            birth_date: NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
            classroom: None,
            guardian_name: "João".into(),
            guardian_email: None,
            guardian_phone: None,
            guardian_document: None,
            photo_url: None,
            allergies: None,
            notes: None,
            expected_arrival: None,
            payment_customer_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(child.age_in_months(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()), 11);
        assert_eq!(child.age_in_months(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()), 12);
    }
}
