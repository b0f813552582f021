use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, non_negative, require};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct EmployeeProfile {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub role: String,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub hired_at: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEmployeeProfile {
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub role: String,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub hired_at: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl CreateEmployeeProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("nome", &self.full_name)?;
        require("cargo", &self.role)?;
        non_negative("salário bruto", self.gross_salary)?;
        non_negative("salário líquido", self.net_salary)?;
        if self.net_salary > self.gross_salary {
            return Err(ValidationError::Invalid(
                "salário líquido maior que o bruto".to_string(),
            ));
        }
        Ok(())
    }
}

impl EmployeeProfile {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeProfile>(
            r#"SELECT * FROM employee_profiles ORDER BY full_name ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeProfile>(r#"SELECT * FROM employee_profiles WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateEmployeeProfile,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EmployeeProfile>(
            r#"INSERT INTO employee_profiles (id, user_id, full_name, role, gross_salary, net_salary, hired_at, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(&data.full_name)
        .bind(&data.role)
        .bind(data.gross_salary)
        .bind(data.net_salary)
        .bind(data.hired_at)
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateEmployeeProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeProfile>(
            r#"UPDATE employee_profiles
               SET user_id = $2, full_name = $3, role = $4, gross_salary = $5, net_salary = $6,
                   hired_at = $7, is_active = COALESCE($8, is_active),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(&data.full_name)
        .bind(&data.role)
        .bind(data.gross_salary)
        .bind(data.net_salary)
        .bind(data.hired_at)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM employee_profiles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Monthly payroll cost of active employees.
    pub async fn sum_active_net_salaries(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(net_salary), 0.0) FROM employee_profiles WHERE is_active = 1"#,
        )
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::fixed_expense::{CreateFixedExpense, FixedExpense},
    };

    #[tokio::test]
    async fn test_cost_aggregates_skip_inactive_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        for (name, net, active) in [("Ana", 2500.0, true), ("Bruno", 1800.0, false)] {
            let data = CreateEmployeeProfile {
                user_id: None,
                full_name: name.into(),
                role: "Professora".into(),
                gross_salary: 3000.0,
                net_salary: net,
                hired_at: None,
                is_active: Some(active),
            };
            EmployeeProfile::create(&db.pool, &data, Uuid::new_v4())
                .await
                .unwrap();
        }
        let rent = FixedExpense::create(
            &db.pool,
            &CreateFixedExpense {
                description: "Aluguel".into(),
                category: Some("Infraestrutura".into()),
                amount: 4000.0,
                is_active: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        FixedExpense::create(
            &db.pool,
            &CreateFixedExpense {
                description: "Internet".into(),
                category: None,
                amount: 150.0,
                is_active: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        FixedExpense::set_active(&db.pool, rent.id, false).await.unwrap();

        assert_eq!(
            EmployeeProfile::sum_active_net_salaries(&db.pool).await.unwrap(),
            2500.0
        );
        assert_eq!(FixedExpense::sum_active(&db.pool).await.unwrap(), 150.0);
    }

    #[test]
    fn test_net_above_gross_rejected() {
        let data = CreateEmployeeProfile {
            user_id: None,
            full_name: "Carla".into(),
            role: "Cozinheira".into(),
            gross_salary: 2000.0,
            net_salary: 2100.0,
            hired_at: None,
            is_active: None,
        };
        assert!(data.validate().is_err());
    }
}
