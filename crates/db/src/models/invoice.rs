use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, in_range, non_negative, require};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

/// Status shown to users: a pending invoice past its due date is overdue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceDisplayStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceDisplayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceDisplayStatus::Pending => "Pendente",
            InvoiceDisplayStatus::Paid => "Pago",
            InvoiceDisplayStatus::Overdue => "Vencido",
            InvoiceDisplayStatus::Cancelled => "Cancelado",
        }
    }
}

pub const MAX_INSTALLMENTS: u32 = 12;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Invoice {
    pub id: Uuid,
    pub child_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub coupon_id: Option<Uuid>,
    pub discount_amount: f64,
    pub installment_count: i64,
    pub payment_id: Option<String>, // Provider payment id
    pub invoice_url: Option<String>,
    pub pix_payload: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InvoiceWithStatus {
    #[serde(flatten)]
    #[ts(flatten)]
    pub invoice: Invoice,
    pub display_status: InvoiceDisplayStatus,
    pub status_label: String,
    pub amount_due: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateInvoice {
    pub child_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub coupon_code: Option<String>,
    pub installment_count: Option<i64>,
}

impl CreateInvoice {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("descrição", &self.description)?;
        non_negative("valor", self.amount)?;
        if let Some(count) = self.installment_count {
            in_range("parcelas", count as f64, 1.0, f64::from(MAX_INSTALLMENTS))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateInvoice {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

/// Filter for invoice listings
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct InvoiceFilter {
    pub child_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InvoiceInstallment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub number: i64,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub payment_id: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn display_status(&self, today: NaiveDate) -> InvoiceDisplayStatus {
        match self.status {
            InvoiceStatus::Paid => InvoiceDisplayStatus::Paid,
            InvoiceStatus::Cancelled => InvoiceDisplayStatus::Cancelled,
            InvoiceStatus::Pending if self.due_date < today => InvoiceDisplayStatus::Overdue,
            InvoiceStatus::Pending => InvoiceDisplayStatus::Pending,
        }
    }

    pub fn amount_due(&self) -> f64 {
        utils::date::round_cents((self.amount - self.discount_amount).max(0.0))
    }

    pub fn with_status(self, today: NaiveDate) -> InvoiceWithStatus {
        let display_status = self.display_status(today);
        let amount_due = self.amount_due();
        InvoiceWithStatus {
            invoice: self,
            display_status,
            status_label: display_status.label().to_string(),
            amount_due,
        }
    }

    pub async fn find_filtered(
        pool: &SqlitePool,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices
               WHERE ($1 IS NULL OR child_id = $1)
                 AND ($2 IS NULL OR status = $2)
               ORDER BY due_date DESC"#,
        )
        .bind(filter.child_id)
        .bind(filter.status)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(r#"SELECT * FROM invoices WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_payment_id(
        pool: &SqlitePool,
        payment_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(r#"SELECT * FROM invoices WHERE payment_id = $1"#)
            .bind(payment_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateInvoice,
        coupon_id: Option<Uuid>,
        discount_amount: f64,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"INSERT INTO invoices (id, child_id, description, amount, due_date, coupon_id, discount_amount, installment_count)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.child_id)
        .bind(&data.description)
        .bind(data.amount)
        .bind(data.due_date)
        .bind(coupon_id)
        .bind(discount_amount)
        .bind(data.installment_count.unwrap_or(1))
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateInvoice,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET description = $2, amount = $3, due_date = $4, status = $5,
                   paid_at = CASE WHEN $5 = 'paid' THEN COALESCE(paid_at, datetime('now', 'subsec')) ELSE NULL END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.description)
        .bind(data.amount)
        .bind(data.due_date)
        .bind(data.status)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: InvoiceStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET status = $2,
                   paid_at = CASE WHEN $2 = 'paid' THEN COALESCE(paid_at, datetime('now', 'subsec')) ELSE NULL END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Mirror the provider charge onto the invoice row.
    pub async fn set_payment_mirror(
        pool: &SqlitePool,
        id: Uuid,
        payment_id: &str,
        invoice_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE invoices SET payment_id = $2, invoice_url = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(invoice_url)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_pix_payload(
        pool: &SqlitePool,
        id: Uuid,
        pix_payload: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE invoices SET pix_payload = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(pix_payload)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Sum of amounts still due on pending invoices.
    pub async fn sum_pending(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(MAX(amount - discount_amount, 0)), 0.0)
               FROM invoices WHERE status = 'pending'"#,
        )
        .fetch_one(pool)
        .await
    }

    /// `(paid, non_cancelled)` invoice counts, the inputs of the acceptance ratio.
    pub async fn payment_counts(pool: &SqlitePool) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT
                   COALESCE(SUM(CASE WHEN status = 'paid' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN status != 'cancelled' THEN 1 ELSE 0 END), 0)
               FROM invoices"#,
        )
        .fetch_one(pool)
        .await
    }
}

impl InvoiceInstallment {
    pub async fn create(
        pool: &SqlitePool,
        invoice_id: Uuid,
        number: i64,
        amount: f64,
        due_date: NaiveDate,
        payment_id: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, InvoiceInstallment>(
            r#"INSERT INTO invoice_installments (id, invoice_id, number, amount, due_date, payment_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(number)
        .bind(amount)
        .bind(due_date)
        .bind(payment_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_invoice_id(
        pool: &SqlitePool,
        invoice_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InvoiceInstallment>(
            r#"SELECT * FROM invoice_installments WHERE invoice_id = $1 ORDER BY number ASC"#,
        )
        .bind(invoice_id)
        .fetch_all(pool)
        .await
    }

    pub async fn link_payment(
        pool: &SqlitePool,
        id: Uuid,
        payment_id: &str,
        status: InvoiceStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invoice_installments SET payment_id = $2, status = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(payment_id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_status_by_payment_id(
        pool: &SqlitePool,
        payment_id: &str,
        status: InvoiceStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE invoice_installments SET status = $2 WHERE payment_id = $1")
            .bind(payment_id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::child::{Child, tests::sample_child},
    };

    fn invoice(status: InvoiceStatus, due_date: NaiveDate) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            description: "Mensalidade março".into(),
            amount: 1500.0,
            due_date,
            status,
            coupon_id: None,
            discount_amount: 150.0,
            installment_count: 1,
            payment_id: None,
            invoice_url: None,
            pix_payload: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overdue_is_derived_from_due_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            invoice(InvoiceStatus::Pending, yesterday).display_status(today),
            InvoiceDisplayStatus::Overdue
        );
        assert_eq!(
            invoice(InvoiceStatus::Pending, today).display_status(today),
            InvoiceDisplayStatus::Pending
        );
        assert_eq!(
            invoice(InvoiceStatus::Paid, yesterday).display_status(today),
            InvoiceDisplayStatus::Paid
        );
        let with_status = invoice(InvoiceStatus::Pending, yesterday).with_status(today);
        assert_eq!(with_status.status_label, "Vencido");
        assert_eq!(with_status.amount_due, 1350.0);
    }

    #[tokio::test]
    async fn test_aggregates_for_forecast() {
        let db = DBService::new_in_memory().await.unwrap();
        let child_id = Uuid::new_v4();
        Child::create(&db.pool, &sample_child("Bia"), child_id)
            .await
            .unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let mut ids = Vec::new();
        for amount in [1000.0, 800.0, 600.0] {
            let data = CreateInvoice {
                child_id,
                description: "Mensalidade".into(),
                amount,
                due_date: due,
                coupon_code: None,
                installment_count: None,
            };
            let created = Invoice::create(&db.pool, &data, None, 0.0, Uuid::new_v4())
                .await
                .unwrap();
            ids.push(created.id);
        }
        let paid = Invoice::update_status(&db.pool, ids[0], InvoiceStatus::Paid)
            .await
            .unwrap()
            .unwrap();
        assert!(paid.paid_at.is_some());
        Invoice::update_status(&db.pool, ids[1], InvoiceStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(Invoice::sum_pending(&db.pool).await.unwrap(), 600.0);
        assert_eq!(Invoice::payment_counts(&db.pool).await.unwrap(), (1, 2));

        let pending = Invoice::find_filtered(
            &db.pool,
            &InvoiceFilter {
                child_id: Some(child_id),
                status: Some(InvoiceStatus::Pending),
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
