//! Splitting one charge into monthly installments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::date::{add_months, round_cents};

pub use db::models::invoice::MAX_INSTALLMENTS;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InstallmentError {
    #[error("installment count must be between 1 and {MAX_INSTALLMENTS}, got {0}")]
    InvalidCount(u32),
    #[error("amount must be positive")]
    InvalidAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct InstallmentPlan {
    pub number: u32,
    pub amount: f64,
    pub due_date: NaiveDate,
}

/// Equal installments rounded to cents, the last one absorbing the remainder.
pub fn split(
    amount: f64,
    count: u32,
    first_due_date: NaiveDate,
) -> Result<Vec<InstallmentPlan>, InstallmentError> {
    if count == 0 || count > MAX_INSTALLMENTS {
        return Err(InstallmentError::InvalidCount(count));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(InstallmentError::InvalidAmount);
    }

    let total_cents = (amount * 100.0).round() as i64;
    let base_cents = total_cents / count as i64;
    let last_cents = total_cents - base_cents * (count as i64 - 1);

    Ok((0..count)
        .map(|i| {
            let cents = if i + 1 == count { last_cents } else { base_cents };
            InstallmentPlan {
                number: i + 1,
                amount: round_cents(cents as f64 / 100.0),
                due_date: add_months(first_due_date, i),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sum_matches_original_amount() {
        let plan = split(1000.0, 3, day(2025, 1, 31)).unwrap();
        let amounts: Vec<_> = plan.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![333.33, 333.33, 333.34]);
        let total_cents: i64 = plan.iter().map(|p| (p.amount * 100.0).round() as i64).sum();
        assert_eq!(total_cents, 100_000);
    }

    #[test]
    fn test_due_dates_staggered_monthly() {
        let plan = split(300.0, 3, day(2025, 1, 31)).unwrap();
        let dates: Vec<_> = plan.iter().map(|p| p.due_date).collect();
        assert_eq!(dates, vec![day(2025, 1, 31), day(2025, 2, 28), day(2025, 3, 31)]);
    }

    #[test]
    fn test_invalid_counts() {
        assert_eq!(
            split(100.0, 0, day(2025, 1, 1)),
            Err(InstallmentError::InvalidCount(0))
        );
        assert_eq!(
            split(100.0, 13, day(2025, 1, 1)),
            Err(InstallmentError::InvalidCount(13))
        );
        assert_eq!(split(0.0, 2, day(2025, 1, 1)), Err(InstallmentError::InvalidAmount));
    }

    #[test]
    fn test_invoice_validation_shares_the_split_bound() {
        let invoice = |count: u32| db::models::invoice::CreateInvoice {
            child_id: uuid::Uuid::new_v4(),
            description: "Mensalidade".into(),
            amount: 1200.0,
            due_date: day(2025, 2, 10),
            coupon_code: None,
            installment_count: Some(i64::from(count)),
        };
        assert!(invoice(MAX_INSTALLMENTS).validate().is_ok());
        assert!(split(1200.0, MAX_INSTALLMENTS, day(2025, 2, 10)).is_ok());
        assert!(invoice(MAX_INSTALLMENTS + 1).validate().is_err());
        assert!(split(1200.0, MAX_INSTALLMENTS + 1, day(2025, 2, 10)).is_err());
    }
}
