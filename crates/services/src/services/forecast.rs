//! Linear cash-flow projection over the next months.

use chrono::NaiveDate;
use db::models::{
    employee_profile::EmployeeProfile, fixed_expense::FixedExpense, invoice::Invoice,
    subscription::Subscription,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::date::{add_months, month_key, month_start, round_cents};

pub const DEFAULT_FORECAST_MONTHS: usize = 6;
pub const MAX_FORECAST_MONTHS: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct ForecastInputs {
    /// Monthly value of active subscriptions
    pub recurring_revenue: f64,
    /// Amount still due on pending invoices
    pub pending_revenue: f64,
    /// Historical paid / non-cancelled ratio
    pub acceptance_ratio: f64,
    /// Active fixed expenses plus active net salaries
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ForecastMonth {
    pub month: String,
    pub revenue: f64,
    pub cost: f64,
    pub net_result: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Forecast {
    pub inputs: ForecastInputs,
    pub months: Vec<ForecastMonth>,
}

/// Fraction of non-cancelled invoices that were paid; zero without history.
pub fn acceptance_ratio(paid: i64, non_cancelled: i64) -> f64 {
    if non_cancelled <= 0 {
        return 0.0;
    }
    (paid as f64 / non_cancelled as f64).clamp(0.0, 1.0)
}

/// `months` buckets starting at the month containing `start`.
///
/// Only the first bucket counts pending revenue, weighted by the acceptance
/// ratio; every bucket carries the same cost. All three amounts are in cents,
/// so `net_result` equals `revenue - cost` to the cent.
pub fn project(inputs: &ForecastInputs, start: NaiveDate, months: usize) -> Vec<ForecastMonth> {
    let first = month_start(start);
    (0..months)
        .map(|offset| {
            let revenue = round_cents(if offset == 0 {
                inputs.recurring_revenue + inputs.pending_revenue * inputs.acceptance_ratio
            } else {
                inputs.recurring_revenue
            });
            let cost = round_cents(inputs.monthly_cost);
            ForecastMonth {
                month: month_key(add_months(first, offset as u32)),
                revenue,
                cost,
                net_result: round_cents(revenue - cost),
            }
        })
        .collect()
}

pub struct ForecastService;

impl ForecastService {
    pub async fn load_inputs(pool: &SqlitePool) -> Result<ForecastInputs, sqlx::Error> {
        let recurring_revenue = Subscription::sum_active_value(pool).await?;
        let pending_revenue = Invoice::sum_pending(pool).await?;
        let (paid, non_cancelled) = Invoice::payment_counts(pool).await?;
        let fixed = FixedExpense::sum_active(pool).await?;
        let salaries = EmployeeProfile::sum_active_net_salaries(pool).await?;

        Ok(ForecastInputs {
            recurring_revenue,
            pending_revenue,
            acceptance_ratio: acceptance_ratio(paid, non_cancelled),
            monthly_cost: fixed + salaries,
        })
    }

    pub async fn forecast(
        pool: &SqlitePool,
        start: NaiveDate,
        months: usize,
    ) -> Result<Forecast, sqlx::Error> {
        let inputs = Self::load_inputs(pool).await?;
        let months = project(&inputs, start, months.min(MAX_FORECAST_MONTHS));
        tracing::debug!(
            recurring = inputs.recurring_revenue,
            pending = inputs.pending_revenue,
            ratio = inputs.acceptance_ratio,
            cost = inputs.monthly_cost,
            buckets = months.len(),
            "Computed financial forecast"
        );
        Ok(Forecast { inputs, months })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
    }

    #[test]
    fn test_zero_costs_give_zero_cost() {
        let inputs = ForecastInputs {
            recurring_revenue: 10_000.0,
            ..Default::default()
        };
        assert!(project(&inputs, start(), 3).iter().all(|m| m.cost == 0.0));
    }

    #[test]
    fn test_month_zero_without_pending_is_recurring_only() {
        let inputs = ForecastInputs {
            recurring_revenue: 12_000.0,
            pending_revenue: 0.0,
            acceptance_ratio: 0.8,
            monthly_cost: 9_000.0,
        };
        let months = project(&inputs, start(), 2);
        assert_eq!(months[0].revenue, 12_000.0);
    }

    #[test]
    fn test_pending_weighted_only_in_first_month() {
        let inputs = ForecastInputs {
            recurring_revenue: 12_000.0,
            pending_revenue: 5_000.0,
            acceptance_ratio: 0.5,
            monthly_cost: 9_000.0,
        };
        let months = project(&inputs, start(), 3);
        assert_eq!(months[0].revenue, 14_500.0);
        assert_eq!(months[1].revenue, 12_000.0);
        assert_eq!(months[2].revenue, 12_000.0);
        for month in &months {
            assert_eq!(month.net_result, month.revenue - month.cost);
        }
    }

    #[test]
    fn test_net_result_agrees_to_the_cent() {
        for recurring in [1200.1, 999.99, 10_000.07, 0.3] {
            for cost in [900.1, 0.7, 1234.56, 10_000.08] {
                let inputs = ForecastInputs {
                    recurring_revenue: recurring,
                    pending_revenue: 333.33,
                    acceptance_ratio: 0.37,
                    monthly_cost: cost,
                };
                for month in project(&inputs, start(), 2) {
                    assert!((month.net_result - (month.revenue - month.cost)).abs() < 0.005);
                    assert_eq!(month.net_result, round_cents(month.net_result));
                }
            }
        }
    }

    #[test]
    fn test_six_buckets_with_increasing_labels() {
        let months = project(&ForecastInputs::default(), start(), 6);
        assert_eq!(months.len(), 6);
        let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2025-11", "2025-12", "2026-01", "2026-02", "2026-03", "2026-04"]
        );
        assert!(labels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_acceptance_ratio_without_history() {
        assert_eq!(acceptance_ratio(0, 0), 0.0);
        assert_eq!(acceptance_ratio(3, 4), 0.75);
    }
}
