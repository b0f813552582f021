use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use services::services::forecast::{DEFAULT_FORECAST_MONTHS, Forecast, ForecastService};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub months: Option<usize>,
    pub start: Option<NaiveDate>,
}

/// Cash-flow projection for the next months
pub async fn get_forecast(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ForecastQuery>,
) -> Result<ResponseJson<ApiResponse<Forecast>>, ApiError> {
    let months = query.months.unwrap_or(DEFAULT_FORECAST_MONTHS);
    if months == 0 {
        return Err(ApiError::BadRequest("months must be at least 1".into()));
    }
    let start = query.start.unwrap_or_else(utils::date::today);
    let forecast = ForecastService::forecast(&deployment.db().pool, start, months).await?;
    Ok(ResponseJson(ApiResponse::success(forecast)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/forecast", get(get_forecast))
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use db::models::fixed_expense::{CreateFixedExpense, FixedExpense};
    use services::services::forecast::MAX_FORECAST_MONTHS;
    use uuid::Uuid;

    use super::*;
    use crate::deployment::tests::test_deployment;

    #[tokio::test]
    async fn test_forecast_buckets_and_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        FixedExpense::create(
            &deployment.db().pool,
            &CreateFixedExpense {
                description: "Aluguel".into(),
                category: None,
                amount: 1500.0,
                is_active: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let query = |months: Option<usize>| ForecastQuery {
            months,
            start: NaiveDate::from_ymd_opt(2025, 11, 18),
        };

        let Json(response) = get_forecast(State(deployment.clone()), Query(query(Some(3))))
            .await
            .unwrap();
        let forecast = response.into_data().unwrap();
        let labels: Vec<_> = forecast.months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2025-11", "2025-12", "2026-01"]);
        assert!(forecast.months.iter().all(|m| m.cost == 1500.0 && m.net_result == -1500.0));
        assert_eq!(forecast.inputs.acceptance_ratio, 0.0);

        let Json(response) = get_forecast(State(deployment.clone()), Query(query(None)))
            .await
            .unwrap();
        assert_eq!(response.into_data().unwrap().months.len(), DEFAULT_FORECAST_MONTHS);

        let Json(response) = get_forecast(State(deployment.clone()), Query(query(Some(100))))
            .await
            .unwrap();
        assert_eq!(response.into_data().unwrap().months.len(), MAX_FORECAST_MONTHS);

        assert!(matches!(
            get_forecast(State(deployment.clone()), Query(query(Some(0)))).await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
