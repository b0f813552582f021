use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use db::models::nutrition::{CreateIngredient, CreateMeal, CreateMealItem, Ingredient, Meal};
use serde::Deserialize;
use services::services::nutrition::{DayNutrition, MealNutrition, NutritionService, PeriodNutrition};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct PeriodReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Truncate totals and the average for display
    pub decimals: Option<i32>,
}

/// List ingredients with their nutrients per 100 g
pub async fn list_ingredients(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Ingredient>>>, ApiError> {
    let ingredients = Ingredient::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(ingredients)))
}

/// Get a single ingredient
pub async fn get_ingredient(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Ingredient>>, ApiError> {
    let ingredient = Ingredient::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound("ingredient"))?;
    Ok(ResponseJson(ApiResponse::success(ingredient)))
}

/// Create an ingredient
pub async fn create_ingredient(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateIngredient>,
) -> Result<ResponseJson<ApiResponse<Ingredient>>, ApiError> {
    payload.validate()?;
    let ingredient = Ingredient::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(ingredient)))
}

/// Delete an ingredient not used by any meal
pub async fn delete_ingredient(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Ingredient::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("ingredient"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Meals served within a date range
pub async fn list_meals(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<PeriodQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Meal>>>, ApiError> {
    if query.from > query.to {
        return Err(ApiError::BadRequest("from must not be after to".into()));
    }
    let meals = Meal::find_in_range(&deployment.db().pool, query.from, query.to).await?;
    Ok(ResponseJson(ApiResponse::success(meals)))
}

/// Create a meal with its items
pub async fn create_meal(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateMeal>,
) -> Result<ResponseJson<ApiResponse<MealNutrition>>, ApiError> {
    payload.validate()?;
    let pool = &deployment.db().pool;
    for item in &payload.items {
        if Ingredient::find_by_id(pool, item.ingredient_id).await?.is_none() {
            return Err(ApiError::NotFound("ingredient"));
        }
    }
    let meal = Meal::create(pool, &payload, Uuid::new_v4()).await?;
    let report = NutritionService::meal_report(pool, meal.id).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Meal with per-item contributions and totals.
pub async fn get_meal(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<MealNutrition>>, ApiError> {
    let report = NutritionService::meal_report(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Delete a meal and its items
pub async fn delete_meal(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Meal::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("meal"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Add an ingredient to a meal
pub async fn add_meal_item(
    State(deployment): State<DeploymentImpl>,
    Path(meal_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateMealItem>,
) -> Result<ResponseJson<ApiResponse<MealNutrition>>, ApiError> {
    payload.validate()?;
    let pool = &deployment.db().pool;
    if Meal::find_by_id(pool, meal_id).await?.is_none() {
        return Err(ApiError::NotFound("meal"));
    }
    if Ingredient::find_by_id(pool, payload.ingredient_id).await?.is_none() {
        return Err(ApiError::NotFound("ingredient"));
    }
    Meal::add_item(pool, meal_id, &payload).await?;
    let report = NutritionService::meal_report(pool, meal_id).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Remove an item from the meal it belongs to
pub async fn remove_meal_item(
    State(deployment): State<DeploymentImpl>,
    Path((meal_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<MealNutrition>>, ApiError> {
    let pool = &deployment.db().pool;
    if Meal::find_by_id(pool, meal_id).await?.is_none() {
        return Err(ApiError::NotFound("meal"));
    }
    if Meal::remove_item(pool, meal_id, item_id).await? == 0 {
        return Err(ApiError::NotFound("meal item"));
    }
    let report = NutritionService::meal_report(pool, meal_id).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Nutrient totals for one day, today by default
pub async fn day_report(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<DayQuery>,
) -> Result<ResponseJson<ApiResponse<DayNutrition>>, ApiError> {
    let date = query.date.unwrap_or_else(utils::date::today);
    let report = NutritionService::day_report(&deployment.db().pool, date).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Nutrient totals per day and the period average
pub async fn period_report(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<PeriodReportQuery>,
) -> Result<ResponseJson<ApiResponse<PeriodNutrition>>, ApiError> {
    let mut report =
        NutritionService::period_report(&deployment.db().pool, query.from, query.to).await?;
    if let Some(decimals) = query.decimals.map(|d| d.clamp(0, 6)) {
        report.average = report.average.truncated(decimals);
        for day in &mut report.days {
            day.totals = day.totals.truncated(decimals);
        }
    }
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .nest(
            "/ingredients",
            Router::new()
                .route("/", get(list_ingredients).post(create_ingredient))
                .route("/{id}", get(get_ingredient).delete(delete_ingredient)),
        )
        .nest(
            "/meals",
            Router::new()
                .route("/", get(list_meals).post(create_meal))
                .route("/{id}", get(get_meal).delete(delete_meal))
                .route("/{id}/items", post(add_meal_item))
                .route("/{id}/items/{item_id}", delete(remove_meal_item)),
        )
        .route("/nutrition/day", get(day_report))
        .route("/nutrition/period", get(period_report))
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use db::models::nutrition::{MealType, NutrientProfile};

    use super::*;
    use crate::deployment::tests::test_deployment;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    async fn rice(deployment: &DeploymentImpl) -> Ingredient {
        let Json(response) = create_ingredient(
            State(deployment.clone()),
            Json(CreateIngredient {
                name: "Arroz".into(),
                per_100: NutrientProfile {
                    energy_kcal: 130.0,
                    protein_g: 2.7,
                    ..Default::default()
                },
            }),
        )
        .await
        .unwrap();
        response.into_data().unwrap()
    }

    async fn meal(
        deployment: &DeploymentImpl,
        meal_type: MealType,
        ingredient_id: Uuid,
        quantity: f64,
    ) -> MealNutrition {
        let Json(response) = create_meal(
            State(deployment.clone()),
            Json(CreateMeal {
                meal_date: monday(),
                meal_type,
                name: "Refeição".into(),
                classroom: None,
                items: vec![CreateMealItem {
                    ingredient_id,
                    quantity,
                }],
            }),
        )
        .await
        .unwrap();
        response.into_data().unwrap()
    }

    #[tokio::test]
    async fn test_item_removal_requires_matching_meal() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        let rice = rice(&deployment).await;
        let lunch = meal(&deployment, MealType::Lunch, rice.id, 100.0).await;
        let snack = meal(&deployment, MealType::AfternoonSnack, rice.id, 50.0).await;
        let snack_item = snack.items[0].item.id;

        let result = remove_meal_item(
            State(deployment.clone()),
            Path((lunch.meal.id, snack_item)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound("meal item"))));

        let result = remove_meal_item(
            State(deployment.clone()),
            Path((Uuid::new_v4(), snack_item)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound("meal"))));

        let pool = &deployment.db().pool;
        assert_eq!(Meal::items(pool, snack.meal.id).await.unwrap().len(), 1);
        assert_eq!(Meal::items(pool, lunch.meal.id).await.unwrap().len(), 1);

        let Json(response) = remove_meal_item(
            State(deployment.clone()),
            Path((snack.meal.id, snack_item)),
        )
        .await
        .unwrap();
        let report = response.into_data().unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.totals, NutrientProfile::default());
    }

    #[tokio::test]
    async fn test_period_report_truncates_only_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = test_deployment(dir.path()).await;
        let rice = rice(&deployment).await;
        meal(&deployment, MealType::MorningSnack, rice.id, 33.0).await;

        let query = |decimals: Option<i32>| PeriodReportQuery {
            from: monday(),
            to: monday() + chrono::TimeDelta::days(4),
            decimals,
        };

        let Json(response) = period_report(State(deployment.clone()), Query(query(None)))
            .await
            .unwrap();
        let full = response.into_data().unwrap();
        assert_eq!(full.days_with_data, 1);
        assert!((full.average.protein_g - 0.891).abs() < 1e-9);

        let Json(response) = period_report(State(deployment.clone()), Query(query(Some(1))))
            .await
            .unwrap();
        let shown = response.into_data().unwrap();
        assert_eq!(shown.average.protein_g, 0.8);
        assert_eq!(shown.days[0].totals.protein_g, 0.8);
    }
}
