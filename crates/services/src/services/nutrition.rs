//! Nutrient totals for meals, days and periods.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use db::models::nutrition::{Meal, MealItemDetail, NutrientProfile};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("meal not found")]
    MealNotFound,
    #[error("invalid period: {from} after {to}")]
    InvalidPeriod { from: NaiveDate, to: NaiveDate },
}

/// Amount of each nutrient provided by `quantity` of an ingredient.
pub fn item_contribution(per_100: &NutrientProfile, quantity: f64) -> NutrientProfile {
    per_100.map(|value| value * quantity / 100.0)
}

pub fn meal_totals<'a>(items: impl IntoIterator<Item = &'a MealItemDetail>) -> NutrientProfile {
    items
        .into_iter()
        .map(|item| item_contribution(&item.per_100, item.quantity))
        .sum()
}

pub fn day_totals<'a>(meal_totals: impl IntoIterator<Item = &'a NutrientProfile>) -> NutrientProfile {
    meal_totals.into_iter().copied().sum()
}

/// Average of `day_totals` over the days that have energy recorded.
///
/// With no such day the divisor falls back to 1, so an empty period averages
/// to its (zero) sum instead of dividing by zero.
pub fn period_average(day_totals: &[NutrientProfile]) -> NutrientProfile {
    let days_with_data = days_with_data(day_totals);
    let total: NutrientProfile = day_totals.iter().copied().sum();
    let divisor = if days_with_data == 0 {
        1.0
    } else {
        days_with_data as f64
    };
    total.map(|value| value / divisor)
}

fn days_with_data(day_totals: &[NutrientProfile]) -> usize {
    day_totals.iter().filter(|d| d.energy_kcal != 0.0).count()
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ItemNutrition {
    #[serde(flatten)]
    #[ts(flatten)]
    pub item: MealItemDetail,
    pub contribution: NutrientProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MealNutrition {
    pub meal: Meal,
    pub items: Vec<ItemNutrition>,
    pub totals: NutrientProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DayNutrition {
    pub date: NaiveDate,
    pub meals: Vec<MealNutrition>,
    pub totals: NutrientProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PeriodNutrition {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DayNutrition>,
    pub days_with_data: usize,
    pub average: NutrientProfile,
}

fn meal_nutrition(meal: Meal, items: Vec<MealItemDetail>) -> MealNutrition {
    let items: Vec<ItemNutrition> = items
        .into_iter()
        .map(|item| ItemNutrition {
            contribution: item_contribution(&item.per_100, item.quantity),
            item,
        })
        .collect();
    let totals = items.iter().map(|i| i.contribution).sum();
    MealNutrition { meal, items, totals }
}

pub struct NutritionService;

impl NutritionService {
    pub async fn meal_report(
        pool: &SqlitePool,
        meal_id: Uuid,
    ) -> Result<MealNutrition, NutritionError> {
        let meal = Meal::find_by_id(pool, meal_id)
            .await?
            .ok_or(NutritionError::MealNotFound)?;
        let items = Meal::items(pool, meal_id).await?;
        Ok(meal_nutrition(meal, items))
    }

    pub async fn day_report(
        pool: &SqlitePool,
        date: NaiveDate,
    ) -> Result<DayNutrition, NutritionError> {
        let period = Self::period_report(pool, date, date).await?;
        Ok(period.days.into_iter().next().unwrap_or(DayNutrition {
            date,
            meals: Vec::new(),
            totals: NutrientProfile::default(),
        }))
    }

    pub async fn period_report(
        pool: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodNutrition, NutritionError> {
        if from > to {
            return Err(NutritionError::InvalidPeriod { from, to });
        }

        let meals = Meal::find_in_range(pool, from, to).await?;
        let mut items_by_meal: BTreeMap<Uuid, Vec<MealItemDetail>> = BTreeMap::new();
        for item in Meal::items_in_range(pool, from, to).await? {
            items_by_meal.entry(item.meal_id).or_default().push(item);
        }

        let mut meals_by_day: BTreeMap<NaiveDate, Vec<MealNutrition>> = BTreeMap::new();
        for meal in meals {
            let items = items_by_meal.remove(&meal.id).unwrap_or_default();
            meals_by_day
                .entry(meal.meal_date)
                .or_default()
                .push(meal_nutrition(meal, items));
        }

        let days: Vec<DayNutrition> = meals_by_day
            .into_iter()
            .map(|(date, meals)| DayNutrition {
                date,
                totals: day_totals(meals.iter().map(|m| &m.totals)),
                meals,
            })
            .collect();

        let totals: Vec<NutrientProfile> = days.iter().map(|d| d.totals).collect();
        Ok(PeriodNutrition {
            from,
            to,
            days_with_data: days_with_data(&totals),
            average: period_average(&totals),
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::nutrition::{CreateIngredient, CreateMeal, CreateMealItem, Ingredient, MealType},
    };

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn item(per_100: NutrientProfile, quantity: f64) -> MealItemDetail {
        MealItemDetail {
            id: Uuid::new_v4(),
            meal_id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Ingrediente".into(),
            quantity,
            per_100,
        }
    }

    #[test]
    fn test_empty_aggregate_is_zero() {
        let items: Vec<MealItemDetail> = Vec::new();
        assert_eq!(meal_totals(&items), NutrientProfile::default());
        assert_eq!(period_average(&[]), NutrientProfile::default());
    }

    #[test]
    fn test_linear_scaling() {
        let per_100 = NutrientProfile {
            energy_kcal: 100.0,
            ..Default::default()
        };
        assert_eq!(item_contribution(&per_100, 50.0).energy_kcal, 50.0);
    }

    #[test]
    fn test_rice_contribution() {
        let rice = NutrientProfile {
            energy_kcal: 130.0,
            protein_g: 2.7,
            ..Default::default()
        };
        let meal = meal_totals(&[item(rice, 200.0)]);
        assert!(approx(meal.energy_kcal, 260.0));
        assert!(approx(meal.protein_g, 5.4));

        let day = day_totals([&meal]);
        assert_eq!(day, meal);
        assert_eq!(period_average(&[day]), day);
    }

    #[test]
    fn test_partition_gives_same_grand_total() {
        let items: Vec<MealItemDetail> = (1..=6)
            .map(|i| {
                item(
                    NutrientProfile {
                        energy_kcal: 10.0 * i as f64,
                        iron_mg: 0.25 * i as f64,
                        ..Default::default()
                    },
                    40.0 * i as f64,
                )
            })
            .collect();
        let whole = meal_totals(&items);
        let (left, right) = items.split_at(2);
        let split = day_totals([&meal_totals(left), &meal_totals(right)]);
        let (a, b) = items.split_at(5);
        let split_other = day_totals([&meal_totals(a), &meal_totals(b)]);

        for (x, y) in whole.values().into_iter().zip(split.values()) {
            assert!(approx(x, y));
        }
        for (x, y) in whole.values().into_iter().zip(split_other.values()) {
            assert!(approx(x, y));
        }
    }

    #[test]
    fn test_average_ignores_days_without_energy() {
        let full = NutrientProfile {
            energy_kcal: 900.0,
            protein_g: 30.0,
            ..Default::default()
        };
        let empty = NutrientProfile::default();
        let avg = period_average(&[full, empty, full.scaled(2.0 / 3.0)]);
        assert!(approx(avg.energy_kcal, 750.0));
        assert!(approx(avg.protein_g, 25.0));
    }

    #[tokio::test]
    async fn test_period_report_from_database() {
        let db = DBService::new_in_memory().await.unwrap();
        let rice = Ingredient::create(
            &db.pool,
            &CreateIngredient {
                name: "Arroz".into(),
                per_100: NutrientProfile {
                    energy_kcal: 130.0,
                    protein_g: 2.7,
                    ..Default::default()
                },
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let friday = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        Meal::create(
            &db.pool,
            &CreateMeal {
                meal_date: monday,
                meal_type: MealType::Lunch,
                name: "Almoço".into(),
                classroom: None,
                items: vec![CreateMealItem {
                    ingredient_id: rice.id,
                    quantity: 200.0,
                }],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let week = NutritionService::period_report(&db.pool, monday, friday)
            .await
            .unwrap();
        assert_eq!(week.days.len(), 1);
        assert_eq!(week.days_with_data, 1);
        assert!(approx(week.average.energy_kcal, 260.0));
        assert_eq!(week.average, week.days[0].totals);

        let tuesday = NutritionService::day_report(&db.pool, monday.succ_opt().unwrap())
            .await
            .unwrap();
        assert!(tuesday.meals.is_empty());

        assert!(matches!(
            NutritionService::period_report(&db.pool, friday, monday).await,
            Err(NutritionError::InvalidPeriod { .. })
        ));
    }
}
