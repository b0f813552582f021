//! Ingredients, meals and the nutrient profile they carry.

use std::ops::{Add, AddAssign};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::validation::{ValidationError, non_negative, require};

macro_rules! nutrient_profile {
    ($($field:ident),+ $(,)?) => {
        /// Nutrient amounts. On an ingredient the values are per 100 g (or ml);
        /// after aggregation they are absolute amounts.
        #[derive(Debug, Clone, Copy, Default, PartialEq, FromRow, Serialize, Deserialize, TS)]
        pub struct NutrientProfile {
            $(#[serde(default)] pub $field: f64,)+
        }

        impl NutrientProfile {
            /// Column names, matching the `ingredients` table.
            pub const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];

            /// Field values in `COLUMNS` order.
            pub fn values(&self) -> Vec<f64> {
                vec![$(self.$field),+]
            }

            /// Apply `f` to every field.
            pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
                Self { $($field: f(self.$field),)+ }
            }

            pub fn scaled(&self, factor: f64) -> Self {
                self.map(|v| v * factor)
            }

            /// Truncate every field to `decimals` places, for display only.
            pub fn truncated(&self, decimals: i32) -> Self {
                let p = 10f64.powi(decimals);
                self.map(|v| (v * p).trunc() / p)
            }

            pub fn validate(&self) -> Result<(), ValidationError> {
                $(non_negative(stringify!($field), self.$field)?;)+
                Ok(())
            }
        }

        impl Add for NutrientProfile {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self { $($field: self.$field + rhs.$field,)+ }
            }
        }
    };
}

nutrient_profile!(
    energy_kcal,
    protein_g,
    lipid_g,
    carbohydrate_g,
    fiber_g,
    calcium_mg,
    iron_mg,
    sodium_mg,
    potassium_mg,
    magnesium_mg,
    phosphorus_mg,
    zinc_mg,
    vitamin_a_mcg,
    vitamin_c_mg,
    saturated_g,
    monounsaturated_g,
    polyunsaturated_g,
    cholesterol_mg,
);

impl AddAssign for NutrientProfile {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for NutrientProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

fn nutrient_columns(prefix: &str) -> String {
    NutrientProfile::COLUMNS
        .iter()
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "meal_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MealType {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub per_100: NutrientProfile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateIngredient {
    pub name: String,
    #[serde(flatten)]
    #[ts(flatten)]
    pub per_100: NutrientProfile,
}

impl CreateIngredient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("nome do ingrediente", &self.name)?;
        self.per_100.validate()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Meal {
    pub id: Uuid,
    pub meal_date: NaiveDate,
    pub meal_type: MealType,
    pub name: String,
    pub classroom: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMeal {
    pub meal_date: NaiveDate,
    pub meal_type: MealType,
    pub name: String,
    pub classroom: Option<String>,
    pub items: Vec<CreateMealItem>,
}

impl CreateMeal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("nome da refeição", &self.name)?;
        self.items.iter().try_for_each(CreateMealItem::validate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMealItem {
    pub ingredient_id: Uuid,
    pub quantity: f64,
}

impl CreateMealItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("quantidade", self.quantity)
    }
}

/// Meal item joined with its ingredient's per-100 profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MealItemDetail {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub quantity: f64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub per_100: NutrientProfile,
}

impl Ingredient {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(r#"SELECT * FROM ingredients ORDER BY name ASC"#)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(r#"SELECT * FROM ingredients WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateIngredient,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let placeholders = (0..NutrientProfile::COLUMNS.len())
            .map(|i| format!("${}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO ingredients (id, name, {}) VALUES ($1, $2, {}) RETURNING *",
            nutrient_columns(""),
            placeholders
        );
        let mut query = sqlx::query_as::<_, Ingredient>(&sql).bind(id).bind(&data.name);
        for value in data.per_100.values() {
            query = query.bind(value);
        }
        query.fetch_one(pool).await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Meal {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(r#"SELECT * FROM meals WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_in_range(
        pool: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(
            r#"SELECT * FROM meals
               WHERE meal_date >= $1 AND meal_date <= $2
               ORDER BY meal_date ASC, CASE meal_type
                   WHEN 'breakfast' THEN 0
                   WHEN 'morning_snack' THEN 1
                   WHEN 'lunch' THEN 2
                   WHEN 'afternoon_snack' THEN 3
                   ELSE 4 END"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Insert the meal, then each item; a failing item leaves the earlier rows in place.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMeal,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let meal = sqlx::query_as::<_, Meal>(
            r#"INSERT INTO meals (id, meal_date, meal_type, name, classroom)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.meal_date)
        .bind(data.meal_type)
        .bind(&data.name)
        .bind(&data.classroom)
        .fetch_one(pool)
        .await?;

        for item in &data.items {
            Self::add_item(pool, meal.id, item).await?;
        }
        Ok(meal)
    }

    pub async fn add_item(
        pool: &SqlitePool,
        meal_id: Uuid,
        item: &CreateMealItem,
    ) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO meal_items (id, meal_id, ingredient_id, quantity) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(id)
        .bind(meal_id)
        .bind(item.ingredient_id)
        .bind(item.quantity)
        .execute(pool)
        .await?;
        Ok(id)
    }

    /// Removes the item only when it belongs to `meal_id`.
    pub async fn remove_item(
        pool: &SqlitePool,
        meal_id: Uuid,
        item_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meal_items WHERE id = $1 AND meal_id = $2")
            .bind(item_id)
            .bind(meal_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn items(pool: &SqlitePool, meal_id: Uuid) -> Result<Vec<MealItemDetail>, sqlx::Error> {
        let sql = format!(
            r#"SELECT mi.id, mi.meal_id, mi.ingredient_id, i.name AS ingredient_name, mi.quantity, {}
               FROM meal_items mi
               JOIN ingredients i ON i.id = mi.ingredient_id
               WHERE mi.meal_id = $1
               ORDER BY mi.created_at ASC"#,
            nutrient_columns("i.")
        );
        sqlx::query_as::<_, MealItemDetail>(&sql)
            .bind(meal_id)
            .fetch_all(pool)
            .await
    }

    /// Items of every meal served between `from` and `to`.
    pub async fn items_in_range(
        pool: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MealItemDetail>, sqlx::Error> {
        let sql = format!(
            r#"SELECT mi.id, mi.meal_id, mi.ingredient_id, i.name AS ingredient_name, mi.quantity, {}
               FROM meal_items mi
               JOIN ingredients i ON i.id = mi.ingredient_id
               JOIN meals m ON m.id = mi.meal_id
               WHERE m.meal_date >= $1 AND m.meal_date <= $2
               ORDER BY mi.created_at ASC"#,
            nutrient_columns("i.")
        );
        sqlx::query_as::<_, MealItemDetail>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::DBService;

    pub(crate) fn rice() -> CreateIngredient {
        CreateIngredient {
            name: "Arroz".into(),
            per_100: NutrientProfile {
                energy_kcal: 130.0,
                protein_g: 2.7,
                carbohydrate_g: 28.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_profile_add_and_scale() {
        let a = NutrientProfile {
            energy_kcal: 100.0,
            iron_mg: 1.0,
            ..Default::default()
        };
        let total: NutrientProfile = [a, a.scaled(0.5)].into_iter().sum();
        assert_eq!(total.energy_kcal, 150.0);
        assert_eq!(total.iron_mg, 1.5);
        assert_eq!(
            NutrientProfile {
                protein_g: 5.4999,
                ..Default::default()
            }
            .truncated(1)
            .protein_g,
            5.4
        );
    }

    #[test]
    fn test_values_follow_column_order() {
        let profile = rice().per_100;
        let values = profile.values();
        assert_eq!(values.len(), NutrientProfile::COLUMNS.len());
        assert_eq!(values[0], 130.0);
        assert_eq!(values[1], 2.7);
    }

    #[tokio::test]
    async fn test_meal_items_join_ingredient_profile() {
        let db = DBService::new_in_memory().await.unwrap();
        let rice = Ingredient::create(&db.pool, &rice(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(rice.per_100.energy_kcal, 130.0);

        let day = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let meal = Meal::create(
            &db.pool,
            &CreateMeal {
                meal_date: day,
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

        let items = Meal::items(&db.pool, meal.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ingredient_name, "Arroz");
        assert_eq!(items[0].per_100.protein_g, 2.7);

        let ranged = Meal::items_in_range(&db.pool, day, day).await.unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(Meal::find_in_range(&db.pool, day, day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_item_is_scoped_to_its_meal() {
        let db = DBService::new_in_memory().await.unwrap();
        let rice = Ingredient::create(&db.pool, &rice(), Uuid::new_v4())
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let mut meals = Vec::new();
        for (meal_type, name) in [(MealType::Lunch, "Almoço"), (MealType::Dinner, "Jantar")] {
            let meal = Meal::create(
                &db.pool,
                &CreateMeal {
                    meal_date: day,
                    meal_type,
                    name: name.into(),
                    classroom: None,
                    items: vec![CreateMealItem {
                        ingredient_id: rice.id,
                        quantity: 100.0,
                    }],
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            meals.push(meal);
        }
        let (lunch, dinner) = (&meals[0], &meals[1]);
        let dinner_item = Meal::items(&db.pool, dinner.id).await.unwrap()[0].id;

        assert_eq!(
            Meal::remove_item(&db.pool, lunch.id, dinner_item).await.unwrap(),
            0
        );
        assert_eq!(Meal::items(&db.pool, dinner.id).await.unwrap().len(), 1);

        assert_eq!(
            Meal::remove_item(&db.pool, dinner.id, dinner_item).await.unwrap(),
            1
        );
        assert!(Meal::items(&db.pool, dinner.id).await.unwrap().is_empty());
    }
}
