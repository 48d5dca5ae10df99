// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::Insertable;
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use strum::{EnumIter, EnumString};

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[display("{_0}")]
pub struct UserId(i32);

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[display("{_0}")]
pub struct IngredientId(i32);

impl IngredientId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

/// The fixed set of categories every recipe is tagged with. Coverage is tracked per category.
#[derive(
    Debug, Display, EnumIter, EnumString, Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, DbEnum,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MealType {
    #[display("breakfast")]
    Breakfast,
    #[display("lunch")]
    Lunch,
    #[display("snack")]
    Snack,
    #[display("dinner")]
    Dinner,
}

impl MealType {
    pub const COUNT: usize = 4;

    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// The eight nutrient quantities carried by every recipe. The discriminant doubles as the index
/// into a `NutrientProfile`.
#[derive(
    Debug, Display, EnumIter, EnumString, Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, DbEnum,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Nutrient {
    #[display("calories")]
    Calories,
    #[display("sugars")]
    Sugars,
    #[display("protein")]
    Protein,
    #[display("fat")]
    Fat,
    #[display("carbohydrates")]
    Carbohydrates,
    #[display("fiber")]
    Fiber,
    #[display("iron")]
    Iron,
    #[display("potassium")]
    Potassium,
}

impl Nutrient {
    pub const COUNT: usize = 8;

    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[display("{_0}")]
pub struct RecipeId(i32);

impl RecipeId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub meal_type: MealType,
    pub calories: f64,
    pub sugars: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub fiber: f64,
    pub iron: f64,
    pub potassium: f64,
}

impl Recipe {
    /// Column values in `Nutrient` order.
    pub fn nutrient_values(&self) -> [f64; Nutrient::COUNT] {
        [
            self.calories,
            self.sugars,
            self.protein,
            self.fat,
            self.carbohydrates,
            self.fiber,
            self.iron,
            self.potassium,
        ]
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub meal_type: MealType,
    pub calories: f64,
    pub sugars: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub fiber: f64,
    pub iron: f64,
    pub potassium: f64,
}

#[derive(Queryable, Selectable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeHandle {
    pub id: RecipeId,
    pub title: String,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::nutrient_bounds)]
pub struct NutrientBoundRow {
    pub user_id: UserId,
    pub nutrient: Nutrient,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[display("{_0}")]
pub struct DayPlanId(i32);

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::day_plans)]
pub struct DayPlan {
    pub id: DayPlanId,
    pub user_id: UserId,
    pub day: chrono::NaiveDate,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe_usages)]
pub struct UsageRecord {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    pub last_used: chrono::NaiveDate,
}
