// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{
    DayPlan, DayPlanId, IngredientId, MealType, NewRecipe, Nutrient, NutrientBoundRow, Recipe,
    RecipeHandle, RecipeId, RecipeIngredient, UsageRecord, User, UserId,
};
use crate::planner::constraints::{BoundPair, DietType, UserNutrientPreference};
use crate::planner::filter::CatalogEntry;
use crate::planner::nutrients::NutrientProfile;
use chrono::NaiveDate;
use diesel::prelude::OptionalExtension as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::QueryResult;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::{HashMap, HashSet};

pub fn add_user(conn: &mut database::Connection, new_name: &str) -> QueryResult<UserId> {
    use database::schema::users::dsl::*;
    use diesel::insert_into;

    insert_into(users)
        .values(name.eq(new_name))
        .returning(id)
        .get_result(conn)
}

pub fn find_user(conn: &mut database::Connection, user_name: &str) -> QueryResult<Option<User>> {
    use database::schema::users::dsl::*;

    users
        .select(User::as_select())
        .filter(name.eq(user_name))
        .get_result(conn)
        .optional()
}

/// Ingredient names are stored lower-cased, so lookups are case-insensitive.
pub fn find_or_add_ingredient(
    conn: &mut database::Connection,
    ingredient_name: &str,
) -> QueryResult<IngredientId> {
    use database::schema::ingredients::dsl::*;

    let lowered = ingredient_name.trim().to_lowercase();
    let existing = ingredients
        .select(id)
        .filter(name.eq(&lowered))
        .get_result(conn)
        .optional()?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    diesel::insert_into(ingredients)
        .values(name.eq(&lowered))
        .returning(id)
        .get_result(conn)
}

pub fn find_ingredient(
    conn: &mut database::Connection,
    ingredient_name: &str,
) -> QueryResult<Option<IngredientId>> {
    use database::schema::ingredients::dsl::*;

    ingredients
        .select(id)
        .filter(name.eq(ingredient_name.trim().to_lowercase()))
        .get_result(conn)
        .optional()
}

pub fn add_recipe(
    conn: &mut database::Connection,
    new_title: &str,
    new_meal_type: MealType,
    nutrients: &NutrientProfile,
) -> QueryResult<RecipeId> {
    use database::schema::recipes::dsl::*;

    let new_recipe = NewRecipe {
        title: new_title,
        meal_type: new_meal_type,
        calories: nutrients[Nutrient::Calories],
        sugars: nutrients[Nutrient::Sugars],
        protein: nutrients[Nutrient::Protein],
        fat: nutrients[Nutrient::Fat],
        carbohydrates: nutrients[Nutrient::Carbohydrates],
        fiber: nutrients[Nutrient::Fiber],
        iron: nutrients[Nutrient::Iron],
        potassium: nutrients[Nutrient::Potassium],
    };
    diesel::insert_into(recipes)
        .values(new_recipe)
        .returning(id)
        .get_result(conn)
}

pub fn add_recipe_ingredient(
    conn: &mut database::Connection,
    usage: RecipeIngredient,
) -> QueryResult<()> {
    use database::schema::recipe_ingredients::dsl::*;

    diesel::insert_into(recipe_ingredients)
        .values(usage)
        .execute(conn)?;
    Ok(())
}

/// Every recipe (optionally of one meal type) with its ingredient ids. Rows whose stored
/// nutrients fail validation are left out.
pub fn load_catalog(
    conn: &mut database::Connection,
    only_meal_type: Option<MealType>,
) -> QueryResult<Vec<CatalogEntry>> {
    use database::schema::{recipe_ingredients, recipes};

    let mut query = recipes::table
        .select(Recipe::as_select())
        .order(recipes::id)
        .into_boxed();
    if let Some(meal_type) = only_meal_type {
        query = query.filter(recipes::meal_type.eq(meal_type));
    }
    let rows: Vec<Recipe> = query.load(conn)?;

    let mut ingredients_by_recipe: HashMap<RecipeId, Vec<IngredientId>> = HashMap::new();
    let links: Vec<(RecipeId, IngredientId)> = recipe_ingredients::table
        .select((
            recipe_ingredients::recipe_id,
            recipe_ingredients::ingredient_id,
        ))
        .order(recipe_ingredients::id)
        .load(conn)?;
    for (recipe, ingredient) in links {
        ingredients_by_recipe
            .entry(recipe)
            .or_default()
            .push(ingredient);
    }

    Ok(rows
        .into_iter()
        .filter_map(|recipe| match NutrientProfile::of_recipe(&recipe) {
            Ok(nutrients) => Some(CatalogEntry {
                id: recipe.id,
                ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
                title: recipe.title,
                meal_type: recipe.meal_type,
                nutrients,
            }),
            Err(error) => {
                log::warn!("leaving recipe {} out of the catalog: {error}", recipe.id);
                None
            }
        })
        .collect())
}

pub fn add_disliked_ingredient(
    conn: &mut database::Connection,
    user: UserId,
    ingredient: IngredientId,
) -> QueryResult<()> {
    use database::schema::disliked_ingredients;

    diesel::insert_or_ignore_into(disliked_ingredients::table)
        .values((
            disliked_ingredients::user_id.eq(user),
            disliked_ingredients::ingredient_id.eq(ingredient),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn disliked_ingredients(
    conn: &mut database::Connection,
    user: UserId,
) -> QueryResult<HashSet<IngredientId>> {
    use database::schema::disliked_ingredients;

    Ok(disliked_ingredients::table
        .select(disliked_ingredients::ingredient_id)
        .filter(disliked_ingredients::user_id.eq(user))
        .load::<IngredientId>(conn)?
        .into_iter()
        .collect())
}

/// A user who never configured anything gets `UserNutrientPreference::default()`.
pub fn nutrient_preference(
    conn: &mut database::Connection,
    user: UserId,
) -> QueryResult<UserNutrientPreference> {
    use database::schema::{nutrient_bounds, nutrient_preferences};

    let diet: Option<String> = nutrient_preferences::table
        .find(user)
        .select(nutrient_preferences::diet_type)
        .get_result(conn)
        .optional()?;
    let rows: Vec<NutrientBoundRow> = nutrient_bounds::table
        .select(NutrientBoundRow::as_select())
        .filter(nutrient_bounds::user_id.eq(user))
        .load(conn)?;

    if diet.is_none() && rows.is_empty() {
        return Ok(UserNutrientPreference::default());
    }

    let mut preference = UserNutrientPreference::unconstrained();
    if let Some(diet) = diet {
        preference.diet_type = DietType::from_tag(&diet);
    }
    for row in rows {
        preference.bounds.insert(
            row.nutrient,
            BoundPair {
                min: row.min_value,
                max: row.max_value,
            },
        );
    }
    Ok(preference)
}

fn ensure_preference_row(conn: &mut database::Connection, user: UserId) -> QueryResult<()> {
    use database::schema::nutrient_preferences::dsl::*;

    diesel::insert_or_ignore_into(nutrient_preferences)
        .values((user_id.eq(user), diet_type.eq(DietType::Balanced.to_string())))
        .execute(conn)?;
    Ok(())
}

/// Writes one nutrient's bounds after validating them. `None` for both clears the pair.
pub fn set_nutrient_bounds(
    conn: &mut database::Connection,
    user: UserId,
    for_nutrient: Nutrient,
    min: Option<f64>,
    max: Option<f64>,
) -> crate::Result<()> {
    use database::schema::nutrient_bounds::dsl::*;

    let pair = BoundPair::new(min, max)?;
    ensure_preference_row(conn, user)?;
    diesel::insert_into(nutrient_bounds)
        .values(NutrientBoundRow {
            user_id: user,
            nutrient: for_nutrient,
            min_value: pair.min,
            max_value: pair.max,
        })
        .on_conflict((user_id, nutrient))
        .do_update()
        .set((min_value.eq(pair.min), max_value.eq(pair.max)))
        .execute(conn)?;
    Ok(())
}

pub fn set_diet_type(
    conn: &mut database::Connection,
    user: UserId,
    diet: DietType,
) -> QueryResult<()> {
    use database::schema::nutrient_preferences::dsl::*;

    diesel::insert_into(nutrient_preferences)
        .values((user_id.eq(user), diet_type.eq(diet.to_string())))
        .on_conflict(user_id)
        .do_update()
        .set(diet_type.eq(diet.to_string()))
        .execute(conn)?;
    Ok(())
}

pub fn get_or_create_day_plan(
    conn: &mut database::Connection,
    user: UserId,
    plan_day: NaiveDate,
) -> QueryResult<DayPlan> {
    use database::schema::day_plans::dsl::*;

    diesel::insert_or_ignore_into(day_plans)
        .values((user_id.eq(user), day.eq(plan_day)))
        .execute(conn)?;
    day_plans
        .select(DayPlan::as_select())
        .filter(user_id.eq(user))
        .filter(day.eq(plan_day))
        .get_result(conn)
}

pub fn day_plan_recipes(
    conn: &mut database::Connection,
    plan: DayPlanId,
) -> QueryResult<Vec<RecipeId>> {
    use database::schema::day_plan_recipes;

    day_plan_recipes::table
        .select(day_plan_recipes::recipe_id)
        .filter(day_plan_recipes::day_plan_id.eq(plan))
        .order(day_plan_recipes::recipe_id)
        .load(conn)
}

/// Assigns a recipe to a day. Assigning it twice is a no-op.
pub fn assign_recipe(
    conn: &mut database::Connection,
    plan: DayPlanId,
    recipe: RecipeId,
) -> QueryResult<()> {
    use database::schema::day_plan_recipes;

    diesel::insert_or_ignore_into(day_plan_recipes::table)
        .values((
            day_plan_recipes::day_plan_id.eq(plan),
            day_plan_recipes::recipe_id.eq(recipe),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn unassign_recipe(
    conn: &mut database::Connection,
    plan: DayPlanId,
    recipe: RecipeId,
) -> QueryResult<()> {
    use database::schema::day_plan_recipes;
    use diesel::delete;

    delete(
        day_plan_recipes::table
            .filter(day_plan_recipes::day_plan_id.eq(plan))
            .filter(day_plan_recipes::recipe_id.eq(recipe)),
    )
    .execute(conn)?;
    Ok(())
}

/// Every recipe assigned to the user on a day in `first..=last`.
pub fn planned_recipes_between(
    conn: &mut database::Connection,
    user: UserId,
    first: NaiveDate,
    last: NaiveDate,
) -> QueryResult<HashSet<RecipeId>> {
    use database::schema::{day_plan_recipes, day_plans};

    Ok(day_plan_recipes::table
        .inner_join(day_plans::table)
        .filter(day_plans::user_id.eq(user))
        .filter(day_plans::day.between(first, last))
        .select(day_plan_recipes::recipe_id)
        .load::<RecipeId>(conn)?
        .into_iter()
        .collect())
}

/// Recipes the user last ate on a day in `since..before`.
pub fn recently_used_recipes(
    conn: &mut database::Connection,
    user: UserId,
    since: NaiveDate,
    before: NaiveDate,
) -> QueryResult<HashSet<RecipeId>> {
    use database::schema::recipe_usages::dsl::*;

    Ok(recipe_usages
        .select(recipe_id)
        .filter(user_id.eq(user))
        .filter(last_used.ge(since))
        .filter(last_used.lt(before))
        .load::<RecipeId>(conn)?
        .into_iter()
        .collect())
}

pub fn record_usage(
    conn: &mut database::Connection,
    user: UserId,
    recipe: RecipeId,
    used_on: NaiveDate,
) -> QueryResult<()> {
    use database::schema::recipe_usages::dsl::*;

    diesel::insert_into(recipe_usages)
        .values(UsageRecord {
            user_id: user,
            recipe_id: recipe,
            last_used: used_on,
        })
        .on_conflict((user_id, recipe_id))
        .do_update()
        .set(last_used.eq(used_on))
        .execute(conn)?;
    Ok(())
}

pub fn usage_records(
    conn: &mut database::Connection,
    user: UserId,
) -> QueryResult<Vec<UsageRecord>> {
    use database::schema::recipe_usages::dsl::*;

    recipe_usages
        .select(UsageRecord::as_select())
        .filter(user_id.eq(user))
        .order(recipe_id)
        .load(conn)
}

/// The recipes planned for each day of `first..first + days`, days without a plan included.
pub fn week_plan(
    conn: &mut database::Connection,
    user: UserId,
    first: NaiveDate,
    days: u64,
) -> QueryResult<Vec<(NaiveDate, Vec<RecipeHandle>)>> {
    use database::schema::{day_plan_recipes, day_plans, recipes};

    let horizon: Vec<NaiveDate> = first.iter_days().take(days as usize).collect();
    let Some(&last) = horizon.last() else {
        return Ok(vec![]);
    };

    let rows: Vec<(NaiveDate, RecipeHandle)> = day_plan_recipes::table
        .inner_join(day_plans::table)
        .inner_join(recipes::table)
        .filter(day_plans::user_id.eq(user))
        .filter(day_plans::day.between(first, last))
        .order((day_plans::day, recipes::id))
        .select((day_plans::day, RecipeHandle::as_select()))
        .load(conn)?;

    let mut by_day: HashMap<NaiveDate, Vec<RecipeHandle>> = HashMap::new();
    for (d, recipe) in rows {
        by_day.entry(d).or_default().push(recipe);
    }
    Ok(horizon
        .into_iter()
        .map(|d| (d, by_day.remove(&d).unwrap_or_default()))
        .collect())
}

/// Deletes the user's day plans, their assignments and the usage history. The catalog is
/// untouched.
pub fn reset_plan(conn: &mut database::Connection, user: UserId) -> QueryResult<usize> {
    use database::schema::{day_plan_recipes, day_plans, recipe_usages};
    use diesel::delete;

    conn.transaction(|conn| {
        let plans = day_plans::table
            .select(day_plans::id)
            .filter(day_plans::user_id.eq(user));
        let assignments = delete(
            day_plan_recipes::table.filter(day_plan_recipes::day_plan_id.eq_any(plans)),
        )
        .execute(conn)?;
        delete(day_plans::table.filter(day_plans::user_id.eq(user))).execute(conn)?;
        delete(recipe_usages::table.filter(recipe_usages::user_id.eq(user))).execute(conn)?;
        Ok(assignments)
    })
}

#[cfg(test)]
pub(crate) fn seed_recipe(
    conn: &mut database::Connection,
    title: &str,
    meal_type: MealType,
    values: [f64; Nutrient::COUNT],
) -> RecipeId {
    let nutrients = NutrientProfile::from_values(values).unwrap();
    add_recipe(conn, title, meal_type, &nutrients).unwrap()
}

#[test]
fn catalog_round_trip() {
    let mut conn = database::establish_in_memory().unwrap();
    let oats = seed_recipe(
        &mut conn,
        "Oats",
        MealType::Breakfast,
        [350.0, 12.0, 12.0, 6.0, 60.0, 8.0, 4.0, 400.0],
    );
    let soup = seed_recipe(
        &mut conn,
        "Soup",
        MealType::Lunch,
        [420.0, 6.0, 18.0, 9.0, 40.0, 6.0, 3.0, 700.0],
    );
    let milk = find_or_add_ingredient(&mut conn, "Milk").unwrap();
    assert_eq!(find_or_add_ingredient(&mut conn, " milk ").unwrap(), milk);
    add_recipe_ingredient(
        &mut conn,
        RecipeIngredient {
            recipe_id: oats,
            ingredient_id: milk,
            quantity: Some(1.0),
            unit: Some("cup".into()),
        },
    )
    .unwrap();

    let catalog = load_catalog(&mut conn, None).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].id, oats);
    assert_eq!(catalog[0].ingredients, vec![milk]);
    assert_eq!(catalog[0].nutrients[Nutrient::Potassium], 400.0);
    assert!(catalog[1].ingredients.is_empty());

    let lunches = load_catalog(&mut conn, Some(MealType::Lunch)).unwrap();
    assert_eq!(lunches.len(), 1);
    assert_eq!(lunches[0].id, soup);
}

#[test]
fn preferences_default_and_update() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = add_user(&mut conn, "sam").unwrap();

    assert_eq!(
        nutrient_preference(&mut conn, user).unwrap(),
        UserNutrientPreference::default()
    );

    set_nutrient_bounds(&mut conn, user, Nutrient::Protein, Some(50.0), Some(200.0)).unwrap();
    set_diet_type(&mut conn, user, DietType::Low(Nutrient::Sugars)).unwrap();
    let preference = nutrient_preference(&mut conn, user).unwrap();
    assert_eq!(preference.diet_type, DietType::Low(Nutrient::Sugars));
    assert_eq!(
        preference.bounds.get(&Nutrient::Protein),
        Some(&BoundPair {
            min: Some(50.0),
            max: Some(200.0)
        })
    );
    // once configured, the calorie baseline no longer applies
    assert_eq!(preference.bounds.get(&Nutrient::Calories), None);

    set_nutrient_bounds(&mut conn, user, Nutrient::Protein, Some(60.0), Some(120.0)).unwrap();
    assert_eq!(
        nutrient_preference(&mut conn, user).unwrap().bounds[&Nutrient::Protein].min,
        Some(60.0)
    );

    assert!(set_nutrient_bounds(&mut conn, user, Nutrient::Calories, Some(5000.0), Some(10.0))
        .is_err());
}

#[test]
fn day_plans_are_unique_per_day() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = add_user(&mut conn, "sam").unwrap();
    let recipe = seed_recipe(&mut conn, "Toast", MealType::Breakfast, [200.0; 8]);
    let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    let plan = get_or_create_day_plan(&mut conn, user, day).unwrap();
    assert_eq!(get_or_create_day_plan(&mut conn, user, day).unwrap().id, plan.id);

    assign_recipe(&mut conn, plan.id, recipe).unwrap();
    assign_recipe(&mut conn, plan.id, recipe).unwrap();
    assert_eq!(day_plan_recipes(&mut conn, plan.id).unwrap(), vec![recipe]);

    unassign_recipe(&mut conn, plan.id, recipe).unwrap();
    assert!(day_plan_recipes(&mut conn, plan.id).unwrap().is_empty());
}

#[test]
fn usage_is_upserted_and_reset() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = add_user(&mut conn, "sam").unwrap();
    let recipe = seed_recipe(&mut conn, "Toast", MealType::Breakfast, [200.0; 8]);
    let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();

    record_usage(&mut conn, user, recipe, monday).unwrap();
    record_usage(&mut conn, user, recipe, friday).unwrap();
    assert_eq!(
        usage_records(&mut conn, user).unwrap(),
        vec![UsageRecord {
            user_id: user,
            recipe_id: recipe,
            last_used: friday
        }]
    );
    assert!(recently_used_recipes(&mut conn, user, monday, friday)
        .unwrap()
        .is_empty());
    assert_eq!(
        recently_used_recipes(&mut conn, user, monday, friday.succ_opt().unwrap()).unwrap(),
        maplit::hashset! { recipe }
    );

    let plan = get_or_create_day_plan(&mut conn, user, friday).unwrap();
    assign_recipe(&mut conn, plan.id, recipe).unwrap();
    assert_eq!(
        planned_recipes_between(&mut conn, user, monday, friday).unwrap(),
        maplit::hashset! { recipe }
    );

    assert_eq!(reset_plan(&mut conn, user).unwrap(), 1);
    assert!(usage_records(&mut conn, user).unwrap().is_empty());
    assert!(planned_recipes_between(&mut conn, user, monday, friday)
        .unwrap()
        .is_empty());
    assert_eq!(load_catalog(&mut conn, None).unwrap().len(), 1);
}
