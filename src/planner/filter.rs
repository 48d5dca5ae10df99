// Copyright 2023 Remi Bernotavicius

use super::nutrients::NutrientProfile;
use super::solver::Candidate;
use crate::database::models::{IngredientId, MealType, RecipeId};
use std::collections::HashSet;

/// A catalog recipe with validated nutrients and the ingredients it uses.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: RecipeId,
    pub title: String,
    pub meal_type: MealType,
    pub nutrients: NutrientProfile,
    pub ingredients: Vec<IngredientId>,
}

impl CatalogEntry {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: self.id,
            meal_type: self.meal_type,
            nutrients: self.nutrients,
        }
    }
}

/// Drops recipes using any disliked ingredient and recipes in the exclusion set.
pub fn filter_candidates(
    catalog: &[CatalogEntry],
    disliked: &HashSet<IngredientId>,
    excluded: &HashSet<RecipeId>,
) -> Vec<Candidate> {
    catalog
        .iter()
        .filter(|entry| !excluded.contains(&entry.id))
        .filter(|entry| !entry.ingredients.iter().any(|i| disliked.contains(i)))
        .map(CatalogEntry::candidate)
        .collect()
}

#[cfg(test)]
pub(crate) fn entry(
    id: i32,
    meal_type: MealType,
    calories: f64,
    ingredients: &[i32],
) -> CatalogEntry {
    CatalogEntry {
        id: RecipeId::new(id),
        title: format!("recipe {id}"),
        meal_type,
        nutrients: NutrientProfile::from_values([calories, 5.0, 20.0, 10.0, 40.0, 5.0, 3.0, 600.0])
            .unwrap(),
        ingredients: ingredients.iter().copied().map(IngredientId::new).collect(),
    }
}

#[test]
fn dislikes_and_exclusions_are_removed() {
    use maplit::hashset;

    let catalog = vec![
        entry(1, MealType::Breakfast, 400.0, &[1, 2]),
        entry(2, MealType::Lunch, 600.0, &[3]),
        entry(3, MealType::Dinner, 700.0, &[2, 4]),
        entry(4, MealType::Snack, 200.0, &[]),
    ];
    let disliked = hashset! { IngredientId::new(2) };
    let excluded = hashset! { RecipeId::new(4) };

    let ids: Vec<RecipeId> = filter_candidates(&catalog, &disliked, &excluded)
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![RecipeId::new(2)]);
}

#[test]
fn everything_disliked_empties_the_pool() {
    use super::solver::{solve_selection, Infeasibility, LinearObjective, SelectionResult};
    use crate::planner::constraints::Direction;
    use crate::database::models::Nutrient;
    use maplit::hashset;

    let catalog = vec![
        entry(1, MealType::Breakfast, 400.0, &[1]),
        entry(2, MealType::Lunch, 600.0, &[1, 3]),
    ];
    let candidates = filter_candidates(&catalog, &hashset! { IngredientId::new(1) }, &HashSet::new());
    assert!(candidates.is_empty());

    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Protein, 1.0);
    let result = solve_selection(
        &candidates,
        &[],
        &objective,
        6,
        &super::solver::categories_present(&candidates),
    );
    assert_eq!(result, SelectionResult::Infeasible(Infeasibility::NoCandidates));
}
