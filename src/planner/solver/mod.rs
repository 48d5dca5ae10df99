// Copyright 2023 Remi Bernotavicius

//! Binary selection over candidate recipes: one include/exclude decision per candidate, a
//! linear objective, per-nutrient range constraints, a cap on the selection size, and at least
//! one pick from every required meal type.

use crate::database::models::{MealType, Nutrient, RecipeId};
use crate::planner::constraints::NutrientBound;
use crate::planner::nutrients::NutrientProfile;
use derive_more::Display;
use std::collections::BTreeSet;

pub mod branch_bound;
#[cfg(feature = "lp")]
pub mod lp;
pub mod objective;

pub use branch_bound::BranchAndBound;
#[cfg(feature = "lp")]
pub use lp::LpSolver;
pub use objective::LinearObjective;

const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Slack allowed when comparing a sum against `bound`.
pub fn tolerance(bound: f64) -> f64 {
    RELATIVE_TOLERANCE * bound.abs().max(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: RecipeId,
    pub meal_type: MealType,
    pub nutrients: NutrientProfile,
}

pub fn categories_present(candidates: &[Candidate]) -> BTreeSet<MealType> {
    candidates.iter().map(|c| c.meal_type).collect()
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum Infeasibility {
    #[display("no candidate recipes are available")]
    NoCandidates,
    #[display("no candidate recipe is a {_0}")]
    MissingCategory(MealType),
    #[display("{required} meal types must be covered but at most {max_count} recipes may be selected")]
    CoverageExceedsCap { required: usize, max_count: usize },
    #[display("{nutrient} minimum {min} is above its maximum {max}")]
    ContradictoryBounds { nutrient: Nutrient, min: f64, max: f64 },
    #[display("{nutrient} minimum {min} is out of reach, the best possible total is {reachable}")]
    BoundOutOfReach {
        nutrient: Nutrient,
        min: f64,
        reachable: f64,
    },
    #[display("recipes already planned put {nutrient} {excess} over its maximum")]
    MaximumExceeded { nutrient: Nutrient, excess: f64 },
    #[display("no selection satisfies every nutrient range and meal type together")]
    ConstraintsUnsatisfiable,
    #[display("the solver gave up before proving a result")]
    Timeout,
    /// The backend itself failed, as opposed to proving the problem infeasible.
    #[display("the solver failed: {_0}")]
    SolverFailure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Sorted ascending.
    pub recipes: Vec<RecipeId>,
    pub objective_value: f64,
    pub totals: NutrientProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionResult {
    Feasible(Selection),
    Infeasible(Infeasibility),
}

impl SelectionResult {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub candidates: Vec<Candidate>,
    pub bounds: Vec<NutrientBound>,
    pub objective: LinearObjective,
    pub max_count: usize,
    pub required_categories: BTreeSet<MealType>,
}

impl Problem {
    /// Requires coverage of exactly the meal types present among `candidates`.
    pub fn new(
        candidates: Vec<Candidate>,
        bounds: Vec<NutrientBound>,
        objective: LinearObjective,
        max_count: usize,
    ) -> Self {
        let required_categories = categories_present(&candidates);
        Self {
            candidates,
            bounds,
            objective,
            max_count,
            required_categories,
        }
    }

    /// The problem left once `planned` recipes are part of the selection. Their nutrients count
    /// against every bound, they use up part of the cap, and their meal types are covered.
    pub fn around(mut self, planned: &[Candidate]) -> Self {
        let totals: NutrientProfile = planned.iter().map(|c| &c.nutrients).sum();
        for bound in &mut self.bounds {
            bound.min -= totals[bound.nutrient];
            bound.max -= totals[bound.nutrient];
        }
        self.max_count = self.max_count.saturating_sub(planned.len());
        for c in planned {
            self.required_categories.remove(&c.meal_type);
        }
        self.candidates
            .retain(|c| !planned.iter().any(|p| p.id == c.id));
        self
    }

    pub(crate) fn required_mask(&self) -> u8 {
        self.required_categories
            .iter()
            .fold(0, |mask, c| mask | c.bit())
    }

    /// Infeasibility that can be read off the problem without searching.
    pub fn precheck(&self) -> Option<Infeasibility> {
        if self.candidates.is_empty() {
            return Some(Infeasibility::NoCandidates);
        }

        let present = categories_present(&self.candidates);
        if let Some(missing) = self
            .required_categories
            .iter()
            .find(|c| !present.contains(c))
        {
            return Some(Infeasibility::MissingCategory(*missing));
        }

        if self.required_categories.len() > self.max_count {
            return Some(Infeasibility::CoverageExceedsCap {
                required: self.required_categories.len(),
                max_count: self.max_count,
            });
        }

        for bound in &self.bounds {
            if bound.min > bound.max + tolerance(bound.max) {
                return Some(Infeasibility::ContradictoryBounds {
                    nutrient: bound.nutrient,
                    min: bound.min,
                    max: bound.max,
                });
            }
            if bound.max < -tolerance(bound.max) {
                return Some(Infeasibility::MaximumExceeded {
                    nutrient: bound.nutrient,
                    excess: -bound.max,
                });
            }
        }

        for bound in &self.bounds {
            let mut values: Vec<f64> = self
                .candidates
                .iter()
                .map(|c| c.nutrients[bound.nutrient])
                .collect();
            values.sort_by(|a, b| b.total_cmp(a));
            let reachable: f64 = values.iter().take(self.max_count).sum();
            if reachable < bound.min - tolerance(bound.min) {
                return Some(Infeasibility::BoundOutOfReach {
                    nutrient: bound.nutrient,
                    min: bound.min,
                    reachable,
                });
            }
        }

        None
    }

    /// Checks a selection (indices into `candidates`) against every hard constraint.
    pub fn is_feasible(&self, selected: &[usize]) -> bool {
        if selected.len() > self.max_count {
            return false;
        }
        let totals: NutrientProfile = selected
            .iter()
            .map(|&i| &self.candidates[i].nutrients)
            .sum();
        let bounds_hold = self.bounds.iter().all(|b| {
            let total = totals[b.nutrient];
            total >= b.min - tolerance(b.min) && total <= b.max + tolerance(b.max)
        });
        let covered: BTreeSet<MealType> = selected
            .iter()
            .map(|&i| self.candidates[i].meal_type)
            .collect();
        bounds_hold && self.required_categories.is_subset(&covered)
    }

    pub(crate) fn selection(&self, selected: &[usize]) -> Selection {
        let totals: NutrientProfile = selected
            .iter()
            .map(|&i| &self.candidates[i].nutrients)
            .sum();
        let mut recipes: Vec<RecipeId> = selected.iter().map(|&i| self.candidates[i].id).collect();
        recipes.sort();
        recipes.dedup();
        Selection {
            recipes,
            objective_value: self.objective.evaluate(&totals),
            totals,
        }
    }
}

/// A backend able to solve a `Problem`. Implementations must be deterministic: the same problem
/// always yields the same result.
pub trait Solver {
    fn solve(&self, problem: &Problem) -> SelectionResult;
}

/// Solves with the default exact backend.
pub fn solve_selection(
    candidates: &[Candidate],
    bounds: &[NutrientBound],
    objective: &LinearObjective,
    max_count: usize,
    categories_present: &BTreeSet<MealType>,
) -> SelectionResult {
    let problem = Problem {
        candidates: candidates.to_vec(),
        bounds: bounds.to_vec(),
        objective: objective.clone(),
        max_count,
        required_categories: categories_present.clone(),
    };
    BranchAndBound::default().solve(&problem)
}

#[cfg(test)]
pub(crate) fn candidate(id: i32, meal_type: MealType, values: [f64; Nutrient::COUNT]) -> Candidate {
    Candidate {
        id: RecipeId::new(id),
        meal_type,
        nutrients: NutrientProfile::from_values(values).unwrap(),
    }
}

/// Two recipes per meal type, with calories and protein varying by id.
#[cfg(test)]
pub(crate) fn two_per_category() -> Vec<Candidate> {
    MealType::iter()
        .enumerate()
        .flat_map(|(c, meal_type)| {
            (0..2).map(move |k| {
                let id = (c * 2 + k) as i32 + 1;
                let f = id as f64;
                candidate(
                    id,
                    meal_type,
                    [300.0 + 10.0 * f, 5.0, 10.0 + f, 5.0, 30.0, 4.0, 2.0, 400.0],
                )
            })
        })
        .collect()
}

#[cfg(test)]
fn protein_objective() -> LinearObjective {
    LinearObjective::new(crate::planner::constraints::Direction::Maximize)
        .with_term(Nutrient::Protein, 1.0)
}

#[test]
fn one_recipe_per_category_when_capped() {
    let candidates = two_per_category();
    let result = solve_selection(
        &candidates,
        &[],
        &protein_objective(),
        4,
        &categories_present(&candidates),
    );
    let SelectionResult::Feasible(selection) = result else {
        panic!("expected a feasible selection, got {result:?}");
    };

    assert_eq!(selection.recipes.len(), 4);
    let chosen: BTreeSet<MealType> = candidates
        .iter()
        .filter(|c| selection.recipes.contains(&c.id))
        .map(|c| c.meal_type)
        .collect();
    assert_eq!(chosen.len(), 4);
    // the higher-protein recipe of each pair wins
    assert_eq!(
        selection.recipes,
        vec![
            RecipeId::new(2),
            RecipeId::new(4),
            RecipeId::new(6),
            RecipeId::new(8)
        ]
    );
}

#[test]
fn inverted_bound_is_infeasible() {
    let candidates = two_per_category();
    let bounds = [NutrientBound {
        nutrient: Nutrient::Calories,
        min: 5000.0,
        max: 10.0,
    }];
    let result = solve_selection(
        &candidates,
        &bounds,
        &protein_objective(),
        6,
        &categories_present(&candidates),
    );
    assert_eq!(
        result,
        SelectionResult::Infeasible(Infeasibility::ContradictoryBounds {
            nutrient: Nutrient::Calories,
            min: 5000.0,
            max: 10.0
        })
    );
}

#[test]
fn empty_pool_is_infeasible() {
    let result = solve_selection(&[], &[], &protein_objective(), 6, &BTreeSet::new());
    assert_eq!(result, SelectionResult::Infeasible(Infeasibility::NoCandidates));
}

#[test]
fn empty_selection_is_distinct_from_infeasible() {
    let candidates = vec![candidate(
        1,
        MealType::Lunch,
        [500.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    )];
    // nothing is required and the objective only loses by picking
    let objective = LinearObjective::new(crate::planner::constraints::Direction::Minimize)
        .with_term(Nutrient::Calories, 1.0);
    let result = solve_selection(&candidates, &[], &objective, 6, &BTreeSet::new());
    let SelectionResult::Feasible(selection) = result else {
        panic!("expected a feasible selection, got {result:?}");
    };
    assert!(selection.recipes.is_empty());
    assert_eq!(selection.objective_value, 0.0);
}

#[test]
fn coverage_larger_than_cap() {
    let candidates = two_per_category();
    let result = solve_selection(
        &candidates,
        &[],
        &protein_objective(),
        3,
        &categories_present(&candidates),
    );
    assert_eq!(
        result,
        SelectionResult::Infeasible(Infeasibility::CoverageExceedsCap {
            required: 4,
            max_count: 3
        })
    );
}

#[test]
fn required_category_missing_from_pool() {
    let candidates: Vec<Candidate> = two_per_category()
        .into_iter()
        .filter(|c| c.meal_type != MealType::Snack)
        .collect();
    let required: BTreeSet<MealType> = MealType::iter().collect();
    let result = solve_selection(&candidates, &[], &protein_objective(), 6, &required);
    assert_eq!(
        result,
        SelectionResult::Infeasible(Infeasibility::MissingCategory(MealType::Snack))
    );
}

#[test]
fn unreachable_minimum() {
    let candidates = two_per_category();
    let bounds = [NutrientBound {
        nutrient: Nutrient::Iron,
        min: 100.0,
        max: 200.0,
    }];
    let result = solve_selection(
        &candidates,
        &bounds,
        &protein_objective(),
        6,
        &categories_present(&candidates),
    );
    assert_eq!(
        result,
        SelectionResult::Infeasible(Infeasibility::BoundOutOfReach {
            nutrient: Nutrient::Iron,
            min: 100.0,
            reachable: 12.0
        })
    );
}

#[test]
fn tolerance_at_bound_edges() {
    let candidates = vec![
        candidate(1, MealType::Breakfast, [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        candidate(2, MealType::Breakfast, [0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    ];
    // 0.1 + 0.2 is not exactly 0.3 in floating point
    let bounds = [NutrientBound {
        nutrient: Nutrient::Calories,
        min: 0.3,
        max: 0.3,
    }];
    let problem = Problem::new(candidates, bounds.to_vec(), protein_objective(), 6);
    assert!(problem.is_feasible(&[0, 1]));
    assert!(!problem.is_feasible(&[0]));
}

#[test]
fn planned_recipes_narrow_the_problem() {
    let candidates = two_per_category();
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 1500.0,
        max: 2500.0,
    }];
    let planned = vec![candidates[0].clone(), candidates[2].clone()];
    let problem = Problem::new(candidates, bounds, protein_objective(), 6).around(&planned);

    assert_eq!(problem.max_count, 4);
    assert_eq!(problem.candidates.len(), 6);
    assert!(problem.candidates.iter().all(|c| !planned.contains(c)));
    assert_eq!(
        problem.required_categories,
        [MealType::Snack, MealType::Dinner].into_iter().collect()
    );
    // 310 + 330 calories are already planned
    assert_eq!(problem.bounds[0].min, 860.0);
    assert_eq!(problem.bounds[0].max, 1860.0);

    let SelectionResult::Feasible(selection) = BranchAndBound::default().solve(&problem) else {
        panic!("expected a feasible selection");
    };
    assert!(selection.recipes.len() <= 4);
    let calories = selection.totals[Nutrient::Calories] + 640.0;
    assert!((1500.0..=2500.0).contains(&calories), "{calories}");
}

#[test]
fn planned_recipes_over_the_maximum() {
    let candidates = two_per_category();
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 100.0,
        max: 500.0,
    }];
    let planned = vec![candidates[0].clone(), candidates[2].clone()];
    let problem = Problem::new(candidates, bounds, protein_objective(), 6).around(&planned);
    assert_eq!(
        BranchAndBound::default().solve(&problem),
        SelectionResult::Infeasible(Infeasibility::MaximumExceeded {
            nutrient: Nutrient::Calories,
            excess: 140.0
        })
    );
}

#[test]
fn backend_failure_reads_differently_from_infeasible() {
    let failure = Infeasibility::SolverFailure("out of memory".into());
    assert_eq!(failure.to_string(), "the solver failed: out of memory");
    assert_ne!(failure.to_string(), Infeasibility::ConstraintsUnsatisfiable.to_string());
}
