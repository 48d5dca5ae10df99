// Copyright 2023 Remi Bernotavicius

//! The same formulation handed to an integer programming backend through `good_lp`.

use super::{Infeasibility, Problem, SelectionResult, Solver};
use crate::planner::constraints::Direction;
use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};

#[derive(Debug, Clone, Default)]
pub struct LpSolver;

impl Solver for LpSolver {
    fn solve(&self, problem: &Problem) -> SelectionResult {
        if let Some(reason) = problem.precheck() {
            return SelectionResult::Infeasible(reason);
        }

        let mut vars = variables!();
        let picks: Vec<Variable> = problem
            .candidates
            .iter()
            .map(|_| vars.add(variable().binary()))
            .collect();

        let objective: Expression = problem
            .candidates
            .iter()
            .zip(&picks)
            .map(|(c, &v)| problem.objective.evaluate(&c.nutrients) * v)
            .sum();
        let unsolved = match problem.objective.direction() {
            Direction::Maximize => vars.maximise(objective),
            Direction::Minimize => vars.minimise(objective),
        };
        let mut model = unsolved.using(default_solver);

        for bound in &problem.bounds {
            let total: Expression = problem
                .candidates
                .iter()
                .zip(&picks)
                .map(|(c, &v)| c.nutrients[bound.nutrient] * v)
                .sum();
            model = model
                .with(constraint!(total.clone() >= bound.min))
                .with(constraint!(total <= bound.max));
        }

        let count: Expression = picks.iter().copied().sum();
        let cap = problem.max_count as f64;
        model = model.with(constraint!(count <= cap));

        for category in &problem.required_categories {
            let covered: Expression = problem
                .candidates
                .iter()
                .zip(&picks)
                .filter(|(c, _)| c.meal_type == *category)
                .map(|(_, &v)| v)
                .sum();
            model = model.with(constraint!(covered >= 1.0));
        }

        match model.solve() {
            Ok(solution) => {
                let selected: Vec<usize> = picks
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| solution.value(**v) > 0.5)
                    .map(|(i, _)| i)
                    .collect();
                if problem.is_feasible(&selected) {
                    SelectionResult::Feasible(problem.selection(&selected))
                } else {
                    log::warn!("integer solver returned a selection that fails verification");
                    SelectionResult::Infeasible(Infeasibility::SolverFailure(
                        "returned selection fails verification".into(),
                    ))
                }
            }
            Err(error) => SelectionResult::Infeasible(resolution_failure(error)),
        }
    }
}

fn resolution_failure(error: ResolutionError) -> Infeasibility {
    match error {
        ResolutionError::Infeasible => Infeasibility::ConstraintsUnsatisfiable,
        error => {
            log::warn!("integer solver failed: {error}");
            Infeasibility::SolverFailure(error.to_string())
        }
    }
}

#[test]
fn backend_errors_are_not_reported_as_infeasible() {
    assert_eq!(
        resolution_failure(ResolutionError::Infeasible),
        Infeasibility::ConstraintsUnsatisfiable
    );
    assert!(matches!(
        resolution_failure(ResolutionError::Unbounded),
        Infeasibility::SolverFailure(_)
    ));
    let Infeasibility::SolverFailure(message) =
        resolution_failure(ResolutionError::Str("numerical trouble".into()))
    else {
        panic!("expected a solver failure");
    };
    assert!(message.contains("numerical trouble"), "{message}");
}

#[test]
fn agrees_with_branch_and_bound() {
    use super::{two_per_category, BranchAndBound, LinearObjective};
    use crate::database::models::Nutrient;
    use crate::planner::constraints::NutrientBound;

    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Protein, 1.0);
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 1200.0,
        max: 1500.0,
    }];
    let problem = Problem::new(two_per_category(), bounds, objective, 6);

    let exact = BranchAndBound {
        relative_gap: 0.0,
        ..BranchAndBound::default()
    }
    .solve(&problem);
    let lp = LpSolver.solve(&problem);
    match (exact, lp) {
        (SelectionResult::Feasible(a), SelectionResult::Feasible(b)) => {
            assert!((a.objective_value - b.objective_value).abs() < 1e-6);
        }
        (a, b) => panic!("backends disagree: {a:?} vs {b:?}"),
    }
}
