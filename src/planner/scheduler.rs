// Copyright 2023 Remi Bernotavicius

//! Plans a run of days for one user, one day at a time. Each solved day feeds its recipes into
//! the exclusion set seen by the days after it.

use super::constraints::{build_constraints, NutrientBound};
use super::filter::{filter_candidates, CatalogEntry};
use super::solver::{Candidate, Infeasibility, LinearObjective, Problem, SelectionResult, Solver};
use crate::config::PlannerConfig;
use crate::database;
use crate::database::models::{IngredientId, RecipeId, UserId};
use crate::query;
use chrono::{Days, NaiveDate};
use derive_more::Display;
use diesel::Connection as _;
use diesel::QueryResult;
use std::collections::HashSet;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum DayStatus {
    /// A day the run has not reached yet. Outcomes returned by a finished run never carry it.
    #[display("pending")]
    Pending,
    #[display("skipped")]
    Skipped,
    #[display("solved")]
    Solved,
    #[display("infeasible: {_0}")]
    Infeasible(Infeasibility),
    /// The database refused the day's changes. They were rolled back.
    #[display("failed: {_0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub day: NaiveDate,
    pub status: DayStatus,
    /// Everything assigned to the day once it was processed, sorted.
    pub recipes: Vec<RecipeId>,
}

/// What stays fixed for the whole run.
struct RunInputs<'a> {
    user: UserId,
    catalog: Vec<CatalogEntry>,
    disliked: HashSet<IngredientId>,
    bounds: Vec<NutrientBound>,
    objective: LinearObjective,
    config: &'a PlannerConfig,
    solver: &'a dyn Solver,
}

pub fn run_weekly_plan(
    conn: &mut database::Connection,
    user: UserId,
    anchor: NaiveDate,
    config: &PlannerConfig,
) -> crate::Result<Vec<DayOutcome>> {
    let solver = config.solver();
    run_weekly_plan_with(conn, user, anchor, config, solver.as_ref())
}

/// Holds a write lock on the database for the whole run, so two runs for the same user cannot
/// both read the exclusion set before either has written.
pub fn run_weekly_plan_with(
    conn: &mut database::Connection,
    user: UserId,
    anchor: NaiveDate,
    config: &PlannerConfig,
    solver: &dyn Solver,
) -> crate::Result<Vec<DayOutcome>> {
    let horizon: Vec<NaiveDate> = anchor
        .iter_days()
        .take(config.horizon_days as usize)
        .collect();
    let Some(&last) = horizon.last() else {
        return Ok(vec![]);
    };

    conn.immediate_transaction(|conn| {
        let preference = query::nutrient_preference(conn, user)?;
        let constraints = build_constraints(&preference);
        let inputs = RunInputs {
            user,
            catalog: query::load_catalog(conn, None)?,
            disliked: query::disliked_ingredients(conn, user)?,
            bounds: constraints.bounds,
            objective: constraints.objective.linear(config.secondary_weight),
            config,
            solver,
        };
        log::debug!(
            "planning {} days from {anchor} for user {user} over {} recipes",
            horizon.len(),
            inputs.catalog.len()
        );

        let mut excluded = query::planned_recipes_between(conn, user, anchor, last)?;
        let window_start = anchor
            .checked_sub_days(Days::new(config.variety_window_days))
            .unwrap_or(NaiveDate::MIN);
        excluded.extend(query::recently_used_recipes(
            conn,
            user,
            window_start,
            anchor,
        )?);

        let mut outcomes: Vec<DayOutcome> = horizon
            .iter()
            .map(|&day| DayOutcome {
                day,
                status: DayStatus::Pending,
                recipes: vec![],
            })
            .collect();
        for outcome in &mut outcomes {
            let day = outcome.day;
            let result = conn.transaction(|conn| plan_day(conn, &inputs, day, &mut excluded));
            *outcome = result.unwrap_or_else(|error| DayOutcome {
                day,
                status: DayStatus::Failed(error.to_string()),
                recipes: vec![],
            });
            match &outcome.status {
                DayStatus::Infeasible(_) | DayStatus::Failed(_) => {
                    log::warn!("{day}: {}", outcome.status)
                }
                status => log::info!("{day}: {status} with {} recipes", outcome.recipes.len()),
            }
        }
        Ok(outcomes)
    })
}

fn plan_day(
    conn: &mut database::Connection,
    inputs: &RunInputs<'_>,
    day: NaiveDate,
    excluded: &mut HashSet<RecipeId>,
) -> QueryResult<DayOutcome> {
    let plan = query::get_or_create_day_plan(conn, inputs.user, day)?;
    let mut recipes = query::day_plan_recipes(conn, plan.id)?;
    if recipes.len() >= inputs.config.min_recipes_per_day {
        return Ok(DayOutcome {
            day,
            status: DayStatus::Skipped,
            recipes,
        });
    }

    // recipes already on the day stay, and the selection only fills the room they leave
    let planned: Vec<Candidate> = inputs
        .catalog
        .iter()
        .filter(|e| recipes.contains(&e.id))
        .map(CatalogEntry::candidate)
        .collect();
    let candidates = filter_candidates(&inputs.catalog, &inputs.disliked, excluded);
    let problem = Problem::new(
        candidates,
        inputs.bounds.clone(),
        inputs.objective.clone(),
        inputs.config.max_count,
    )
    .around(&planned);
    let status = match inputs.solver.solve(&problem) {
        SelectionResult::Feasible(selection) => {
            for &recipe in &selection.recipes {
                query::assign_recipe(conn, plan.id, recipe)?;
                query::record_usage(conn, inputs.user, recipe, day)?;
                recipes.push(recipe);
            }
            excluded.extend(selection.recipes.iter().copied());
            DayStatus::Solved
        }
        SelectionResult::Infeasible(reason) => DayStatus::Infeasible(reason),
    };

    recipes.sort();
    Ok(DayOutcome {
        day,
        status,
        recipes,
    })
}

#[cfg(test)]
use crate::database::models::{MealType, RecipeIngredient};

#[cfg(test)]
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// Ten recipes per meal type at 450 calories each, protein rising with the id.
#[cfg(test)]
fn seed_catalog(conn: &mut database::Connection) -> Vec<RecipeId> {
    MealType::iter()
        .flat_map(|meal_type| (0..10).map(move |k| (meal_type, k)))
        .enumerate()
        .map(|(i, (meal_type, _))| {
            let protein = 10.0 + i as f64;
            query::seed_recipe(
                conn,
                &format!("{meal_type} {i}"),
                meal_type,
                [450.0, 5.0, protein, 10.0, 50.0, 4.0, 2.0, 500.0],
            )
        })
        .collect()
}

#[cfg(test)]
fn count_assignments(conn: &mut database::Connection) -> i64 {
    use diesel::{QueryDsl as _, RunQueryDsl as _};

    database::schema::day_plan_recipes::table
        .count()
        .get_result(conn)
        .unwrap()
}

#[test]
fn week_without_repeats() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    seed_catalog(&mut conn);

    let outcomes =
        run_weekly_plan(&mut conn, user, monday(), &PlannerConfig::default()).unwrap();
    assert_eq!(outcomes.len(), 7);
    assert!(outcomes.iter().all(|o| o.status != DayStatus::Pending));

    let mut seen = HashSet::new();
    for outcome in &outcomes {
        assert_eq!(outcome.status, DayStatus::Solved, "{}", outcome.day);
        // four meal types at 450 calories each sit inside the 1500-2500 baseline
        assert!(outcome.recipes.len() >= 4 && outcome.recipes.len() <= 5);
        for recipe in &outcome.recipes {
            assert!(seen.insert(*recipe), "{recipe} planned twice");
        }
    }

    let records = query::usage_records(&mut conn, user).unwrap();
    assert_eq!(records.len(), seen.len());
    let sunday = monday().checked_add_days(Days::new(6)).unwrap();
    assert!(records
        .iter()
        .all(|r| r.last_used >= monday() && r.last_used <= sunday));
}

#[test]
fn second_run_is_a_no_op() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    seed_catalog(&mut conn);
    let config = PlannerConfig::default();

    let first = run_weekly_plan(&mut conn, user, monday(), &config).unwrap();
    let assignments = count_assignments(&mut conn);

    let second = run_weekly_plan(&mut conn, user, monday(), &config).unwrap();
    assert!(second.iter().all(|o| o.status == DayStatus::Skipped));
    assert_eq!(count_assignments(&mut conn), assignments);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.recipes, b.recipes);
    }
}

#[test]
fn filled_day_is_left_alone() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    let ids = seed_catalog(&mut conn);

    let tuesday = monday().succ_opt().unwrap();
    let plan = query::get_or_create_day_plan(&mut conn, user, tuesday).unwrap();
    let mut existing = vec![ids[0], ids[15], ids[30]];
    for &recipe in &existing {
        query::assign_recipe(&mut conn, plan.id, recipe).unwrap();
    }
    existing.sort();

    let outcomes =
        run_weekly_plan(&mut conn, user, monday(), &PlannerConfig::default()).unwrap();
    assert_eq!(outcomes[1].day, tuesday);
    assert_eq!(outcomes[1].status, DayStatus::Skipped);
    assert_eq!(outcomes[1].recipes, existing);
    assert_eq!(
        query::day_plan_recipes(&mut conn, plan.id).unwrap(),
        existing
    );

    // recipes already planned for Tuesday are not reused on other days
    for outcome in outcomes.iter().filter(|o| o.day != tuesday) {
        assert!(outcome.recipes.iter().all(|r| !existing.contains(r)));
    }
}

#[test]
fn infeasible_days_do_not_stop_the_run() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    let garlic = query::find_or_add_ingredient(&mut conn, "garlic").unwrap();
    for id in seed_catalog(&mut conn) {
        let usage = RecipeIngredient {
            recipe_id: id,
            ingredient_id: garlic,
            quantity: Some(1.0),
            unit: Some("clove".into()),
        };
        query::add_recipe_ingredient(&mut conn, usage).unwrap();
    }
    query::add_disliked_ingredient(&mut conn, user, garlic).unwrap();

    let outcomes =
        run_weekly_plan(&mut conn, user, monday(), &PlannerConfig::default()).unwrap();
    assert_eq!(outcomes.len(), 7);
    for outcome in &outcomes {
        assert_eq!(
            outcome.status,
            DayStatus::Infeasible(Infeasibility::NoCandidates)
        );
        assert!(outcome.recipes.is_empty());
    }
    assert_eq!(count_assignments(&mut conn), 0);
}

#[test]
fn catalog_runs_out_part_way() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    for meal_type in MealType::iter() {
        for k in 0..2 {
            query::seed_recipe(
                &mut conn,
                &format!("{meal_type} {k}"),
                meal_type,
                [450.0, 5.0, 20.0, 10.0, 50.0, 4.0, 2.0, 500.0],
            );
        }
    }

    // the first day takes five of the eight recipes and three cannot reach 1500 calories
    let outcomes =
        run_weekly_plan(&mut conn, user, monday(), &PlannerConfig::default()).unwrap();
    assert_eq!(outcomes[0].status, DayStatus::Solved);
    assert_eq!(outcomes[0].recipes.len(), 5);
    for outcome in &outcomes[1..] {
        assert!(
            matches!(
                outcome.status,
                DayStatus::Infeasible(Infeasibility::BoundOutOfReach { .. })
            ),
            "{}: {}",
            outcome.day,
            outcome.status
        );
        assert!(outcome.recipes.is_empty());
    }
}

#[test]
fn recent_usage_is_excluded() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    let ids = seed_catalog(&mut conn);
    let yesterday = monday().pred_opt().unwrap();
    let long_ago = monday().checked_sub_days(Days::new(30)).unwrap();
    query::record_usage(&mut conn, user, ids[9], yesterday).unwrap();
    query::record_usage(&mut conn, user, ids[19], long_ago).unwrap();

    let config = PlannerConfig {
        horizon_days: 1,
        ..PlannerConfig::default()
    };
    let outcomes = run_weekly_plan(&mut conn, user, monday(), &config).unwrap();
    assert_eq!(outcomes.len(), 1);
    // ids 9 and 19 have the most protein among breakfasts and lunches
    assert!(!outcomes[0].recipes.contains(&ids[9]));
    assert!(outcomes[0].recipes.contains(&ids[19]));
}

#[test]
fn empty_horizon() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    let config = PlannerConfig {
        horizon_days: 0,
        ..PlannerConfig::default()
    };
    assert!(run_weekly_plan(&mut conn, user, monday(), &config)
        .unwrap()
        .is_empty());
}

#[test]
fn partially_filled_day_stays_within_limits() {
    let mut conn = database::establish_in_memory().unwrap();
    let user = query::add_user(&mut conn, "sam").unwrap();
    let ids = seed_catalog(&mut conn);

    let tuesday = monday().succ_opt().unwrap();
    let plan = query::get_or_create_day_plan(&mut conn, user, tuesday).unwrap();
    query::assign_recipe(&mut conn, plan.id, ids[0]).unwrap();
    query::assign_recipe(&mut conn, plan.id, ids[10]).unwrap();

    let outcomes =
        run_weekly_plan(&mut conn, user, monday(), &PlannerConfig::default()).unwrap();
    let outcome = &outcomes[1];
    assert_eq!(outcome.day, tuesday);
    assert_eq!(outcome.status, DayStatus::Solved);
    assert!(outcome.recipes.contains(&ids[0]));
    assert!(outcome.recipes.contains(&ids[10]));
    assert_eq!(
        query::day_plan_recipes(&mut conn, plan.id).unwrap(),
        outcome.recipes
    );

    // every recipe is 450 calories, so the 1500-2500 range allows four or five
    assert!(outcome.recipes.len() <= PlannerConfig::default().max_count);
    let calories = outcome.recipes.len() as f64 * 450.0;
    assert!((1500.0..=2500.0).contains(&calories), "{calories}");
    assert_eq!(outcome.recipes.len(), 5);

    let catalog = query::load_catalog(&mut conn, None).unwrap();
    let covered: HashSet<MealType> = catalog
        .iter()
        .filter(|e| outcome.recipes.contains(&e.id))
        .map(|e| e.meal_type)
        .collect();
    assert_eq!(covered.len(), MealType::COUNT);

    // only the added recipes get a usage record for Tuesday
    let records = query::usage_records(&mut conn, user).unwrap();
    assert!(records.iter().all(|r| r.recipe_id != ids[0] && r.recipe_id != ids[10]));
}

#[test]
fn locked_database_refuses_a_second_run() {
    use diesel::RunQueryDsl as _;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.sqlite");
    let mut first = database::establish_connection(&path).unwrap();
    let mut second = database::establish_connection(&path).unwrap();
    let user = query::add_user(&mut first, "sam").unwrap();
    seed_catalog(&mut first);
    diesel::sql_query("PRAGMA busy_timeout = 0")
        .execute(&mut second)
        .unwrap();

    let config = PlannerConfig::default();
    first
        .immediate_transaction(|_| {
            assert!(run_weekly_plan(&mut second, user, monday(), &config).is_err());
            QueryResult::Ok(())
        })
        .unwrap();
    assert_eq!(count_assignments(&mut first), 0);

    let planned = run_weekly_plan(&mut second, user, monday(), &config).unwrap();
    assert!(planned.iter().all(|o| o.status == DayStatus::Solved));
    let again = run_weekly_plan(&mut first, user, monday(), &config).unwrap();
    assert!(again.iter().all(|o| o.status == DayStatus::Skipped));
}

#[test]
fn simultaneous_runs_never_share_a_recipe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.sqlite");
    let mut setup = database::establish_connection(&path).unwrap();
    let user = query::add_user(&mut setup, "sam").unwrap();
    seed_catalog(&mut setup);

    let config = PlannerConfig::default();
    let runs: Vec<Vec<DayOutcome>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let mut conn = database::establish_connection(&path).unwrap();
                let config = &config;
                scope.spawn(move || run_weekly_plan(&mut conn, user, monday(), config).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // whichever run took the lock second found every day filled
    let all = |run: &Vec<DayOutcome>, status: DayStatus| run.iter().all(|o| o.status == status);
    assert_eq!(
        runs.iter().filter(|run| all(run, DayStatus::Solved)).count(),
        1
    );
    assert_eq!(
        runs.iter().filter(|run| all(run, DayStatus::Skipped)).count(),
        1
    );

    let mut seen = HashSet::new();
    for (day, recipes) in query::week_plan(&mut setup, user, monday(), 7).unwrap() {
        for recipe in recipes {
            assert!(seen.insert(recipe.id), "{} planned twice, again on {day}", recipe.id);
        }
    }
    assert_eq!(count_assignments(&mut setup), seen.len() as i64);
}
