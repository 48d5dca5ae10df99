// Copyright 2023 Remi Bernotavicius

//! Exact depth-first branch and bound.
//!
//! Candidates are ordered by objective score (best first, ties by recipe id) and subsets are
//! enumerated in that order with the include branch explored first, so the first optimum found is
//! always the same one. A branch is cut when it cannot cover the remaining meal types, cannot
//! reach some nutrient minimum, cannot fit one recipe of every uncovered meal type under some
//! maximum, or cannot beat the incumbent by more than the relative gap. Because nutrients are
//! non-negative, any pick pushing a sum above its maximum is skipped outright.
//!
//! The incumbent test takes the tightest of several ceilings. Besides the plain one, each
//! nutrient bound is folded into the score with a multiplier `m`: a completion adding at least
//! `need` of the nutrient scores at most `sum(score + m x nutrient) - m x need`, and one adding at
//! most `room` scores at most `sum(score - m x nutrient) + m x room`. The shifted scores are extra
//! channels of the same suffix tables.

use super::{tolerance, Infeasibility, Problem, SelectionResult, Solver};
use crate::database::models::{MealType, Nutrient};
use std::cmp::Ordering;
use std::time::{Duration, Instant};

const SCORE_EPSILON: f64 = 1e-9;
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Channel index of the objective score, after the eight nutrients. Relaxed scores follow it.
const SCORE: usize = Nutrient::COUNT;
const RELAXED: usize = SCORE + 1;

#[derive(Debug, Clone)]
pub struct BranchAndBound {
    /// Search nodes to visit before giving up with `Infeasibility::Timeout`.
    pub node_limit: u64,
    pub time_limit: Option<Duration>,
    /// Branches that cannot beat the incumbent by more than this fraction of its score are cut.
    /// Zero asks for a proven optimum.
    pub relative_gap: f64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self {
            node_limit: 2_000_000,
            time_limit: None,
            relative_gap: 1e-3,
        }
    }
}

impl Solver for BranchAndBound {
    fn solve(&self, problem: &Problem) -> SelectionResult {
        if let Some(reason) = problem.precheck() {
            return SelectionResult::Infeasible(reason);
        }

        let mut search = Search::new(problem, self);
        search.explore(0);
        log::debug!(
            "branch and bound visited {} nodes over {} candidates",
            search.nodes,
            search.items.len()
        );

        if search.aborted {
            return SelectionResult::Infeasible(Infeasibility::Timeout);
        }
        match search.best {
            Some((_, picks)) => {
                let selected: Vec<usize> = picks.iter().map(|&p| search.items[p].index).collect();
                SelectionResult::Feasible(problem.selection(&selected))
            }
            None => SelectionResult::Infeasible(Infeasibility::ConstraintsUnsatisfiable),
        }
    }
}

/// One nutrient bound folded into the score. Its channel holds `score + weight x nutrient`, so a
/// completion's score is at most that channel's sum minus `weight x limit`. A positive weight
/// relaxes a minimum, a negative one a maximum.
#[derive(Debug, Clone, PartialEq)]
struct Relaxation {
    nutrient: Nutrient,
    weight: f64,
    limit: f64,
}

fn relaxations(problem: &Problem) -> Vec<Relaxation> {
    let mut relaxations = vec![];
    for bound in &problem.bounds {
        let nutrient = bound.nutrient;
        let direct = problem.objective.score_weight(nutrient);
        // best score per unit of the nutrient
        let ratio = problem
            .candidates
            .iter()
            .filter(|c| c.nutrients[nutrient] > 0.0)
            .map(|c| problem.objective.score(&c.nutrients) / c.nutrients[nutrient])
            .fold(f64::NEG_INFINITY, f64::max);

        if bound.min > 0.0 {
            for weight in [-direct, -ratio] {
                if weight > 0.0 && weight.is_finite() {
                    relaxations.push(Relaxation {
                        nutrient,
                        weight,
                        limit: bound.min - tolerance(bound.min),
                    });
                }
            }
        }
        for weight in [direct, ratio] {
            if weight > 0.0 && weight.is_finite() {
                relaxations.push(Relaxation {
                    nutrient,
                    weight: -weight,
                    limit: bound.max + tolerance(bound.max),
                });
            }
        }
    }
    relaxations.dedup();
    relaxations
}

struct Item {
    /// Position in `Problem::candidates`.
    index: usize,
    channels: Vec<f64>,
    meal_type: MealType,
}

struct Search<'a> {
    problem: &'a Problem,
    items: Vec<Item>,
    relaxations: Vec<Relaxation>,
    channels: usize,
    /// For each suffix `items[i..]` and channel, the best `max_count` values, descending and
    /// padded with zeros. Row `i` starts at `(i * channels + channel) * max_count`.
    suffix_top: Vec<f64>,
    /// For each suffix, meal type and channel, the largest value among that meal type.
    suffix_best: Vec<f64>,
    /// For each suffix, meal type and nutrient, the smallest value among that meal type.
    suffix_least: Vec<f64>,
    suffix_categories: Vec<u8>,
    required: u8,
    relative_gap: f64,

    picks: Vec<usize>,
    sums: Vec<f64>,
    covered: u8,
    best: Option<(f64, Vec<usize>)>,

    nodes: u64,
    node_limit: u64,
    deadline: Option<Instant>,
    aborted: bool,
}

impl<'a> Search<'a> {
    fn new(problem: &'a Problem, config: &BranchAndBound) -> Self {
        let relaxations = relaxations(problem);
        let channels = RELAXED + relaxations.len();

        let mut items: Vec<Item> = problem
            .candidates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let score = problem.objective.score(&c.nutrients);
                let mut values = c.nutrients.values().to_vec();
                values.push(score);
                values.extend(
                    relaxations
                        .iter()
                        .map(|r| score + r.weight * c.nutrients[r.nutrient]),
                );
                Item {
                    index,
                    channels: values,
                    meal_type: c.meal_type,
                }
            })
            .collect();
        items.sort_by(|a, b| {
            b.channels[SCORE]
                .total_cmp(&a.channels[SCORE])
                .then_with(|| {
                    problem.candidates[a.index]
                        .id
                        .cmp(&problem.candidates[b.index].id)
                })
        });

        let k = problem.max_count;
        let n = items.len();
        let mut suffix_top = vec![0.0; (n + 1) * channels * k];
        let mut suffix_best = vec![f64::NEG_INFINITY; (n + 1) * MealType::COUNT * channels];
        let mut suffix_least = vec![f64::INFINITY; (n + 1) * MealType::COUNT * Nutrient::COUNT];
        let mut suffix_categories = vec![0; n + 1];
        for i in (0..n).rev() {
            let item = &items[i];
            suffix_categories[i] = suffix_categories[i + 1] | item.meal_type.bit();

            for channel in 0..channels {
                let next = (i + 1) * channels + channel;
                let here = i * channels + channel;
                let merged = insert_top(&suffix_top[next * k..(next + 1) * k], item.channels[channel]);
                suffix_top[here * k..(here + 1) * k].copy_from_slice(&merged);
            }

            let width = MealType::COUNT * channels;
            suffix_best.copy_within((i + 1) * width..(i + 2) * width, i * width);
            let row = i * width + item.meal_type.index() * channels;
            for (best, &v) in suffix_best[row..row + channels].iter_mut().zip(&item.channels) {
                *best = best.max(v);
            }

            let width = MealType::COUNT * Nutrient::COUNT;
            suffix_least.copy_within((i + 1) * width..(i + 2) * width, i * width);
            let row = i * width + item.meal_type.index() * Nutrient::COUNT;
            for (least, &v) in suffix_least[row..row + Nutrient::COUNT]
                .iter_mut()
                .zip(&item.channels)
            {
                *least = least.min(v);
            }
        }

        Self {
            problem,
            items,
            relaxations,
            channels,
            suffix_top,
            suffix_best,
            suffix_least,
            suffix_categories,
            required: problem.required_mask(),
            relative_gap: config.relative_gap.max(0.0),

            picks: vec![],
            sums: vec![0.0; channels],
            covered: 0,
            best: None,

            nodes: 0,
            node_limit: config.node_limit,
            deadline: config.time_limit.map(|limit| Instant::now() + limit),
            aborted: false,
        }
    }

    /// Sum of the best `count` non-negative values of `channel` among `items[start..]`.
    fn optimistic(&self, start: usize, channel: usize, count: usize) -> f64 {
        let k = self.problem.max_count;
        let row = (start * self.channels + channel) * k;
        self.suffix_top[row..row + count.min(k)]
            .iter()
            .map(|v| v.max(0.0))
            .sum()
    }

    /// The most `channel` can grow by picking at most `remaining` of `items[start..]`, one of
    /// them from every meal type in `uncovered`.
    fn completion(&self, start: usize, channel: usize, remaining: usize, uncovered: u8) -> f64 {
        let mut total = 0.0;
        let mut forced = 0;
        for meal_type in MealType::iter().filter(|m| uncovered & m.bit() != 0) {
            let at = (start * MealType::COUNT + meal_type.index()) * self.channels + channel;
            total += self.suffix_best[at];
            forced += 1;
        }
        total + self.optimistic(start, channel, remaining.saturating_sub(forced))
    }

    /// The least of `nutrient` that covering every meal type in `uncovered` from `items[start..]`
    /// adds.
    fn least_addition(&self, start: usize, nutrient: Nutrient, uncovered: u8) -> f64 {
        MealType::iter()
            .filter(|m| uncovered & m.bit() != 0)
            .map(|m| {
                self.suffix_least
                    [(start * MealType::COUNT + m.index()) * Nutrient::COUNT + nutrient.index()]
            })
            .sum()
    }

    fn tick(&mut self) -> bool {
        self.nodes += 1;
        if self.nodes > self.node_limit {
            self.aborted = true;
        } else if self.nodes % CLOCK_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.aborted = true;
                }
            }
        }
        !self.aborted
    }

    fn record_if_better(&mut self) {
        if self.covered & self.required != self.required {
            return;
        }
        let bounds_hold = self.problem.bounds.iter().all(|b| {
            let sum = self.sums[b.nutrient.index()];
            sum >= b.min - tolerance(b.min) && sum <= b.max + tolerance(b.max)
        });
        if !bounds_hold {
            return;
        }
        let score = self.sums[SCORE];
        if self
            .best
            .as_ref()
            .map_or(true, |(best, _)| score > best + SCORE_EPSILON)
        {
            self.best = Some((score, self.picks.clone()));
        }
    }

    /// Whether some completion drawing only from `items[start..]` could still be feasible and
    /// better than the incumbent. Monotone in `start`.
    fn promising(&self, start: usize, remaining: usize) -> bool {
        let uncovered = self.required & !self.covered;
        if uncovered.count_ones() as usize > remaining {
            return false;
        }
        if uncovered & !self.suffix_categories[start] != 0 {
            return false;
        }
        for bound in &self.problem.bounds {
            let channel = bound.nutrient.index();
            let reachable = self.sums[channel] + self.optimistic(start, channel, remaining);
            if reachable < bound.min - tolerance(bound.min) {
                return false;
            }
            let least = self.sums[channel] + self.least_addition(start, bound.nutrient, uncovered);
            if least > bound.max + tolerance(bound.max) {
                return false;
            }
        }
        if let Some((best, _)) = &self.best {
            let threshold = best + (self.relative_gap * best.abs()).max(SCORE_EPSILON);
            let ceiling = self.sums[SCORE] + self.completion(start, SCORE, remaining, uncovered);
            if ceiling <= threshold {
                return false;
            }
            for (offset, relaxation) in self.relaxations.iter().enumerate() {
                let channel = RELAXED + offset;
                let ceiling = self.sums[channel]
                    + self.completion(start, channel, remaining, uncovered)
                    - relaxation.weight * relaxation.limit;
                if ceiling <= threshold {
                    return false;
                }
            }
        }
        true
    }

    fn fits(&self, item: &Item) -> bool {
        self.problem.bounds.iter().all(|b| {
            let channel = b.nutrient.index();
            self.sums[channel] + item.channels[channel] <= b.max + tolerance(b.max)
        })
    }

    fn apply(&mut self, next: usize, sign: f64) {
        for (sum, v) in self.sums.iter_mut().zip(&self.items[next].channels) {
            *sum += sign * v;
        }
    }

    fn explore(&mut self, start: usize) {
        self.record_if_better();

        let remaining = self.problem.max_count - self.picks.len();
        if remaining == 0 {
            return;
        }

        for next in start..self.items.len() {
            if !self.tick() || !self.promising(next, remaining) {
                return;
            }
            if !self.fits(&self.items[next]) {
                continue;
            }

            let previous_covered = self.covered;
            self.apply(next, 1.0);
            self.covered |= self.items[next].meal_type.bit();
            self.picks.push(next);

            self.explore(next + 1);

            self.picks.pop();
            self.covered = previous_covered;
            self.apply(next, -1.0);
            if self.aborted {
                return;
            }
        }
    }
}

/// `top` with `value` merged in, keeping the same length.
fn insert_top(top: &[f64], value: f64) -> Vec<f64> {
    let mut merged = Vec::with_capacity(top.len());
    let mut pending = Some(value);
    for &v in top {
        if merged.len() == top.len() {
            break;
        }
        if let Some(p) = pending {
            if p.total_cmp(&v) == Ordering::Greater {
                merged.push(p);
                pending = None;
                if merged.len() == top.len() {
                    break;
                }
            }
        }
        merged.push(v);
    }
    if let Some(p) = pending {
        if merged.len() < top.len() {
            merged.push(p);
        }
    }
    merged
}

#[cfg(test)]
use super::{candidate, categories_present, two_per_category, LinearObjective};
#[cfg(test)]
use crate::planner::constraints::{Direction, NutrientBound};

#[cfg(test)]
fn brute_force(problem: &Problem) -> Option<f64> {
    let n = problem.candidates.len();
    let mut best: Option<f64> = None;
    for mask in 0u32..(1 << n) {
        let selected: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        if !problem.is_feasible(&selected) {
            continue;
        }
        let totals = problem.selection(&selected).totals;
        let score = problem.objective.score(&totals);
        if best.map_or(true, |b| score > b) {
            best = Some(score);
        }
    }
    best
}

#[cfg(test)]
fn mixed_catalog() -> Vec<super::Candidate> {
    use MealType::*;
    vec![
        candidate(1, Breakfast, [350.0, 12.0, 15.0, 9.0, 50.0, 6.0, 3.0, 500.0]),
        candidate(2, Breakfast, [420.0, 25.0, 22.0, 14.0, 48.0, 3.0, 2.0, 350.0]),
        candidate(3, Breakfast, [280.0, 4.0, 18.0, 11.0, 20.0, 2.0, 4.0, 300.0]),
        candidate(4, Lunch, [650.0, 8.0, 40.0, 22.0, 60.0, 9.0, 6.0, 1100.0]),
        candidate(5, Lunch, [540.0, 5.0, 35.0, 18.0, 45.0, 7.0, 5.0, 900.0]),
        candidate(6, Lunch, [720.0, 15.0, 28.0, 30.0, 75.0, 5.0, 4.0, 800.0]),
        candidate(7, Snack, [180.0, 14.0, 6.0, 8.0, 22.0, 3.0, 1.0, 250.0]),
        candidate(8, Snack, [220.0, 3.0, 12.0, 14.0, 10.0, 4.0, 2.0, 420.0]),
        candidate(9, Dinner, [780.0, 9.0, 48.0, 28.0, 70.0, 8.0, 7.0, 1300.0]),
        candidate(10, Dinner, [610.0, 6.0, 42.0, 20.0, 55.0, 10.0, 6.0, 1200.0]),
        candidate(11, Dinner, [500.0, 4.0, 30.0, 15.0, 40.0, 6.0, 5.0, 950.0]),
        candidate(12, Snack, [150.0, 18.0, 3.0, 6.0, 25.0, 2.0, 1.0, 200.0]),
    ]
}

/// Thirty recipes per meal type with calories spread over 150 to 900.
#[cfg(test)]
fn large_catalog() -> Vec<super::Candidate> {
    let mut state: u64 = 0x2545_f491;
    let mut next = move |low: u64, high: u64| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (low + (state >> 33) % (high - low + 1)) as f64
    };
    let meal_types: Vec<MealType> = MealType::iter().collect();
    (0..120)
        .map(|i| {
            let calories = next(150, 900);
            let sugars = next(0, 30);
            let protein = next(5, 45);
            candidate(
                i as i32 + 1,
                meal_types[i % meal_types.len()],
                [calories, sugars, protein, 12.0, 40.0, 4.0, 2.0, 400.0],
            )
        })
        .collect()
}

#[test]
fn top_values_merge() {
    assert_eq!(insert_top(&[5.0, 3.0, 0.0], 4.0), vec![5.0, 4.0, 3.0]);
    assert_eq!(insert_top(&[5.0, 3.0, 1.0], 0.5), vec![5.0, 3.0, 1.0]);
    assert_eq!(insert_top(&[5.0, 3.0], 9.0), vec![9.0, 5.0]);
    assert_eq!(insert_top(&[], 9.0), Vec::<f64>::new());
}

#[test]
fn matches_exhaustive_search() {
    let candidates = mixed_catalog();
    let shapes = [
        (Direction::Maximize, Nutrient::Protein, 0.0),
        (Direction::Minimize, Nutrient::Calories, 0.0),
        (Direction::Maximize, Nutrient::Fiber, 0.001),
        (Direction::Minimize, Nutrient::Sugars, 1.0),
    ];
    let bounds = vec![
        NutrientBound {
            nutrient: Nutrient::Calories,
            min: 1500.0,
            max: 2500.0,
        },
        NutrientBound {
            nutrient: Nutrient::Sugars,
            min: 1.0,
            max: 50.0,
        },
        NutrientBound {
            nutrient: Nutrient::Potassium,
            min: 3000.0,
            max: 5000.0,
        },
    ];

    for (direction, nutrient, blend) in shapes {
        let objective = LinearObjective::new(direction)
            .with_term(nutrient, 1.0)
            .with_blend(&super::objective::SECONDARY_BLEND, blend);
        let problem = Problem::new(candidates.clone(), bounds.clone(), objective, 6);

        let expected = brute_force(&problem);
        let exact = BranchAndBound {
            relative_gap: 0.0,
            ..BranchAndBound::default()
        };
        match exact.solve(&problem) {
            SelectionResult::Feasible(selection) => {
                let indices: Vec<usize> = selection
                    .recipes
                    .iter()
                    .map(|id| candidates.iter().position(|c| c.id == *id).unwrap())
                    .collect();
                assert!(problem.is_feasible(&indices));
                let score = problem.objective.score(&selection.totals);
                let expected = expected.expect("solver found a selection brute force did not");
                assert!((score - expected).abs() < 1e-6, "{score} != {expected}");
            }
            SelectionResult::Infeasible(reason) => {
                assert_eq!(expected, None, "solver reported {reason}");
            }
        }
    }
}

#[test]
fn feasible_selection_respects_every_constraint() {
    let candidates = mixed_catalog();
    let bounds = vec![
        NutrientBound {
            nutrient: Nutrient::Calories,
            min: 1800.0,
            max: 2200.0,
        },
        NutrientBound {
            nutrient: Nutrient::Protein,
            min: 100.0,
            max: 200.0,
        },
    ];
    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Fiber, 1.0);
    let problem = Problem::new(candidates.clone(), bounds, objective, 6);

    let SelectionResult::Feasible(selection) = BranchAndBound::default().solve(&problem) else {
        panic!("expected a feasible selection");
    };
    assert!(selection.recipes.len() <= 6);
    let calories = selection.totals[Nutrient::Calories];
    assert!((1800.0..=2200.0).contains(&calories), "{calories}");
    let protein = selection.totals[Nutrient::Protein];
    assert!((100.0..=200.0).contains(&protein), "{protein}");
    let covered: std::collections::BTreeSet<MealType> = candidates
        .iter()
        .filter(|c| selection.recipes.contains(&c.id))
        .map(|c| c.meal_type)
        .collect();
    assert_eq!(covered, categories_present(&candidates));
}

#[test]
fn repeated_solves_are_identical() {
    let candidates = two_per_category();
    // every candidate scores the same, so only the tie-break decides
    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Fat, 1.0);
    let problem = Problem::new(candidates, vec![], objective, 5);

    let first = BranchAndBound::default().solve(&problem);
    assert!(first.is_feasible());
    for _ in 0..5 {
        assert_eq!(BranchAndBound::default().solve(&problem), first);
    }
}

#[test]
fn unsatisfiable_combination() {
    use MealType::*;
    // each recipe alone respects the calorie range, but coverage forces two of them
    let candidates = vec![
        candidate(1, Lunch, [900.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        candidate(2, Dinner, [900.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    ];
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 500.0,
        max: 1000.0,
    }];
    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Protein, 1.0);
    let problem = Problem::new(candidates, bounds, objective, 6);
    assert_eq!(
        BranchAndBound::default().solve(&problem),
        SelectionResult::Infeasible(Infeasibility::ConstraintsUnsatisfiable)
    );
}

#[test]
fn node_limit_reports_timeout() {
    let candidates = mixed_catalog();
    let objective = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Protein, 1.0);
    let problem = Problem::new(candidates, vec![], objective, 6);
    let solver = BranchAndBound {
        node_limit: 3,
        ..BranchAndBound::default()
    };
    assert_eq!(
        solver.solve(&problem),
        SelectionResult::Infeasible(Infeasibility::Timeout)
    );
}

#[test]
fn relaxations_follow_the_objective_weight() {
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 1500.0,
        max: 2500.0,
    }];
    let low = LinearObjective::new(Direction::Minimize).with_term(Nutrient::Calories, 1.0);
    let problem = Problem::new(two_per_category(), bounds.clone(), low, 6);
    let minimum_side = relaxations(&problem);
    assert!(!minimum_side.is_empty());
    assert!(minimum_side.iter().all(|r| r.weight > 0.0));
    assert_eq!(minimum_side[0].weight, 1.0);

    let high = LinearObjective::new(Direction::Maximize).with_term(Nutrient::Calories, 1.0);
    let problem = Problem::new(two_per_category(), bounds, high, 6);
    let maximum_side = relaxations(&problem);
    assert!(!maximum_side.is_empty());
    assert!(maximum_side.iter().all(|r| r.weight < 0.0));
    assert_eq!(maximum_side[0].weight, -1.0);
}

#[test]
fn large_pool_with_bounded_objective_nutrient() {
    let candidates = large_catalog();
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 1500.0,
        max: 2500.0,
    }];

    for direction in [Direction::Minimize, Direction::Maximize] {
        let objective = LinearObjective::new(direction)
            .with_term(Nutrient::Calories, 1.0)
            .with_blend(&super::objective::SECONDARY_BLEND, 0.001);
        let problem = Problem::new(candidates.clone(), bounds.clone(), objective, 6);

        let result = BranchAndBound::default().solve(&problem);
        let SelectionResult::Feasible(selection) = result else {
            panic!("{direction}: {result:?}");
        };
        let indices: Vec<usize> = selection
            .recipes
            .iter()
            .map(|id| candidates.iter().position(|c| c.id == *id).unwrap())
            .collect();
        assert!(problem.is_feasible(&indices));

        let calories = selection.totals[Nutrient::Calories];
        match direction {
            Direction::Minimize => assert!(calories < 1510.0, "{calories}"),
            Direction::Maximize => assert!(calories > 2490.0, "{calories}"),
        }
    }
}

#[test]
fn loose_gap_stays_within_its_fraction() {
    let candidates = two_per_category();
    let objective = LinearObjective::new(Direction::Minimize).with_term(Nutrient::Calories, 1.0);
    let bounds = vec![NutrientBound {
        nutrient: Nutrient::Calories,
        min: 1500.0,
        max: 2500.0,
    }];
    let problem = Problem::new(candidates, bounds, objective, 6);
    let exact = BranchAndBound {
        relative_gap: 0.0,
        ..BranchAndBound::default()
    };
    let (SelectionResult::Feasible(exact), SelectionResult::Feasible(loose)) =
        (exact.solve(&problem), BranchAndBound::default().solve(&problem))
    else {
        panic!("expected feasible selections");
    };
    let gap = loose.objective_value - exact.objective_value;
    assert!((0.0..=1e-3 * exact.objective_value).contains(&gap), "{gap}");
}
