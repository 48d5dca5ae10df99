// Copyright 2023 Remi Bernotavicius

use crate::database::models::Nutrient;
use crate::planner::constraints::Direction;
use crate::planner::nutrients::NutrientProfile;

/// Secondary quality term blended into every objective: 2 x calories + protein - 0.5 x sugars.
pub const SECONDARY_BLEND: [(Nutrient, f64); 3] = [
    (Nutrient::Calories, 2.0),
    (Nutrient::Protein, 1.0),
    (Nutrient::Sugars, -0.5),
];

/// A single linear expression over per-recipe nutrients, summed across the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearObjective {
    direction: Direction,
    terms: Vec<(Nutrient, f64)>,
}

impl LinearObjective {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            terms: vec![],
        }
    }

    /// Adds `weight x nutrient`. Weights on the same nutrient accumulate.
    pub fn with_term(mut self, nutrient: Nutrient, weight: f64) -> Self {
        if weight == 0.0 {
            return self;
        }
        match self.terms.iter_mut().find(|(n, _)| *n == nutrient) {
            Some((_, w)) => *w += weight,
            None => self.terms.push((nutrient, weight)),
        }
        self
    }

    pub fn with_blend(self, blend: &[(Nutrient, f64)], scale: f64) -> Self {
        blend
            .iter()
            .fold(self, |acc, &(nutrient, weight)| {
                acc.with_term(nutrient, weight * scale)
            })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn terms(&self) -> &[(Nutrient, f64)] {
        &self.terms
    }

    /// The objective's value for one recipe (or a summed profile).
    pub fn evaluate(&self, profile: &NutrientProfile) -> f64 {
        self.terms.iter().map(|&(n, w)| w * profile[n]).sum()
    }

    /// Weight of `nutrient` in `score`.
    pub fn score_weight(&self, nutrient: Nutrient) -> f64 {
        let weight: f64 = self
            .terms
            .iter()
            .filter(|(n, _)| *n == nutrient)
            .map(|(_, w)| w)
            .sum();
        match self.direction {
            Direction::Maximize => weight,
            Direction::Minimize => -weight,
        }
    }

    /// `evaluate` oriented so that larger is always better.
    pub fn score(&self, profile: &NutrientProfile) -> f64 {
        match self.direction {
            Direction::Maximize => self.evaluate(profile),
            Direction::Minimize => -self.evaluate(profile),
        }
    }
}

#[test]
fn terms_accumulate() {
    let objective = LinearObjective::new(Direction::Maximize)
        .with_term(Nutrient::Protein, 1.0)
        .with_blend(&SECONDARY_BLEND, 1.0);
    assert_eq!(
        objective.terms(),
        &[
            (Nutrient::Protein, 2.0),
            (Nutrient::Calories, 2.0),
            (Nutrient::Sugars, -0.5)
        ]
    );

    let profile =
        NutrientProfile::from_values([100.0, 10.0, 20.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    assert_eq!(objective.evaluate(&profile), 40.0 + 200.0 - 5.0);
}

#[test]
fn zero_scale_blend_is_dropped() {
    let objective = LinearObjective::new(Direction::Minimize)
        .with_term(Nutrient::Calories, 1.0)
        .with_blend(&SECONDARY_BLEND, 0.0);
    assert_eq!(objective.terms(), &[(Nutrient::Calories, 1.0)]);

    let profile =
        NutrientProfile::from_values([300.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    assert_eq!(objective.score(&profile), -300.0);
    assert_eq!(objective.score_weight(Nutrient::Calories), -1.0);
    assert_eq!(objective.score_weight(Nutrient::Protein), 0.0);
}
