// Copyright 2023 Remi Bernotavicius

//! Turns a user's nutrient preferences into the objective and hard bounds of a selection problem.

use super::solver::objective::{LinearObjective, SECONDARY_BLEND};
use crate::database::models::Nutrient;
use derive_more::Display;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreferenceError {
    #[error("bound {0} must be a finite non-negative number")]
    InvalidBound(f64),
    #[error("minimum {min} is greater than maximum {max}")]
    Inverted { min: f64, max: f64 },
    #[error("unknown diet type {0:?}")]
    UnknownDietType(String),
}

#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    #[display("maximize")]
    Maximize,
    #[display("minimize")]
    Minimize,
}

/// Which nutrient a user wants pushed up or down. Tags look like `low_calories` or `high_protein`.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DietType {
    #[default]
    #[display("balanced")]
    Balanced,
    #[display("low_{_0}")]
    Low(Nutrient),
    #[display("high_{_0}")]
    High(Nutrient),
}

impl FromStr for DietType {
    type Err = PreferenceError;

    fn from_str(tag: &str) -> Result<Self, PreferenceError> {
        let unknown = || PreferenceError::UnknownDietType(tag.into());
        let tag = tag.trim().to_ascii_lowercase();
        if tag == "balanced" {
            return Ok(Self::Balanced);
        }
        if let Some(rest) = tag.strip_prefix("low_") {
            return Ok(Self::Low(rest.parse().map_err(|_| unknown())?));
        }
        if let Some(rest) = tag.strip_prefix("high_") {
            return Ok(Self::High(rest.parse().map_err(|_| unknown())?));
        }
        Err(unknown())
    }
}

impl DietType {
    /// Reads a stored tag, treating anything unrecognized as the neutral default.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|error| {
            log::warn!("{error}, falling back to {}", Self::Balanced);
            Self::Balanced
        })
    }

    pub fn objective(self) -> Objective {
        match self {
            Self::Balanced => Objective {
                nutrient: Nutrient::Protein,
                direction: Direction::Maximize,
            },
            Self::Low(nutrient) => Objective {
                nutrient,
                direction: Direction::Minimize,
            },
            Self::High(nutrient) => Objective {
                nutrient,
                direction: Direction::Maximize,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BoundPair {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl BoundPair {
    /// Validated construction, used wherever preferences are written.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, PreferenceError> {
        for bound in min.iter().chain(max.iter()) {
            if !bound.is_finite() || *bound < 0.0 {
                return Err(PreferenceError::InvalidBound(*bound));
            }
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(PreferenceError::Inverted { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// Both bounds present and positive, otherwise the nutrient is unconstrained.
    pub fn active(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > 0.0 && max > 0.0 => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserNutrientPreference {
    pub bounds: BTreeMap<Nutrient, BoundPair>,
    pub diet_type: DietType,
}

impl UserNutrientPreference {
    pub fn unconstrained() -> Self {
        Self {
            bounds: BTreeMap::new(),
            diet_type: DietType::Balanced,
        }
    }
}

/// The baseline for users who never configured anything: 1500 to 2500 calories, nothing else.
impl Default for UserNutrientPreference {
    fn default() -> Self {
        let mut preference = Self::unconstrained();
        preference.bounds.insert(
            Nutrient::Calories,
            BoundPair {
                min: Some(1500.0),
                max: Some(2500.0),
            },
        );
        preference
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Objective {
    pub nutrient: Nutrient,
    pub direction: Direction,
}

impl Objective {
    /// The primary term with weight one, plus the fixed secondary blend scaled by
    /// `secondary_weight`. A small weight keeps the primary nutrient in charge.
    pub fn linear(&self, secondary_weight: f64) -> LinearObjective {
        LinearObjective::new(self.direction)
            .with_term(self.nutrient, 1.0)
            .with_blend(&SECONDARY_BLEND, secondary_weight)
    }
}

/// `min <= sum(nutrient over selection) <= max`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NutrientBound {
    pub nutrient: Nutrient,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    pub objective: Objective,
    pub bounds: Vec<NutrientBound>,
}

/// Ordering of min and max is not checked here; an inverted pair reaches the solver, which reports
/// it as infeasible.
pub fn build_constraints(preference: &UserNutrientPreference) -> ConstraintSet {
    let bounds = preference
        .bounds
        .iter()
        .filter_map(|(&nutrient, pair)| {
            pair.active()
                .map(|(min, max)| NutrientBound { nutrient, min, max })
        })
        .collect();
    ConstraintSet {
        objective: preference.diet_type.objective(),
        bounds,
    }
}

#[test]
fn diet_type_tags() {
    assert_eq!("low_calories".parse(), Ok(DietType::Low(Nutrient::Calories)));
    assert_eq!("high_calories".parse(), Ok(DietType::High(Nutrient::Calories)));
    assert_eq!("high_protein".parse(), Ok(DietType::High(Nutrient::Protein)));
    assert_eq!("low_sugars".parse(), Ok(DietType::Low(Nutrient::Sugars)));
    assert_eq!("HIGH_Fiber".parse(), Ok(DietType::High(Nutrient::Fiber)));
    assert_eq!("balanced".parse(), Ok(DietType::Balanced));
    assert!("keto".parse::<DietType>().is_err());
    assert!("low_vitamins".parse::<DietType>().is_err());

    assert_eq!(DietType::Low(Nutrient::Potassium).to_string(), "low_potassium");
    assert_eq!(DietType::from_tag("paleo"), DietType::Balanced);
}

#[test]
fn objective_from_diet_type() {
    assert_eq!(
        DietType::Low(Nutrient::Calories).objective(),
        Objective {
            nutrient: Nutrient::Calories,
            direction: Direction::Minimize
        }
    );
    assert_eq!(
        DietType::High(Nutrient::Iron).objective(),
        Objective {
            nutrient: Nutrient::Iron,
            direction: Direction::Maximize
        }
    );
    assert_eq!(
        DietType::Balanced.objective(),
        Objective {
            nutrient: Nutrient::Protein,
            direction: Direction::Maximize
        }
    );
}

#[test]
fn only_complete_positive_pairs_are_active() {
    use maplit::btreemap;

    let preference = UserNutrientPreference {
        bounds: btreemap! {
            Nutrient::Calories => BoundPair { min: Some(1500.0), max: Some(2500.0) },
            Nutrient::Protein => BoundPair { min: Some(50.0), max: None },
            Nutrient::Sugars => BoundPair { min: Some(0.0), max: Some(50.0) },
            Nutrient::Iron => BoundPair { min: None, max: None },
            Nutrient::Fiber => BoundPair { min: Some(5000.0), max: Some(10.0) },
        },
        diet_type: DietType::High(Nutrient::Protein),
    };

    let constraints = build_constraints(&preference);
    assert_eq!(
        constraints.bounds,
        vec![
            NutrientBound {
                nutrient: Nutrient::Calories,
                min: 1500.0,
                max: 2500.0
            },
            NutrientBound {
                nutrient: Nutrient::Fiber,
                min: 5000.0,
                max: 10.0
            },
        ]
    );
    assert_eq!(constraints.objective.nutrient, Nutrient::Protein);
}

#[test]
fn baseline_preference() {
    let constraints = build_constraints(&UserNutrientPreference::default());
    assert_eq!(
        constraints.bounds,
        vec![NutrientBound {
            nutrient: Nutrient::Calories,
            min: 1500.0,
            max: 2500.0
        }]
    );
    assert_eq!(constraints.objective, DietType::Balanced.objective());
}

#[test]
fn bound_pair_validation() {
    assert_eq!(
        BoundPair::new(Some(5000.0), Some(10.0)),
        Err(PreferenceError::Inverted {
            min: 5000.0,
            max: 10.0
        })
    );
    assert_eq!(
        BoundPair::new(Some(-1.0), None),
        Err(PreferenceError::InvalidBound(-1.0))
    );
    assert!(BoundPair::new(Some(f64::INFINITY), None).is_err());
    assert!(BoundPair::new(Some(10.0), Some(10.0)).is_ok());
    assert!(BoundPair::new(None, Some(10.0)).is_ok());
}
