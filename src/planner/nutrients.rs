// Copyright 2023 Remi Bernotavicius

use crate::database::models::{Nutrient, Recipe};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Index};

/// A nutrient field as it appears in catalog input, before it has been checked.
#[derive(Debug, Clone, PartialEq)]
pub enum RawQuantity {
    Text(String),
    Number(f64),
    /// A value of some other kind entirely, named by its type.
    Unsupported(&'static str),
}

impl From<&str> for RawQuantity {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<f64> for RawQuantity {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("{0} is missing")]
    Missing(Nutrient),
    #[error("{nutrient} value {value:?} is not a number")]
    NotNumeric { nutrient: Nutrient, value: String },
    #[error("{nutrient} value {value} must be finite and non-negative")]
    OutOfRange { nutrient: Nutrient, value: f64 },
}

fn coerce(nutrient: Nutrient, raw: Option<&RawQuantity>) -> Result<f64, ExtractError> {
    let value = match raw {
        None => return Err(ExtractError::Missing(nutrient)),
        Some(RawQuantity::Number(v)) => *v,
        Some(RawQuantity::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(ExtractError::Missing(nutrient));
            }
            trimmed.parse().map_err(|_| ExtractError::NotNumeric {
                nutrient,
                value: s.clone(),
            })?
        }
        Some(RawQuantity::Unsupported(kind)) => {
            return Err(ExtractError::NotNumeric {
                nutrient,
                value: format!("<{kind}>"),
            })
        }
    };
    check(nutrient, value)
}

fn check(nutrient: Nutrient, value: f64) -> Result<f64, ExtractError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ExtractError::OutOfRange { nutrient, value })
    }
}

/// Validated per-recipe (or summed) nutrient quantities, indexed by `Nutrient`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NutrientProfile([f64; Nutrient::COUNT]);

impl NutrientProfile {
    /// Coerces every field of a raw record. A record with any field that fails is rejected whole.
    pub fn extract(fields: &BTreeMap<Nutrient, RawQuantity>) -> Result<Self, ExtractError> {
        let mut values = [0.0; Nutrient::COUNT];
        for nutrient in Nutrient::iter() {
            values[nutrient.index()] = coerce(nutrient, fields.get(&nutrient))?;
        }
        Ok(Self(values))
    }

    pub fn from_values(values: [f64; Nutrient::COUNT]) -> Result<Self, ExtractError> {
        for nutrient in Nutrient::iter() {
            check(nutrient, values[nutrient.index()])?;
        }
        Ok(Self(values))
    }

    pub fn of_recipe(recipe: &Recipe) -> Result<Self, ExtractError> {
        Self::from_values(recipe.nutrient_values())
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        self.0[nutrient.index()]
    }

    pub fn values(&self) -> [f64; Nutrient::COUNT] {
        self.0
    }
}

impl Index<Nutrient> for NutrientProfile {
    type Output = f64;

    fn index(&self, nutrient: Nutrient) -> &f64 {
        &self.0[nutrient.index()]
    }
}

impl AddAssign<&NutrientProfile> for NutrientProfile {
    fn add_assign(&mut self, other: &NutrientProfile) {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
    }
}

impl Add for NutrientProfile {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += &other;
        self
    }
}

impl<'a> Sum<&'a NutrientProfile> for NutrientProfile {
    fn sum<I: Iterator<Item = &'a NutrientProfile>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, p| {
            acc += p;
            acc
        })
    }
}

impl fmt::Display for NutrientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for nutrient in Nutrient::iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{nutrient} {:.1}", self.get(nutrient))?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn raw_fields(values: [&str; Nutrient::COUNT]) -> BTreeMap<Nutrient, RawQuantity> {
    Nutrient::iter()
        .zip(values)
        .map(|(n, v)| (n, RawQuantity::from(v)))
        .collect()
}

#[test]
fn extract_textual_fields() {
    let fields = raw_fields(["450", " 12.5 ", "30", "10", "55", "8", "3.2", "900"]);
    let profile = NutrientProfile::extract(&fields).unwrap();
    assert_eq!(profile[Nutrient::Calories], 450.0);
    assert_eq!(profile[Nutrient::Sugars], 12.5);
    assert_eq!(profile[Nutrient::Potassium], 900.0);
}

#[test]
fn extract_rejects_whole_record() {
    let fields = raw_fields(["450", "12", "thirty", "10", "55", "8", "3", "900"]);
    assert_eq!(
        NutrientProfile::extract(&fields),
        Err(ExtractError::NotNumeric {
            nutrient: Nutrient::Protein,
            value: "thirty".into()
        })
    );

    let fields = raw_fields(["450", "12", "30", "", "55", "8", "3", "900"]);
    assert_eq!(
        NutrientProfile::extract(&fields),
        Err(ExtractError::Missing(Nutrient::Fat))
    );

    let mut fields = raw_fields(["450", "12", "30", "10", "55", "8", "3", "900"]);
    fields.remove(&Nutrient::Iron);
    assert_eq!(
        NutrientProfile::extract(&fields),
        Err(ExtractError::Missing(Nutrient::Iron))
    );

    let fields = raw_fields(["-1", "12", "30", "10", "55", "8", "3", "900"]);
    assert!(matches!(
        NutrientProfile::extract(&fields),
        Err(ExtractError::OutOfRange {
            nutrient: Nutrient::Calories,
            ..
        })
    ));

    let fields = raw_fields(["NaN", "12", "30", "10", "55", "8", "3", "900"]);
    assert!(NutrientProfile::extract(&fields).is_err());
}

#[test]
fn extract_numeric_and_unsupported_fields() {
    let mut fields = raw_fields(["450", "12", "30", "10", "55", "8", "3", "900"]);
    fields.insert(Nutrient::Fiber, RawQuantity::Number(7.5));
    assert_eq!(NutrientProfile::extract(&fields).unwrap()[Nutrient::Fiber], 7.5);

    fields.insert(Nutrient::Fiber, RawQuantity::Unsupported("Boolean"));
    assert!(matches!(
        NutrientProfile::extract(&fields),
        Err(ExtractError::NotNumeric {
            nutrient: Nutrient::Fiber,
            ..
        })
    ));
}

#[test]
fn profiles_sum() {
    let a = NutrientProfile::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
    let b = NutrientProfile::from_values([10.0; Nutrient::COUNT]).unwrap();
    let total: NutrientProfile = [a, b].iter().sum();
    assert_eq!(total, a + b);
    assert_eq!(total[Nutrient::Calories], 11.0);
    assert_eq!(total[Nutrient::Potassium], 18.0);
}
