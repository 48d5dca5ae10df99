// Copyright 2023 Remi Bernotavicius

use super::filter::CatalogEntry;
use super::nutrients::NutrientProfile;
use crate::database::models::{RecipeHandle, RecipeId};
use chrono::{Datelike as _, NaiveDate};
use std::collections::HashMap;
use std::fmt;

pub fn full_day_name(day: chrono::Weekday) -> &'static str {
    use chrono::Weekday::*;

    match day {
        Sun => "Sunday",
        Mon => "Monday",
        Tue => "Tuesday",
        Wed => "Wednesday",
        Thu => "Thursday",
        Fri => "Friday",
        Sat => "Saturday",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub recipes: Vec<RecipeHandle>,
    pub totals: NutrientProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub days: Vec<DaySummary>,
    pub totals: NutrientProfile,
}

/// Adds up the nutrients of each day's recipes. Recipes missing from `catalog` count as zero.
pub fn summarize(days: &[(NaiveDate, Vec<RecipeHandle>)], catalog: &[CatalogEntry]) -> WeekSummary {
    let by_id: HashMap<RecipeId, &NutrientProfile> =
        catalog.iter().map(|e| (e.id, &e.nutrients)).collect();

    let days: Vec<DaySummary> = days
        .iter()
        .map(|(day, recipes)| DaySummary {
            day: *day,
            recipes: recipes.clone(),
            totals: recipes
                .iter()
                .filter_map(|r| by_id.get(&r.id).copied())
                .sum(),
        })
        .collect();
    let totals = days.iter().map(|d| &d.totals).sum();
    WeekSummary { days, totals }
}

impl fmt::Display for WeekSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in &self.days {
            writeln!(f, "{} {}", full_day_name(day.day.weekday()), day.day)?;
            if day.recipes.is_empty() {
                writeln!(f, "    nothing planned")?;
                continue;
            }
            for recipe in &day.recipes {
                writeln!(f, "    {}", recipe.title)?;
            }
            writeln!(f, "    {}", day.totals)?;
        }
        write!(f, "Week: {}", self.totals)
    }
}

#[test]
fn totals_per_day_and_week() {
    use super::filter::entry;
    use crate::database::models::{MealType, Nutrient};

    let catalog = vec![
        entry(1, MealType::Breakfast, 400.0, &[]),
        entry(2, MealType::Lunch, 600.0, &[]),
        entry(3, MealType::Dinner, 700.0, &[]),
    ];
    let handle = |id: i32| RecipeHandle {
        id: RecipeId::new(id),
        title: format!("recipe {id}"),
    };
    let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let tuesday = monday.succ_opt().unwrap();
    let wednesday = tuesday.succ_opt().unwrap();
    let week = vec![
        (monday, vec![handle(1), handle(2)]),
        (tuesday, vec![handle(3)]),
        (wednesday, vec![]),
    ];

    let summary = summarize(&week, &catalog);
    assert_eq!(summary.days[0].totals[Nutrient::Calories], 1000.0);
    assert_eq!(summary.days[1].totals[Nutrient::Calories], 700.0);
    assert_eq!(summary.days[2].totals, NutrientProfile::default());
    assert_eq!(summary.totals[Nutrient::Calories], 1700.0);
    assert_eq!(summary.totals[Nutrient::Protein], 60.0);

    let text = summary.to_string();
    assert!(text.starts_with("Monday 2024-03-04\n    recipe 1\n    recipe 2\n"));
    assert!(text.contains("Wednesday 2024-03-06\n    nothing planned\n"));
}
