// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{MealType, RecipeIngredient};
use crate::planner::nutrients::NutrientProfile;
use crate::query;
use crate::Result;
use diesel::Connection as _;
use std::path::Path;
use std::str::FromStr as _;

mod plist;

pub use self::plist::DecodeError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub dropped: usize,
}

/// Writes one decoded record. Returns `false` when the record was not fit for the catalog.
fn import_recipe(conn: &mut database::Connection, recipe: plist::Recipe) -> Result<bool> {
    let meal_type = match MealType::from_str(recipe.meal_type.trim()) {
        Ok(meal_type) => meal_type,
        Err(_) => {
            log::warn!(
                "skipping {:?}: unknown meal type {:?}",
                recipe.title,
                recipe.meal_type
            );
            return Ok(false);
        }
    };
    let nutrients = match NutrientProfile::extract(&recipe.nutrients) {
        Ok(nutrients) => nutrients,
        Err(error) => {
            log::warn!("skipping {:?}: {error}", recipe.title);
            return Ok(false);
        }
    };

    let recipe_id = query::add_recipe(conn, &recipe.title, meal_type, &nutrients)?;
    for ingredient in recipe.ingredients {
        let ingredient_id = query::find_or_add_ingredient(conn, &ingredient.name)?;
        query::add_recipe_ingredient(
            conn,
            RecipeIngredient {
                recipe_id,
                ingredient_id,
                quantity: ingredient.quantity,
                unit: ingredient.unit,
            },
        )?;
    }
    Ok(true)
}

pub struct CatalogImporter {
    records: Vec<std::result::Result<plist::Recipe, DecodeError>>,
    total_num_records: usize,
    report: ImportReport,
}

impl CatalogImporter {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut records = plist::decode_catalog_from_path(path)?;
        // batches are taken off the end
        records.reverse();
        let total_num_records = records.len();

        Ok(Self {
            records,
            total_num_records,
            report: ImportReport::default(),
        })
    }

    pub fn done(&self) -> bool {
        self.records.is_empty()
    }

    pub fn report(&self) -> ImportReport {
        self.report
    }

    pub fn percent_done(&self) -> f32 {
        if self.total_num_records == 0 {
            return 1.0;
        }
        (self.report.imported + self.report.dropped) as f32 / self.total_num_records as f32
    }

    /// Imports the next few records in one transaction.
    pub fn import_one(&mut self, conn: &mut database::Connection) -> Result<()> {
        const BATCH_SIZE: usize = 5;
        let split_point = self.records.len().saturating_sub(BATCH_SIZE);
        let batch = self.records.split_off(split_point);

        let report = conn.transaction(|conn| {
            let mut report = ImportReport::default();
            for record in batch.into_iter().rev() {
                let imported = match record {
                    Ok(recipe) => import_recipe(conn, recipe)?,
                    Err(error) => {
                        log::warn!("skipping malformed record: {error}");
                        false
                    }
                };
                if imported {
                    report.imported += 1;
                } else {
                    report.dropped += 1;
                }
            }
            Result::Ok(report)
        })?;

        self.report.imported += report.imported;
        self.report.dropped += report.dropped;
        Ok(())
    }
}

pub fn import_catalog(
    conn: &mut database::Connection,
    path: impl AsRef<Path>,
) -> Result<ImportReport> {
    let mut importer = CatalogImporter::new(path)?;

    while !importer.done() {
        importer.import_one(conn)?;
        log::info!("imported {:.0}%", importer.percent_done() * 100.0);
    }

    let report = importer.report();
    if report.dropped > 0 {
        log::warn!("{} catalog records were skipped", report.dropped);
    }
    Ok(report)
}

#[test]
fn import_skips_bad_records() {
    use ::plist::{Dictionary, Value};
    use crate::database::models::Nutrient;

    fn recipe(title: &str, meal_type: &str, calories: &str, ingredients: &[&str]) -> Value {
        let mut dict = Dictionary::new();
        dict.insert("Title".into(), title.into());
        dict.insert("MealType".into(), meal_type.into());
        for nutrient in Nutrient::iter() {
            dict.insert(plist::nutrient_key(nutrient).into(), "10".into());
        }
        dict.insert("Calories".into(), calories.into());
        let ingredients = ingredients
            .iter()
            .map(|name| {
                let mut i = Dictionary::new();
                i.insert("Name".into(), (*name).into());
                i.insert("Quantity".into(), Value::Real(0.5));
                i.insert("Unit".into(), "cup".into());
                Value::Dictionary(i)
            })
            .collect();
        dict.insert("Ingredients".into(), Value::Array(ingredients));
        Value::Dictionary(dict)
    }

    let records: Vec<Value> = vec![
        recipe("Omelette", "Breakfast", "320", &["Eggs", "Butter"]),
        recipe("Stew", "dinner", "610.5", &["Beef", "eggs "]),
        recipe("Mystery", "Brunch", "400", &["Eggs"]),
        recipe("Soup", "Lunch", "lots", &["Leek"]),
        Value::String("not a recipe".into()),
    ]
    .into_iter()
    .chain((0..6).map(|i| recipe(&format!("Snack {i}"), "snack", "150", &["Nuts"])))
    .collect();
    let mut root = Dictionary::new();
    root.insert("recipes".into(), Value::Array(records));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.plist");
    Value::Dictionary(root).to_file_xml(&path).unwrap();

    let mut conn = database::establish_in_memory().unwrap();
    let report = import_catalog(&mut conn, &path).unwrap();
    assert_eq!(
        report,
        ImportReport {
            imported: 8,
            dropped: 3
        }
    );

    let catalog = query::load_catalog(&mut conn, None).unwrap();
    let titles: Vec<&str> = catalog.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(&titles[..2], &["Omelette", "Stew"]);
    assert_eq!(catalog[1].meal_type, MealType::Dinner);
    assert_eq!(catalog[1].nutrients[Nutrient::Calories], 610.5);

    // "Eggs" and "eggs " are the same ingredient
    let eggs = query::find_ingredient(&mut conn, "EGGS").unwrap().unwrap();
    assert!(catalog[0].ingredients.contains(&eggs));
    assert!(catalog[1].ingredients.contains(&eggs));
}

#[test]
fn empty_catalog() {
    use ::plist::{Dictionary, Value};

    let mut root = Dictionary::new();
    root.insert("recipes".into(), Value::Array(vec![]));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.plist");
    Value::Dictionary(root).to_file_xml(&path).unwrap();

    let mut conn = database::establish_in_memory().unwrap();
    assert_eq!(
        import_catalog(&mut conn, &path).unwrap(),
        ImportReport::default()
    );
}
