// Copyright 2023 Remi Bernotavicius

use crate::database::models::Nutrient;
use crate::planner::nutrients::RawQuantity;
use plist::dictionary::Dictionary;
use plist::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("decode error: no such key {needle:?} found in {haystack:?}")]
    NoSuchKey {
        needle: String,
        haystack: Vec<String>,
    },
    #[error("decode error: expected type {expected:?} but found type {actual:?}")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Plist(#[from] plist::Error),
}

type Result<T> = std::result::Result<T, DecodeError>;

trait DictionaryExt {
    fn get_or_error(&self, key: &str) -> Result<&Value>;
    fn get_array_or_error(&self, key: &str) -> Result<&Vec<Value>>;
    fn get_string_or_error(&self, key: &str) -> Result<&str>;
}

impl DictionaryExt for Dictionary {
    fn get_or_error(&self, key: &str) -> Result<&Value> {
        self.get(key).ok_or(DecodeError::NoSuchKey {
            needle: key.into(),
            haystack: self.keys().cloned().collect(),
        })
    }

    fn get_array_or_error(&self, key: &str) -> Result<&Vec<Value>> {
        self.get_or_error(key)?.as_array_or_error()
    }

    fn get_string_or_error(&self, key: &str) -> Result<&str> {
        self.get_or_error(key)?.as_string_or_error()
    }
}

trait ValueExt {
    fn as_dictionary_or_error(&self) -> Result<&Dictionary>;
    fn as_array_or_error(&self) -> Result<&Vec<Value>>;
    fn as_string_or_error(&self) -> Result<&str>;
    fn as_number_or_error(&self) -> Result<f64>;

    fn type_str(&self) -> &'static str;
}

impl ValueExt for Value {
    fn as_dictionary_or_error(&self) -> Result<&Dictionary> {
        let actual = self.type_str();
        self.as_dictionary().ok_or(DecodeError::WrongType {
            expected: "Dictionary",
            actual,
        })
    }

    fn as_array_or_error(&self) -> Result<&Vec<Value>> {
        let actual = self.type_str();
        self.as_array().ok_or(DecodeError::WrongType {
            expected: "Array",
            actual,
        })
    }

    fn as_string_or_error(&self) -> Result<&str> {
        let actual = self.type_str();
        self.as_string().ok_or(DecodeError::WrongType {
            expected: "String",
            actual,
        })
    }

    fn as_number_or_error(&self) -> Result<f64> {
        if let Some(int) = self.as_signed_integer() {
            return Ok(int as f64);
        }
        let actual = self.type_str();
        self.as_real().ok_or(DecodeError::WrongType {
            expected: "Real",
            actual,
        })
    }

    fn type_str(&self) -> &'static str {
        match self {
            Self::Array(_) => "Array",
            Self::Dictionary(_) => "Dictionary",
            Self::Boolean(_) => "Boolean",
            Self::Data(_) => "Data",
            Self::Date(_) => "Date",
            Self::Real(_) => "Real",
            Self::Integer(_) => "Integer",
            Self::String(_) => "String",
            Self::Uid(_) => "Uid",
            _ => "Unknown",
        }
    }
}

trait ArrayExt {
    fn iter_as_dictionary_or_error(&self) -> Result<std::vec::IntoIter<&Dictionary>>;
}

impl ArrayExt for Vec<Value> {
    fn iter_as_dictionary_or_error(&self) -> Result<std::vec::IntoIter<&Dictionary>> {
        let refs: Vec<&Dictionary> = self
            .iter()
            .map(|i| i.as_dictionary_or_error())
            .collect::<Result<_>>()?;
        Ok(refs.into_iter())
    }
}

pub fn nutrient_key(nutrient: Nutrient) -> &'static str {
    match nutrient {
        Nutrient::Calories => "Calories",
        Nutrient::Sugars => "Sugars",
        Nutrient::Protein => "Protein",
        Nutrient::Fat => "Fat",
        Nutrient::Carbohydrates => "Carbohydrates",
        Nutrient::Fiber => "Fiber",
        Nutrient::Iron => "Iron",
        Nutrient::Potassium => "Potassium",
    }
}

#[derive(Debug)]
pub struct Ingredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// A catalog record exactly as written in the file. Nothing here has been validated.
#[derive(Debug)]
pub struct Recipe {
    pub title: String,
    pub meal_type: String,
    pub nutrients: BTreeMap<Nutrient, RawQuantity>,
    pub ingredients: Vec<Ingredient>,
}

fn raw_quantity(value: &Value) -> RawQuantity {
    match value {
        Value::String(s) => RawQuantity::Text(s.clone()),
        Value::Real(r) => RawQuantity::Number(*r),
        Value::Integer(_) => match value.as_number_or_error() {
            Ok(n) => RawQuantity::Number(n),
            Err(_) => RawQuantity::Unsupported("Integer"),
        },
        other => RawQuantity::Unsupported(other.type_str()),
    }
}

fn decode_ingredient(properties: &Dictionary) -> Result<Ingredient> {
    let name = properties.get_string_or_error("Name")?;
    let quantity = properties
        .get("Quantity")
        .map(|q| q.as_number_or_error())
        .transpose()?;
    let unit = properties
        .get("Unit")
        .map(|u| u.as_string_or_error())
        .transpose()?
        .map(str::trim)
        .filter(|u| !u.is_empty());
    Ok(Ingredient {
        name: name.into(),
        quantity,
        unit: unit.map(Into::into),
    })
}

fn decode_recipe(properties: &Dictionary) -> Result<Recipe> {
    let title = properties.get_string_or_error("Title")?;
    let meal_type = properties.get_string_or_error("MealType")?;

    let nutrients = Nutrient::iter()
        .filter_map(|n| properties.get(nutrient_key(n)).map(|v| (n, raw_quantity(v))))
        .collect();

    let mut ingredients = vec![];
    if properties.contains_key("Ingredients") {
        for i in properties
            .get_array_or_error("Ingredients")?
            .iter_as_dictionary_or_error()?
        {
            ingredients.push(decode_ingredient(i)?);
        }
    }

    Ok(Recipe {
        title: title.into(),
        meal_type: meal_type.into(),
        nutrients,
        ingredients,
    })
}

/// One entry per element of the root `recipes` array. A malformed element only fails its own
/// entry.
fn decode_catalog(root: &Value) -> Result<Vec<Result<Recipe>>> {
    let root = root.as_dictionary_or_error()?;
    let recipes = root.get_array_or_error("recipes")?;
    Ok(recipes
        .iter()
        .map(|r| decode_recipe(r.as_dictionary_or_error()?))
        .collect())
}

pub fn decode_catalog_from_path(path: impl AsRef<Path>) -> Result<Vec<Result<Recipe>>> {
    let contents = Value::from_file(path)?;
    decode_catalog(&contents)
}

#[test]
fn decode_mixed_records() {
    let mut good = Dictionary::new();
    good.insert("Title".into(), "Porridge".into());
    good.insert("MealType".into(), "Breakfast".into());
    good.insert("Calories".into(), "350".into());
    good.insert("Protein".into(), Value::Real(12.5));
    good.insert("Iron".into(), Value::from(3i64));
    good.insert("Fiber".into(), Value::Boolean(true));
    let mut oats = Dictionary::new();
    oats.insert("Name".into(), "Oats".into());
    oats.insert("Quantity".into(), Value::from(1i64));
    oats.insert("Unit".into(), " cup ".into());
    let mut salt = Dictionary::new();
    salt.insert("Name".into(), "Salt".into());
    good.insert(
        "Ingredients".into(),
        Value::Array(vec![oats.into(), salt.into()]),
    );

    let mut untitled = Dictionary::new();
    untitled.insert("MealType".into(), "Lunch".into());

    let mut root = Dictionary::new();
    root.insert(
        "recipes".into(),
        Value::Array(vec![good.into(), untitled.into(), "junk".into()]),
    );

    let records = decode_catalog(&Value::Dictionary(root)).unwrap();
    assert_eq!(records.len(), 3);

    let porridge = records[0].as_ref().unwrap();
    assert_eq!(porridge.title, "Porridge");
    assert_eq!(porridge.nutrients[&Nutrient::Calories], RawQuantity::from("350"));
    assert_eq!(porridge.nutrients[&Nutrient::Protein], RawQuantity::from(12.5));
    assert_eq!(porridge.nutrients[&Nutrient::Iron], RawQuantity::from(3.0));
    assert_eq!(
        porridge.nutrients[&Nutrient::Fiber],
        RawQuantity::Unsupported("Boolean")
    );
    assert!(!porridge.nutrients.contains_key(&Nutrient::Sugars));
    assert_eq!(porridge.ingredients.len(), 2);
    assert_eq!(porridge.ingredients[0].quantity, Some(1.0));
    assert_eq!(porridge.ingredients[0].unit.as_deref(), Some("cup"));
    assert_eq!(porridge.ingredients[1].quantity, None);

    assert!(matches!(records[1], Err(DecodeError::NoSuchKey { .. })));
    assert!(matches!(records[2], Err(DecodeError::WrongType { .. })));
}

#[test]
fn missing_recipes_array() {
    let root = Value::Dictionary(Dictionary::new());
    assert!(matches!(
        decode_catalog(&root),
        Err(DecodeError::NoSuchKey { .. })
    ));
}
