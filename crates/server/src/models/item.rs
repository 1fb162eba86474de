//! Menu items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cafe_calories_core::{CafeId, ItemId};

/// A menu item as stored.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub cafe_id: CafeId,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub calories: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Serving size as printed on the menu, e.g. "350 ml".
    pub quantity: Option<String>,
    pub servings: Option<f64>,
    pub veg_flag: bool,
    pub kind: Option<String>,
    pub active: bool,
}

/// Fields for a new menu item, from a form or a parsed menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    pub calories: i32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub servings: Option<f64>,
    #[serde(default)]
    pub veg_flag: bool,
    #[serde(default)]
    pub kind: Option<String>,
}

impl NewItem {
    /// Check the fields the database cannot express nicely.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Item name cannot be empty".to_string());
        }
        if self.calories < 0 {
            return Err("Calories cannot be negative".to_string());
        }
        if self.price.is_sign_negative() {
            return Err("Price cannot be negative".to_string());
        }
        if self.servings.is_some_and(|s| !s.is_finite() || s <= 0.0) {
            return Err("Servings must be a positive number".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latte() -> NewItem {
        NewItem {
            name: "Latte".to_string(),
            description: None,
            ingredients: Some("espresso, milk".to_string()),
            calories: 190,
            price: Decimal::new(450, 2),
            quantity: Some("350 ml".to_string()),
            servings: Some(1.0),
            veg_flag: true,
            kind: Some("drink".to_string()),
        }
    }

    #[test]
    fn valid_item_passes() {
        assert_eq!(latte().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_fields() {
        let blank = NewItem { name: "  ".to_string(), ..latte() };
        let negative_calories = NewItem { calories: -1, ..latte() };
        let negative_price = NewItem { price: Decimal::new(-1, 2), ..latte() };
        let zero_servings = NewItem { servings: Some(0.0), ..latte() };

        assert!(blank.validate().is_err());
        assert!(negative_calories.validate().is_err());
        assert!(negative_price.validate().is_err());
        assert!(zero_servings.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let item: NewItem = serde_json::from_str(r#"{"name":"Bagel","calories":250,"price":2.50}"#)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(item.price, Decimal::new(25, 1));
        assert!(!item.veg_flag);
        assert!(item.kind.is_none());
    }
}
