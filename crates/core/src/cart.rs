//! Cart summaries.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::money;

/// A cart line with the assignee resolved to their email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub assignee_email: String,
    pub unit_price: Decimal,
    pub unit_calories: i32,
    pub quantity: i32,
}

/// What one person's share of the cart adds up to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersonSubtotal {
    pub calories: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Per-assignee subtotals plus grand totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub by_person: BTreeMap<String, PersonSubtotal>,
    pub total_calories: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(lines: &[SummaryLine]) -> Self {
        let mut summary = Self::default();

        for line in lines {
            let calories = i64::from(line.unit_calories) * i64::from(line.quantity);
            let price = line.unit_price * Decimal::from(line.quantity);

            let person = summary
                .by_person
                .entry(line.assignee_email.clone())
                .or_default();
            person.calories += calories;
            person.price += price;

            summary.total_calories += calories;
            summary.total_price += price;
        }

        for person in summary.by_person.values_mut() {
            person.price = money::round_cents(person.price);
        }
        summary.total_price = money::round_cents(summary.total_price);
        summary
    }
}
