//! Money arithmetic.
//!
//! Prices are exact decimals. Every total that is shown to a customer or
//! stored on an order is rounded to two decimal places, half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every stored amount.
pub const SCALE: u32 = 2;

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit price times quantity, rounded to cents.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    round_cents(unit_price * Decimal::from(quantity))
}
