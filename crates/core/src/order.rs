//! Order rules that do not need the database.
//!
//! [`OrderDraft::from_lines`] turns the lines of a cart into the totals and
//! per-line snapshots that get written to an order, and
//! [`ensure_cancellable`] decides whether the placer may still cancel.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::money;
use crate::{CafeId, ItemId, OrderStatus, UserId};

/// Why an order cannot be placed or cancelled.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderRuleError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("All items must be from the same cafe")]
    MixedCafe,
    #[error("order totals are too large")]
    TotalsOverflow,
    #[error("Cancel window has expired")]
    CancelWindowExpired,
    #[error("Cannot cancel an order that is {0}")]
    NotCancellable(OrderStatus),
}

/// One cart line joined with the item it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: ItemId,
    pub cafe_id: CafeId,
    pub unit_price: Decimal,
    pub unit_calories: i32,
    pub quantity: i32,
    pub assignee_id: UserId,
}

/// Frozen copy of a cart line as stored on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: i32,
    pub assignee_id: UserId,
    pub subtotal_price: Decimal,
    pub subtotal_calories: i32,
}

/// Everything needed to insert an order, computed from cart lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub cafe_id: CafeId,
    pub total_price: Decimal,
    pub total_calories: i32,
    pub lines: Vec<OrderLine>,
}

impl OrderDraft {
    /// Build a draft for `cafe_id`.
    ///
    /// # Errors
    ///
    /// - [`OrderRuleError::EmptyCart`] if there are no lines.
    /// - [`OrderRuleError::MixedCafe`] if any line belongs to another cafe.
    /// - [`OrderRuleError::TotalsOverflow`] if calories overflow.
    pub fn from_lines(cafe_id: CafeId, lines: &[CartLine]) -> Result<Self, OrderRuleError> {
        if lines.is_empty() {
            return Err(OrderRuleError::EmptyCart);
        }
        if lines.iter().any(|line| line.cafe_id != cafe_id) {
            return Err(OrderRuleError::MixedCafe);
        }

        let mut total_price = Decimal::ZERO;
        let mut total_calories: i32 = 0;
        let mut snapshot = Vec::with_capacity(lines.len());

        for line in lines {
            let subtotal_calories = line
                .unit_calories
                .checked_mul(line.quantity)
                .ok_or(OrderRuleError::TotalsOverflow)?;
            total_calories = total_calories
                .checked_add(subtotal_calories)
                .ok_or(OrderRuleError::TotalsOverflow)?;

            let raw_price = line.unit_price * Decimal::from(line.quantity);
            total_price += raw_price;

            snapshot.push(OrderLine {
                item_id: line.item_id,
                quantity: line.quantity,
                assignee_id: line.assignee_id,
                subtotal_price: money::round_cents(raw_price),
                subtotal_calories,
            });
        }

        Ok(Self {
            cafe_id,
            total_price: money::round_cents(total_price),
            total_calories,
            lines: snapshot,
        })
    }
}

/// Latest instant at which an order created at `created_at` may be cancelled.
#[must_use]
pub fn cancel_deadline(created_at: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    created_at + grace
}

/// Check the placer's cancellation against the deadline, then the status.
///
/// The deadline itself is still inside the window.
///
/// # Errors
///
/// [`OrderRuleError::CancelWindowExpired`] after the deadline, otherwise
/// [`OrderRuleError::NotCancellable`] unless the order is pending or accepted.
pub fn ensure_cancellable(
    status: OrderStatus,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), OrderRuleError> {
    if now > deadline {
        return Err(OrderRuleError::CancelWindowExpired);
    }
    if !status.is_cancellable() {
        return Err(OrderRuleError::NotCancellable(status));
    }
    Ok(())
}
