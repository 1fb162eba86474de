//! Cart types.

use rust_decimal::Decimal;
use serde::Serialize;

use cafe_calories_core::{CafeId, CartId, CartItemId, Email, ItemId, UserId};

/// A user's basket. At most one per user.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

/// One cart line with the item and assignee resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub item_id: ItemId,
    pub cafe_id: CafeId,
    pub item_name: String,
    pub quantity: i32,
    pub assignee_id: UserId,
    pub assignee_email: Email,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub unit_calories: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLineView>,
}
