//! Orders and their frozen line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cafe_calories_core::{CafeId, ItemId, OrderId, OrderItemId, OrderStatus, PickupCode, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub cafe_id: CafeId,
    pub driver_id: Option<UserId>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub can_cancel_until: DateTime<Utc>,
    pub pickup_code: PickupCode,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub total_calories: i32,
}

/// Snapshot of a cart line at placement time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: i32,
    pub assignee_id: UserId,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal_price: Decimal,
    pub subtotal_calories: i32,
}
