//! Order repository.
//!
//! Reads go through [`OrderRepository`]. Writes that must be atomic with
//! other tables (placement, status changes, driver assignment) are free
//! functions over a `PgConnection` so callers can run them inside one
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cafe_calories_core::order::OrderDraft;
use cafe_calories_core::{
    CafeId, ItemId, OrderId, OrderItemId, OrderStatus, PickupCode, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem};

const ORDER_COLUMNS: &str = "id, user_id, cafe_id, driver_id, status, created_at, \
                             can_cancel_until, pickup_code, total_price, total_calories";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    cafe_id: CafeId,
    driver_id: Option<UserId>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    can_cancel_until: DateTime<Utc>,
    pickup_code: PickupCode,
    total_price: Decimal,
    total_calories: i32,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            cafe_id: row.cafe_id,
            driver_id: row.driver_id,
            status: row.status,
            created_at: row.created_at,
            can_cancel_until: row.can_cancel_until,
            pickup_code: row.pickup_code,
            total_price: row.total_price,
            total_calories: row.total_calories,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    item_id: ItemId,
    item_name: String,
    quantity: i32,
    assignee_id: UserId,
    subtotal_price: Decimal,
    subtotal_calories: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            item_id: row.item_id,
            item_name: row.item_name,
            quantity: row.quantity,
            assignee_id: row.assignee_id,
            subtotal_price: row.subtotal_price,
            subtotal_calories: row.subtotal_calories,
        }
    }
}

/// Read access to orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Orders placed by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Orders of a cafe, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_cafe(
        &self,
        cafe_id: CafeId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE cafe_id = $1 AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(cafe_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Orders currently assigned to a driver, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_driver(&self, driver_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE driver_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(driver_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Line snapshots of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.item_id, i.name AS item_name, oi.quantity,
                   oi.assignee_id, oi.subtotal_price, oi.subtotal_calories
            FROM order_items oi
            JOIN items i ON i.id = oi.item_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Lock an order row for the rest of the transaction.
pub(crate) async fn lock(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert an order and its line snapshots.
pub(crate) async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    draft: &OrderDraft,
    pickup_code: &PickupCode,
    created_at: DateTime<Utc>,
    can_cancel_until: DateTime<Utc>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO orders
            (user_id, cafe_id, status, created_at, can_cancel_until, pickup_code, total_price, total_calories)
        VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, $7)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(draft.cafe_id)
    .bind(created_at)
    .bind(can_cancel_until)
    .bind(pickup_code)
    .bind(draft.total_price)
    .bind(draft.total_calories)
    .fetch_one(&mut *conn)
    .await?;

    for line in &draft.lines {
        sqlx::query(
            r"
            INSERT INTO order_items
                (order_id, item_id, quantity, assignee_id, subtotal_price, subtotal_calories)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(row.id)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.assignee_id)
        .bind(line.subtotal_price)
        .bind(line.subtotal_calories)
        .execute(&mut *conn)
        .await?;
    }

    Ok(row.into())
}

pub(crate) async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}

/// Attach a driver unless one is already attached.
///
/// Returns `None` when the order already had a driver.
pub(crate) async fn set_driver_if_unassigned(
    conn: &mut PgConnection,
    id: OrderId,
    driver_id: UserId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET driver_id = $2 WHERE id = $1 AND driver_id IS NULL RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(driver_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}
