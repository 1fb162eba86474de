//! Cart repository.
//!
//! Each user has at most one cart, enforced by a unique constraint and created
//! lazily with `ON CONFLICT DO NOTHING`. Order placement locks the cart row
//! through [`lock_cart`] so two concurrent placements cannot both consume the
//! same lines.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cafe_calories_core::cart::SummaryLine;
use cafe_calories_core::order::CartLine;
use cafe_calories_core::{CafeId, CartId, CartItemId, Email, ItemId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartLineView};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    item_id: ItemId,
    cafe_id: CafeId,
    item_name: String,
    quantity: i32,
    assignee_id: UserId,
    assignee_email: Email,
    unit_price: Decimal,
    unit_calories: i32,
}

const LINE_QUERY: &str = r"
    SELECT ci.id, ci.item_id, i.cafe_id, i.name AS item_name, ci.quantity,
           ci.assignee_id, u.email AS assignee_email,
           i.price AS unit_price, i.calories AS unit_calories
    FROM cart_items ci
    JOIN items i ON i.id = ci.item_id
    JOIN users u ON u.id = ci.assignee_id
    WHERE ci.cart_id = $1
    ORDER BY ci.id
";

/// Repository for carts and cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Return the user's cart, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        let row = sqlx::query_as::<_, CartRow>("SELECT id, user_id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(Cart {
            id: row.id,
            user_id: row.user_id,
        })
    }

    /// Append a line to a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_line(
        &self,
        cart_id: CartId,
        item_id: ItemId,
        quantity: i32,
        assignee_id: UserId,
    ) -> Result<CartItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartItemId>(
            r"
            INSERT INTO cart_items (cart_id, item_id, quantity, assignee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .bind(assignee_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Lines of a cart with item and assignee details, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLineView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(LINE_QUERY)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| CartLineView {
                id: r.id,
                item_id: r.item_id,
                cafe_id: r.cafe_id,
                item_name: r.item_name,
                quantity: r.quantity,
                assignee_id: r.assignee_id,
                assignee_email: r.assignee_email,
                unit_price: r.unit_price,
                unit_calories: r.unit_calories,
            })
            .collect())
    }

    /// Lines shaped for the per-person summary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary_lines(&self, cart_id: CartId) -> Result<Vec<SummaryLine>, RepositoryError> {
        Ok(self
            .lines(cart_id)
            .await?
            .into_iter()
            .map(|line| SummaryLine {
                assignee_email: line.assignee_email.into_inner(),
                unit_price: line.unit_price,
                unit_calories: line.unit_calories,
                quantity: line.quantity,
            })
            .collect())
    }

    /// Remove every line from the user's cart. Succeeds when there is nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Lock the user's cart row for the rest of the transaction.
pub(crate) async fn lock_cart(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<CartId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, CartId>("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Cart lines joined with current item prices, for order placement.
pub(crate) async fn order_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(LINE_QUERY)
        .bind(cart_id)
        .fetch_all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| CartLine {
            item_id: r.item_id,
            cafe_id: r.cafe_id,
            unit_price: r.unit_price,
            unit_calories: r.unit_calories,
            quantity: r.quantity,
            assignee_id: r.assignee_id,
        })
        .collect())
}

pub(crate) async fn clear_lines(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}
