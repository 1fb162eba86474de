//! Shopping cart operations.

use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::cart::CartSummary;
use cafe_calories_core::{CartItemId, Email, ItemId};

use super::ServiceError;
use crate::db::{CartRepository, ItemRepository, UserRepository};
use crate::models::{CartView, User};

/// Line to add to the caller's cart.
#[derive(Debug, Clone)]
pub struct AddToCart {
    pub item_id: ItemId,
    pub quantity: i32,
    /// Who the line is for; the cart owner when `None`.
    pub assignee_email: Option<String>,
}

/// Cart operations for the authenticated user.
pub struct CartService<'a> {
    pool: &'a PgPool,
    carts: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            carts: CartRepository::new(pool),
        }
    }

    /// The caller's cart with its lines, created on first access.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn view(&self, user: &User) -> Result<CartView, ServiceError> {
        let cart = self.carts.get_or_create(user.id).await?;
        let items = self.carts.lines(cart.id).await?;
        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items,
        })
    }

    /// Add an item to the caller's cart.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if the quantity is below one.
    /// - `ServiceError::NotFound` if the item is missing or inactive.
    /// - `ServiceError::InvalidAssignee` if the assignee email does not
    ///   belong to an active user.
    #[instrument(skip(self, user, line), fields(user_id = %user.id, item_id = %line.item_id))]
    pub async fn add(&self, user: &User, line: &AddToCart) -> Result<CartItemId, ServiceError> {
        if line.quantity < 1 {
            return Err(ServiceError::Validation("quantity must be at least 1".to_string()));
        }

        ItemRepository::new(self.pool)
            .get(line.item_id)
            .await?
            .filter(|item| item.active)
            .ok_or_else(|| ServiceError::not_found("Item"))?;

        let assignee_id = match line.assignee_email.as_deref().map(str::trim) {
            None | Some("") => user.id,
            Some(raw) => {
                let email = Email::parse(raw).map_err(|_| ServiceError::InvalidAssignee)?;
                UserRepository::new(self.pool)
                    .get_active_by_email(&email)
                    .await?
                    .ok_or(ServiceError::InvalidAssignee)?
                    .id
            }
        };

        let cart = self.carts.get_or_create(user.id).await?;
        let id = self
            .carts
            .add_line(cart.id, line.item_id, line.quantity, assignee_id)
            .await?;

        tracing::debug!(cart_item_id = %id, assignee_id = %assignee_id, "Cart line added");
        Ok(id)
    }

    /// Per-person calorie and price subtotals of the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn summary(&self, user: &User) -> Result<CartSummary, ServiceError> {
        let cart = self.carts.get_or_create(user.id).await?;
        let lines = self.carts.summary_lines(cart.id).await?;
        Ok(CartSummary::from_lines(&lines))
    }

    /// Empty the caller's cart. Clearing an empty cart succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the delete fails.
    pub async fn clear(&self, user: &User) -> Result<(), ServiceError> {
        let removed = self.carts.clear(user.id).await?;
        tracing::debug!(user_id = %user.id, removed, "Cart cleared");
        Ok(())
    }
}
