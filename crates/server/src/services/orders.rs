//! Order placement and lifecycle.
//!
//! Placement turns the caller's cart into an order in a single transaction
//! that holds the cart row lock, so a cart can be consumed at most once.
//! Status changes lock the order row and apply the staff transition table
//! from [`OrderStatus::allowed_transitions`].

use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::order::{OrderDraft, OrderRuleError, cancel_deadline, ensure_cancellable};
use cafe_calories_core::{CafeId, OrderId, OrderStatus, PickupCode};

use super::ServiceError;
use super::authz::Guard;
use crate::config::OrderConfig;
use crate::db::{OrderRepository, carts, orders};
use crate::models::{Order, OrderItem, User};

/// Order operations.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    guard: Guard<'a>,
    config: OrderConfig,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: OrderConfig) -> Self {
        Self {
            pool,
            guard: Guard::new(pool),
            config,
        }
    }

    /// Place an order for everything in the caller's cart.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Rule(EmptyCart)` if the cart has no lines.
    /// - `ServiceError::Rule(MixedCafe)` if any line is from another cafe.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn place(&self, user: &User, cafe_id: CafeId) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let cart_id = carts::lock_cart(&mut tx, user.id)
            .await?
            .ok_or(OrderRuleError::EmptyCart)?;
        let lines = carts::order_lines(&mut tx, cart_id).await?;
        let draft = OrderDraft::from_lines(cafe_id, &lines)?;

        let created_at = Utc::now();
        let pickup_code = PickupCode::from_bytes(rand::rng().random());
        let order = orders::insert(
            &mut tx,
            user.id,
            &draft,
            &pickup_code,
            created_at,
            cancel_deadline(created_at, self.config.cancel_grace),
        )
        .await?;
        carts::clear_lines(&mut tx, cart_id).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            cafe_id = %cafe_id,
            lines = draft.lines.len(),
            total_calories = order.total_calories,
            "Order placed"
        );
        Ok(order)
    }

    /// Cancel an order the caller placed while the window is open.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` unless the caller placed the order.
    /// - `ServiceError::Rule(CancelWindowExpired)` after the deadline.
    /// - `ServiceError::Rule(NotCancellable)` unless pending or accepted.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel(&self, user: &User, order_id: OrderId) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        ensure_cancellable(order.status, order.can_cancel_until, Utc::now())?;
        let order = orders::set_status(&mut tx, order_id, OrderStatus::Cancelled).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Order cancelled");
        Ok(order)
    }

    /// Orders the caller placed, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn mine(&self, user: &User) -> Result<Vec<Order>, ServiceError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user.id).await?)
    }

    /// Orders of a cafe for its owner, staff or an admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden` from the
    /// cafe access check.
    pub async fn for_cafe(
        &self,
        user: &User,
        cafe_id: CafeId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ServiceError> {
        self.guard.require_cafe_access(cafe_id, user).await?;
        Ok(OrderRepository::new(self.pool)
            .list_for_cafe(cafe_id, status)
            .await?)
    }

    /// Line snapshots of an order.
    ///
    /// Visible to the placer, the assigned driver and anyone with access to
    /// the cafe.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown order and
    /// `ServiceError::Forbidden` for anyone else.
    pub async fn items(&self, user: &User, order_id: OrderId) -> Result<Vec<OrderItem>, ServiceError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo
            .get(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        if order.user_id != user.id && order.driver_id != Some(user.id) {
            self.guard.require_cafe_access(order.cafe_id, user).await?;
        }

        Ok(repo.items(order_id).await?)
    }

    /// Move an order along the staff transition table.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` for an unknown order.
    /// - `ServiceError::Forbidden` without access to the order's cafe.
    /// - `ServiceError::InvalidTransition` if the table does not allow it.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_status(
        &self,
        user: &User,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        self.guard.require_cafe_access(order.cafe_id, user).await?;

        if !order.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        let updated = orders::set_status(&mut tx, order_id, next).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, from = %order.status, to = %next, "Order status changed");
        Ok(updated)
    }
}
