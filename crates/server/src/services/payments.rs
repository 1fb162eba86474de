//! Mock payments and refunds.

use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::{OrderId, OrderStatus, RefundRequestId, RefundStatus, Role};

use super::ServiceError;
use super::authz::require_role;
use crate::db::{OrderRepository, PaymentRepository, RepositoryError, orders, payments};
use crate::models::{Order, Payment, RefundRequest, User};

/// Payment operations.
pub struct PaymentService<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Settle an open order the caller placed.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` unless the caller placed the order.
    /// - `ServiceError::InvalidState` unless the order is pending or
    ///   accepted, or if it is already paid.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn pay(&self, user: &User, order_id: OrderId) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        if !order.status.is_payable() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot pay for an order that is {}",
                order.status
            )));
        }

        let payment = payments::insert_paid(&mut tx, order_id, order.total_price).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, payment_id = %payment.id, "Order paid");
        Ok(payment)
    }

    /// Ask for a paid order to be refunded.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` unless the caller placed the order.
    /// - `ServiceError::InvalidState` if the order is not paid or a request
    ///   is already pending.
    /// - `ServiceError::Validation` for a blank reason.
    #[instrument(skip(self, user, reason), fields(user_id = %user.id))]
    pub async fn request_refund(
        &self,
        user: &User,
        order_id: OrderId,
        reason: &str,
    ) -> Result<RefundRequest, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Validation("reason cannot be empty".to_string()));
        }

        OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or_else(|| ServiceError::not_found("Order"))?;

        let repo = PaymentRepository::new(self.pool);
        if !repo.is_paid(order_id).await? {
            return Err(ServiceError::InvalidState("Order has not been paid".to_string()));
        }

        let request = repo.create_refund(order_id, reason).await?;
        tracing::info!(order_id = %order_id, refund_id = %request.id, "Refund requested");
        Ok(request)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn list_refunds(
        &self,
        user: &User,
        status: Option<RefundStatus>,
    ) -> Result<Vec<RefundRequest>, ServiceError> {
        require_role(user, &[Role::Admin])?;
        Ok(PaymentRepository::new(self.pool).list_refunds(status).await?)
    }

    /// Approve or reject a pending refund request.
    ///
    /// Approval marks the payment and the order refunded in the same
    /// transaction as the request.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Forbidden` for non-admins.
    /// - `ServiceError::NotFound` for an unknown request.
    /// - `ServiceError::InvalidState` if the request is no longer pending or
    ///   the payment was already refunded.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn resolve_refund(
        &self,
        user: &User,
        refund_id: RefundRequestId,
        approve: bool,
    ) -> Result<(RefundRequest, Option<Order>), ServiceError> {
        require_role(user, &[Role::Admin])?;

        let mut tx = self.pool.begin().await?;

        let request = payments::lock_refund(&mut tx, refund_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Refund request"))?;
        if request.status != RefundStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "Refund request is already {}",
                request.status
            )));
        }

        if !approve {
            let request = payments::resolve_refund(&mut tx, refund_id, RefundStatus::Rejected).await?;
            tx.commit().await?;
            tracing::info!(refund_id = %refund_id, "Refund rejected");
            return Ok((request, None));
        }

        orders::lock(&mut tx, request.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        if !payments::mark_refunded(&mut tx, request.order_id).await? {
            return Err(ServiceError::InvalidState(
                "Order has no settled payment".to_string(),
            ));
        }
        let order = orders::set_status(&mut tx, request.order_id, OrderStatus::Refunded)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("Order"),
                other => other.into(),
            })?;
        let request = payments::resolve_refund(&mut tx, refund_id, RefundStatus::Approved).await?;

        tx.commit().await?;

        tracing::info!(refund_id = %refund_id, order_id = %order.id, "Refund approved");
        Ok((request, Some(order)))
    }
}
