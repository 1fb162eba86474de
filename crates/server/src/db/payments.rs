//! Payments and refund requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cafe_calories_core::{OrderId, PaymentId, PaymentStatus, RefundRequestId, RefundStatus};

use super::RepositoryError;
use crate::models::payment::MOCK_PROVIDER;
use crate::models::{Payment, RefundRequest};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    order_id: OrderId,
    provider: String,
    amount: Decimal,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            provider: row.provider,
            amount: row.amount,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: RefundRequestId,
    order_id: OrderId,
    reason: String,
    status: RefundStatus,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl From<RefundRow> for RefundRequest {
    fn from(row: RefundRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            reason: row.reason,
            status: row.status,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        }
    }
}

const REFUND_COLUMNS: &str = "id, order_id, reason, status, created_at, resolved_at";

/// Repository for payments and refunds.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether the order has a settled payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_paid(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let paid: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = 'PAID')",
        )
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;
        Ok(paid)
    }

    /// Open a refund request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a request is already pending.
    pub async fn create_refund(
        &self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<RefundRequest, RepositoryError> {
        let row = sqlx::query_as::<_, RefundRow>(&format!(
            "INSERT INTO refund_requests (order_id, reason) VALUES ($1, $2) RETURNING {REFUND_COLUMNS}"
        ))
        .bind(order_id)
        .bind(reason)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::unique_violation(e, "A refund request is already pending for this order")
        })?;

        Ok(row.into())
    }

    /// Refund requests, oldest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_refunds(
        &self,
        status: Option<RefundStatus>,
    ) -> Result<Vec<RefundRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, RefundRow>(&format!(
            r"
            SELECT {REFUND_COLUMNS} FROM refund_requests
            WHERE ($1::refund_status IS NULL OR status = $1)
            ORDER BY created_at, id
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Record a settled mock payment.
///
/// The partial unique index on `(order_id) WHERE status = 'PAID'` turns a
/// concurrent double payment into `RepositoryError::Conflict`.
pub(crate) async fn insert_paid(
    conn: &mut PgConnection,
    order_id: OrderId,
    amount: Decimal,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r"
        INSERT INTO payments (order_id, provider, amount, status)
        VALUES ($1, $2, $3, 'PAID')
        RETURNING id, order_id, provider, amount, status, created_at
        ",
    )
    .bind(order_id)
    .bind(MOCK_PROVIDER)
    .bind(amount)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::unique_violation(e, "Order is already paid"))?;

    Ok(row.into())
}

/// Flip the order's settled payment to refunded. Returns false if there was none.
pub(crate) async fn mark_refunded(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'REFUNDED' WHERE order_id = $1 AND status = 'PAID'",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn lock_refund(
    conn: &mut PgConnection,
    id: RefundRequestId,
) -> Result<Option<RefundRequest>, RepositoryError> {
    let row = sqlx::query_as::<_, RefundRow>(&format!(
        "SELECT {REFUND_COLUMNS} FROM refund_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

pub(crate) async fn resolve_refund(
    conn: &mut PgConnection,
    id: RefundRequestId,
    status: RefundStatus,
) -> Result<RefundRequest, RepositoryError> {
    let row = sqlx::query_as::<_, RefundRow>(&format!(
        r"
        UPDATE refund_requests SET status = $2, resolved_at = NOW()
        WHERE id = $1
        RETURNING {REFUND_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    Ok(row.into())
}
