//! Calorie goals and intake.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use cafe_calories_core::{GoalId, GoalPeriod, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::CalorieGoal;

#[derive(Debug, sqlx::FromRow)]
struct GoalRow {
    id: GoalId,
    user_id: UserId,
    period: GoalPeriod,
    target_calories: i32,
    start_date: NaiveDate,
}

impl From<GoalRow> for CalorieGoal {
    fn from(row: GoalRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            period: row.period,
            target_calories: row.target_calories,
            start_date: row.start_date,
        }
    }
}

/// Repository for calorie goals.
pub struct GoalRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GoalRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        period: GoalPeriod,
        target_calories: i32,
        start_date: NaiveDate,
    ) -> Result<CalorieGoal, RepositoryError> {
        let row = sqlx::query_as::<_, GoalRow>(
            r"
            INSERT INTO calorie_goals (user_id, period, target_calories, start_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, period, target_calories, start_date
            ",
        )
        .bind(user_id)
        .bind(period)
        .bind(target_calories)
        .bind(start_date)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// All goals of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CalorieGoal>, RepositoryError> {
        let rows = sqlx::query_as::<_, GoalRow>(
            r"
            SELECT id, user_id, period, target_calories, start_date
            FROM calorie_goals
            WHERE user_id = $1
            ORDER BY start_date DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Calories assigned to `user_id` in orders they placed since `since`.
    ///
    /// Declined, cancelled and refunded orders are excluded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn intake_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(oi.subtotal_calories), 0)::BIGINT
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.user_id = $1
              AND oi.assignee_id = $1
              AND o.created_at >= $2
              AND NOT (o.status::TEXT = ANY($3))
            ",
        )
        .bind(user_id)
        .bind(since)
        .bind(OrderStatus::names_where(OrderStatus::is_voided))
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}
