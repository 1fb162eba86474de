//! Per-cafe reporting queries.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use cafe_calories_core::{CafeId, OrderStatus};

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DayCount {
    pub day: NaiveDate,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemCount {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DayRevenue {
    pub day: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

/// Calendar day of `created_at` at a fixed UTC offset bound as `$2` seconds.
const LOCAL_DAY: &str = "((created_at AT TIME ZONE 'UTC') + make_interval(secs => $2))::DATE";

/// Maximum number of entries in the top-items list.
const TOP_ITEMS: i64 = 10;

/// Repository for analytics aggregates.
pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of orders per calendar day at `offset`, oldest day first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_per_day(
        &self,
        cafe_id: CafeId,
        offset: FixedOffset,
    ) -> Result<Vec<DayCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, DayCount>(&format!(
            r"
            SELECT {LOCAL_DAY} AS day, COUNT(*) AS orders
            FROM orders
            WHERE cafe_id = $1
            GROUP BY day
            ORDER BY day
            "
        ))
        .bind(cafe_id)
        .bind(offset_seconds(offset))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Best-selling items by total quantity ordered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_items(&self, cafe_id: CafeId) -> Result<Vec<ItemCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemCount>(
            r"
            SELECT i.name, SUM(oi.quantity)::BIGINT AS quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN items i ON i.id = oi.item_id
            WHERE o.cafe_id = $1
            GROUP BY i.name
            ORDER BY quantity DESC, i.name
            LIMIT $2
            ",
        )
        .bind(cafe_id)
        .bind(TOP_ITEMS)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Revenue per day at `offset` over accepted, ready and picked-up orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_per_day(
        &self,
        cafe_id: CafeId,
        offset: FixedOffset,
    ) -> Result<Vec<DayRevenue>, RepositoryError> {
        let rows = sqlx::query_as::<_, DayRevenue>(&format!(
            r"
            SELECT {LOCAL_DAY} AS day, SUM(total_price) AS revenue
            FROM orders
            WHERE cafe_id = $1 AND status::TEXT = ANY($3)
            GROUP BY day
            ORDER BY day
            "
        ))
        .bind(cafe_id)
        .bind(offset_seconds(offset))
        .bind(OrderStatus::names_where(OrderStatus::counts_as_revenue))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

fn offset_seconds(offset: FixedOffset) -> f64 {
    f64::from(offset.local_minus_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn offsets_bind_as_seconds_east_of_utc() {
        let kolkata = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let denver = FixedOffset::west_opt(7 * 3600).unwrap();
        assert!((offset_seconds(kolkata) - 19_800.0).abs() < f64::EPSILON);
        assert!((offset_seconds(denver) + 25_200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn day_buckets_share_the_offset_parameter() {
        assert!(LOCAL_DAY.contains("$2"));
        assert!(LOCAL_DAY.starts_with("((created_at AT TIME ZONE 'UTC')"));
    }
}
