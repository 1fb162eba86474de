//! Per-cafe reporting.

use chrono::Local;
use serde::Serialize;
use sqlx::PgPool;

use cafe_calories_core::CafeId;

use super::ServiceError;
use super::authz::Guard;
use crate::db::AnalyticsRepository;
use crate::db::analytics::{DayCount, DayRevenue, ItemCount};
use crate::models::User;

/// Dashboard figures for one cafe.
#[derive(Debug, Clone, Serialize)]
pub struct CafeAnalytics {
    pub cafe_id: CafeId,
    pub orders_per_day: Vec<DayCount>,
    pub top_items: Vec<ItemCount>,
    pub revenue_per_day: Vec<DayRevenue>,
}

pub struct AnalyticsService<'a> {
    guard: Guard<'a>,
    reports: AnalyticsRepository<'a>,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            guard: Guard::new(pool),
            reports: AnalyticsRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden` from the
    /// cafe access check.
    pub async fn for_cafe(&self, user: &User, cafe_id: CafeId) -> Result<CafeAnalytics, ServiceError> {
        self.guard.require_cafe_access(cafe_id, user).await?;

        // Same day boundary as the intake report: the server's local midnight.
        let offset = *Local::now().offset();
        let (orders_per_day, top_items, revenue_per_day) = tokio::try_join!(
            self.reports.orders_per_day(cafe_id, offset),
            self.reports.top_items(cafe_id),
            self.reports.revenue_per_day(cafe_id, offset),
        )?;

        Ok(CafeAnalytics {
            cafe_id,
            orders_per_day,
            top_items,
            revenue_per_day,
        })
    }
}
