//! Driver locations, availability and order assignment.
//!
//! A driver's current state is their newest `driver_locations` row. Every
//! write for a driver first takes that driver's advisory lock and re-reads
//! the newest row inside the same transaction, so two assignments racing for
//! one idle driver serialize.
//!
//! Automatic selection holds every candidate lock it took until commit and
//! visits candidates in a per-cafe distance order, so it only ever tries
//! those locks. A busy candidate is skipped rather than waited for.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cafe_calories_core::geo::{Coordinate, nearest};
use cafe_calories_core::{DriverStatus, OrderId, OrderStatus, Role, UserId};

use super::ServiceError;
use super::authz::{Guard, require_role, require_self_or_admin};
use crate::db::drivers::{self, NewLocation};
use crate::db::{DriverRepository, OrderRepository, UserRepository, orders};
use crate::models::{DriverLocation, DriverState, Order, User};

/// How far ahead of the server clock a reported timestamp may be.
const MAX_CLOCK_SKEW: Duration = Duration::minutes(1);

/// A location report from a driver's device.
#[derive(Debug, Clone, Copy)]
pub struct LocationReport {
    pub lat: f64,
    pub lng: f64,
    /// Keeps the current status when `None`.
    pub status: Option<DriverStatus>,
    /// Device time of the fix; server time when `None`.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Dispatch operations.
pub struct DispatchService<'a> {
    pool: &'a PgPool,
    guard: Guard<'a>,
}

impl<'a> DispatchService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            guard: Guard::new(pool),
        }
    }

    async fn require_driver(&self, driver_id: UserId) -> Result<User, ServiceError> {
        UserRepository::new(self.pool)
            .get_by_id(driver_id)
            .await?
            .filter(|user| user.role == Role::Driver && user.is_active)
            .ok_or_else(|| ServiceError::not_found("Driver"))
    }

    /// Latest record of the calling driver, if they ever reported one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-drivers.
    pub async fn me(&self, user: &User) -> Result<Option<DriverLocation>, ServiceError> {
        require_role(user, &[Role::Driver])?;
        Ok(DriverRepository::new(self.pool).latest(user.id).await?)
    }

    /// Append a location report.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Forbidden` unless the caller is that driver or admin.
    /// - `ServiceError::NotFound` if `driver_id` is not an active driver.
    /// - `ServiceError::Validation` for bad coordinates or a timestamp too far
    ///   in the future.
    #[instrument(skip(self, user, report), fields(user_id = %user.id))]
    pub async fn record_location(
        &self,
        user: &User,
        driver_id: UserId,
        report: LocationReport,
    ) -> Result<DriverLocation, ServiceError> {
        require_self_or_admin(user, driver_id)?;
        self.require_driver(driver_id).await?;

        let at = Coordinate::new(report.lat, report.lng)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let now = Utc::now();
        let recorded_at = report.timestamp.unwrap_or(now);
        if recorded_at > now + MAX_CLOCK_SKEW {
            return Err(ServiceError::Validation(
                "timestamp cannot be in the future".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        drivers::lock_driver(&mut tx, driver_id).await?;
        let current = drivers::latest(&mut tx, driver_id).await?;

        let status = report
            .status
            .or_else(|| current.as_ref().map(|latest| latest.status))
            .unwrap_or_default();
        let location = drivers::append(
            &mut tx,
            NewLocation {
                driver_id,
                lat: at.lat,
                lng: at.lng,
                status,
                recorded_at,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(location)
    }

    /// Change status at the driver's last known location.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the driver never reported a location.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn set_status(
        &self,
        user: &User,
        driver_id: UserId,
        status: DriverStatus,
    ) -> Result<DriverLocation, ServiceError> {
        require_self_or_admin(user, driver_id)?;

        let mut tx = self.pool.begin().await?;
        drivers::lock_driver(&mut tx, driver_id).await?;
        let current = drivers::latest(&mut tx, driver_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Driver location"))?;

        let location = append_status(&mut tx, &current, status).await?;

        tx.commit().await?;
        tracing::info!(driver_id = %driver_id, status = %status, "Driver status changed");
        Ok(location)
    }

    /// Idle drivers with their last known location.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller is admin, owner or staff.
    pub async fn available(&self, user: &User) -> Result<Vec<DriverState>, ServiceError> {
        require_role(user, &[Role::Admin, Role::Owner, Role::Staff])?;
        Ok(DriverRepository::new(self.pool).idle_drivers().await?)
    }

    /// Nearest idle driver to `origin` with the distance in kilometres.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn nearest_idle_driver(
        &self,
        origin: Coordinate,
    ) -> Result<Option<(DriverState, f64)>, ServiceError> {
        let mut candidates = DriverRepository::new(self.pool).idle_drivers().await?;
        Ok(take_nearest(origin, &mut candidates))
    }

    /// Orders currently attached to a driver.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller is that driver or admin.
    pub async fn assigned_orders(&self, user: &User, driver_id: UserId) -> Result<Vec<Order>, ServiceError> {
        require_self_or_admin(user, driver_id)?;
        Ok(OrderRepository::new(self.pool).list_for_driver(driver_id).await?)
    }

    /// Attach a driver to an accepted or ready order.
    ///
    /// With `driver_id` that driver must be idle; without it the nearest idle
    /// driver to the cafe is chosen.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` for an unknown order or driver.
    /// - `ServiceError::Forbidden` without access to the order's cafe.
    /// - `ServiceError::InvalidState` if the order already has a driver, is
    ///   not accepted or ready, or the requested driver is busy.
    /// - `ServiceError::NoDriversAvailable` if no idle driver could be claimed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn assign(
        &self,
        user: &User,
        order_id: OrderId,
        driver_id: Option<UserId>,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))?;
        let (cafe, _) = self.guard.require_cafe_access(order.cafe_id, user).await?;

        if order.driver_id.is_some() {
            return Err(ServiceError::InvalidState(
                "Order already has a driver".to_string(),
            ));
        }
        if !order.status.is_assignable() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot assign a driver to an order that is {}",
                order.status
            )));
        }

        let driver_id = if let Some(requested) = driver_id {
            self.require_driver(requested).await?;
            if !claim(&mut tx, requested).await? {
                return Err(ServiceError::InvalidState(
                    "Driver is not available".to_string(),
                ));
            }
            requested
        } else {
            let mut candidates = drivers::idle_drivers(&mut tx).await?;
            loop {
                let (candidate, distance_km) = take_nearest(cafe.location(), &mut candidates)
                    .ok_or(ServiceError::NoDriversAvailable)?;
                if try_claim(&mut tx, candidate.driver_id).await? {
                    tracing::debug!(driver_id = %candidate.driver_id, distance_km, "Nearest idle driver claimed");
                    break candidate.driver_id;
                }
            }
        };

        let order = orders::set_driver_if_unassigned(&mut tx, order_id, driver_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidState("Order already has a driver".to_string()))?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, driver_id = %driver_id, "Driver assigned");
        Ok(order)
    }

    /// The driver collected the order from the cafe.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the order is not assigned to the
    /// driver and `ServiceError::InvalidTransition` unless it is ready.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn pickup(
        &self,
        user: &User,
        driver_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        require_self_or_admin(user, driver_id)?;

        let mut tx = self.pool.begin().await?;
        let order = lock_assigned(&mut tx, order_id, driver_id).await?;
        ensure_transition(order.status, OrderStatus::PickedUp)?;

        let order = orders::set_status(&mut tx, order_id, OrderStatus::PickedUp).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, driver_id = %driver_id, "Order picked up");
        Ok(order)
    }

    /// The driver handed the order over. Frees the driver.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the order is not assigned to the
    /// driver and `ServiceError::InvalidTransition` unless it was picked up.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn deliver(
        &self,
        user: &User,
        driver_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        require_self_or_admin(user, driver_id)?;

        let mut tx = self.pool.begin().await?;
        let order = lock_assigned(&mut tx, order_id, driver_id).await?;
        if order.status != OrderStatus::PickedUp {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Delivered,
            });
        }

        let order = orders::set_status(&mut tx, order_id, OrderStatus::Delivered).await?;

        drivers::lock_driver(&mut tx, driver_id).await?;
        if let Some(current) = drivers::latest(&mut tx, driver_id).await? {
            append_status(&mut tx, &current, DriverStatus::Idle).await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order_id, driver_id = %driver_id, "Order delivered");
        Ok(order)
    }
}

fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition { from, to })
    }
}

async fn lock_assigned(
    conn: &mut PgConnection,
    order_id: OrderId,
    driver_id: UserId,
) -> Result<Order, ServiceError> {
    let order = orders::lock(conn, order_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order"))?;
    if order.driver_id != Some(driver_id) {
        return Err(ServiceError::Forbidden(
            "Order is not assigned to this driver".to_string(),
        ));
    }
    Ok(order)
}

/// Mark an idle driver occupied. Returns false if they are not idle.
async fn claim(conn: &mut PgConnection, driver_id: UserId) -> Result<bool, ServiceError> {
    drivers::lock_driver(conn, driver_id).await?;
    occupy_if_idle(conn, driver_id).await
}

/// Like [`claim`], but a driver whose lock is held elsewhere counts as taken.
async fn try_claim(conn: &mut PgConnection, driver_id: UserId) -> Result<bool, ServiceError> {
    if !drivers::try_lock_driver(conn, driver_id).await? {
        tracing::debug!(driver_id = %driver_id, "Candidate driver locked elsewhere, skipping");
        return Ok(false);
    }
    occupy_if_idle(conn, driver_id).await
}

async fn occupy_if_idle(conn: &mut PgConnection, driver_id: UserId) -> Result<bool, ServiceError> {
    match drivers::latest(conn, driver_id).await? {
        Some(current) if current.status == DriverStatus::Idle => {
            append_status(conn, &current, DriverStatus::Occupied).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

async fn append_status(
    conn: &mut PgConnection,
    current: &DriverLocation,
    status: DriverStatus,
) -> Result<DriverLocation, ServiceError> {
    Ok(drivers::append(
        conn,
        NewLocation {
            driver_id: current.driver_id,
            lat: current.lat,
            lng: current.lng,
            status,
            recorded_at: next_timestamp(current.recorded_at, Utc::now()),
        },
    )
    .await?)
}

/// A new row must sort after `latest` even if that report was slightly ahead
/// of the server clock.
fn next_timestamp(latest: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    latest.max(now)
}

/// Remove and return the candidate closest to `origin`.
fn take_nearest(origin: Coordinate, candidates: &mut Vec<DriverState>) -> Option<(DriverState, f64)> {
    let (index, distance) = nearest(
        origin,
        candidates
            .iter()
            .enumerate()
            .map(|(index, driver)| (index, driver.location())),
    )?;
    Some((candidates.remove(index), distance))
}
