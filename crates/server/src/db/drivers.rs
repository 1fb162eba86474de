//! Driver location history.
//!
//! `driver_locations` is append-only; a driver's current state is their most
//! recent row. Status changes are serialized per driver with a
//! transaction-scoped advisory lock ([`lock_driver`]) so a claim can re-read
//! the latest status without another transaction slipping in between.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use cafe_calories_core::{DriverLocationId, DriverStatus, UserId};

use super::RepositoryError;
use crate::models::{DriverLocation, DriverState};

/// First key of the advisory lock pair; the second is the driver ID.
const DRIVER_LOCK_NAMESPACE: i32 = 0x4452_5652;

const LATEST_STATES: &str = r"
    SELECT DISTINCT ON (dl.driver_id)
           dl.driver_id, u.name, dl.lat, dl.lng, dl.status, dl.recorded_at AS last_update
    FROM driver_locations dl
    JOIN users u ON u.id = dl.driver_id
    WHERE u.role = 'DRIVER' AND u.is_active
    ORDER BY dl.driver_id, dl.recorded_at DESC, dl.id DESC
";

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: DriverLocationId,
    driver_id: UserId,
    lat: f64,
    lng: f64,
    status: DriverStatus,
    recorded_at: DateTime<Utc>,
}

impl From<LocationRow> for DriverLocation {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            driver_id: row.driver_id,
            lat: row.lat,
            lng: row.lng,
            status: row.status,
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    driver_id: UserId,
    name: String,
    lat: f64,
    lng: f64,
    status: DriverStatus,
    last_update: DateTime<Utc>,
}

impl From<StateRow> for DriverState {
    fn from(row: StateRow) -> Self {
        Self {
            driver_id: row.driver_id,
            name: row.name,
            lat: row.lat,
            lng: row.lng,
            status: row.status,
            last_update: row.last_update,
        }
    }
}

/// A location/status record to append.
#[derive(Debug, Clone, Copy)]
pub struct NewLocation {
    pub driver_id: UserId,
    pub lat: f64,
    pub lng: f64,
    pub status: DriverStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Repository for driver locations.
pub struct DriverRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DriverRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Latest record of one driver.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, driver_id: UserId) -> Result<Option<DriverLocation>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        latest(&mut conn, driver_id).await
    }

    /// Current state of every active driver whose latest record is idle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn idle_drivers(&self) -> Result<Vec<DriverState>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        idle_drivers(&mut conn).await
    }
}

/// Serialize status changes for one driver until the transaction ends.
pub(crate) async fn lock_driver(conn: &mut PgConnection, driver_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(DRIVER_LOCK_NAMESPACE)
        .bind(driver_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Take the driver's lock only if it is free right now.
///
/// Returns `false` when another transaction holds it.
pub(crate) async fn try_lock_driver(conn: &mut PgConnection, driver_id: UserId) -> Result<bool, RepositoryError> {
    let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1, $2)")
        .bind(DRIVER_LOCK_NAMESPACE)
        .bind(driver_id)
        .fetch_one(conn)
        .await?;
    Ok(locked)
}

pub(crate) async fn latest(
    conn: &mut PgConnection,
    driver_id: UserId,
) -> Result<Option<DriverLocation>, RepositoryError> {
    let row = sqlx::query_as::<_, LocationRow>(
        r"
        SELECT id, driver_id, lat, lng, status, recorded_at
        FROM driver_locations
        WHERE driver_id = $1
        ORDER BY recorded_at DESC, id DESC
        LIMIT 1
        ",
    )
    .bind(driver_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

pub(crate) async fn idle_drivers(conn: &mut PgConnection) -> Result<Vec<DriverState>, RepositoryError> {
    let rows = sqlx::query_as::<_, StateRow>(&format!(
        "SELECT * FROM ({LATEST_STATES}) latest WHERE status = 'IDLE' ORDER BY last_update DESC"
    ))
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub(crate) async fn append(
    conn: &mut PgConnection,
    location: NewLocation,
) -> Result<DriverLocation, RepositoryError> {
    let row = sqlx::query_as::<_, LocationRow>(
        r"
        INSERT INTO driver_locations (driver_id, lat, lng, status, recorded_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, driver_id, lat, lng, status, recorded_at
        ",
    )
    .bind(location.driver_id)
    .bind(location.lat)
    .bind(location.lng)
    .bind(location.status)
    .bind(location.recorded_at)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}
