//! Cafe and staff assignment repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cafe_calories_core::{CafeId, Email, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::{Cafe, StaffMember};

const CAFE_COLUMNS: &str = "id, name, address, lat, lng, active, owner_id";

#[derive(Debug, sqlx::FromRow)]
struct CafeRow {
    id: CafeId,
    name: String,
    address: String,
    lat: f64,
    lng: f64,
    active: bool,
    owner_id: Option<UserId>,
}

impl From<CafeRow> for Cafe {
    fn from(row: CafeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            lat: row.lat,
            lng: row.lng,
            active: row.active,
            owner_id: row.owner_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    user_id: UserId,
    email: Email,
    name: String,
    assigned_at: DateTime<Utc>,
}

/// Input for a new cafe.
#[derive(Debug, Clone)]
pub struct NewCafe {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub owner_id: Option<UserId>,
}

/// What happened when an admin removed a cafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CafeRemoval {
    /// No orders referenced it, so it was deleted with its menu and reviews.
    Deleted,
    /// Orders reference it, so it was deactivated instead.
    Deactivated,
}

/// Repository for cafes and staff assignments.
pub struct CafeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CafeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a cafe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, cafe: &NewCafe) -> Result<Cafe, RepositoryError> {
        let row = sqlx::query_as::<_, CafeRow>(&format!(
            r"
            INSERT INTO cafes (name, address, lat, lng, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CAFE_COLUMNS}
            "
        ))
        .bind(&cafe.name)
        .bind(&cafe.address)
        .bind(cafe.lat)
        .bind(cafe.lng)
        .bind(cafe.owner_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a cafe by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CafeId) -> Result<Option<Cafe>, RepositoryError> {
        let row = sqlx::query_as::<_, CafeRow>(&format!(
            "SELECT {CAFE_COLUMNS} FROM cafes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Active cafes, optionally filtered by a case-insensitive name substring.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, query: Option<&str>) -> Result<Vec<Cafe>, RepositoryError> {
        let rows = sqlx::query_as::<_, CafeRow>(&format!(
            r"
            SELECT {CAFE_COLUMNS} FROM cafes
            WHERE active AND ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY name, id
            "
        ))
        .bind(query.map(like_pattern))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a cafe, or deactivate it when orders still reference it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cafe does not exist.
    pub async fn remove(&self, id: CafeId) -> Result<CafeRemoval, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_orders: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE cafe_id = c.id) FROM cafes c WHERE c.id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let removal = match has_orders {
            None => return Err(RepositoryError::NotFound),
            Some(true) => {
                sqlx::query("UPDATE cafes SET active = FALSE WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE items SET active = FALSE WHERE cafe_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                CafeRemoval::Deactivated
            }
            Some(false) => {
                sqlx::query("DELETE FROM cafes WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                CafeRemoval::Deleted
            }
        };

        tx.commit().await?;
        Ok(removal)
    }

    /// Whether `user_id` holds a staff assignment at `cafe_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_staff(&self, cafe_id: CafeId, user_id: UserId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM staff_assignments WHERE cafe_id = $1 AND user_id = $2)",
        )
        .bind(cafe_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Grant staff access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the assignment already exists.
    pub async fn add_staff(&self, cafe_id: CafeId, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO staff_assignments (cafe_id, user_id) VALUES ($1, $2)")
            .bind(cafe_id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::unique_violation(e, "User is already staff at this cafe"))?;
        Ok(())
    }

    /// Revoke staff access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there was no such assignment.
    pub async fn remove_staff(&self, cafe_id: CafeId, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM staff_assignments WHERE cafe_id = $1 AND user_id = $2")
            .bind(cafe_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Staff of a cafe, oldest assignment first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_staff(&self, cafe_id: CafeId) -> Result<Vec<StaffMember>, RepositoryError> {
        let rows = sqlx::query_as::<_, StaffRow>(
            r"
            SELECT u.id AS user_id, u.email, u.name, s.created_at AS assigned_at
            FROM staff_assignments s
            JOIN users u ON u.id = s.user_id
            WHERE s.cafe_id = $1
            ORDER BY s.created_at, s.id
            ",
        )
        .bind(cafe_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StaffMember {
                user_id: r.user_id,
                email: r.email,
                name: r.name,
                assigned_at: r.assigned_at,
            })
            .collect())
    }
}
