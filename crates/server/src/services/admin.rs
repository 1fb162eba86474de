//! Administrator-only operations.

use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::{CafeId, Role, UserId};

use super::ServiceError;
use super::authz::require_role;
use super::catalog::CafeInput;
use crate::db::cafes::CafeRemoval;
use crate::db::{CafeRepository, RepositoryError, UserRepository};
use crate::models::{Cafe, User};

pub struct AdminService<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Deactivate an account. Its tokens stop working immediately.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins or when an admin
    /// tries to block themselves, and `ServiceError::NotFound` for an
    /// unknown user.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn block_user(&self, admin: &User, user_id: UserId) -> Result<(), ServiceError> {
        require_role(admin, &[Role::Admin])?;
        if admin.id == user_id {
            return Err(ServiceError::Forbidden("Admins cannot block themselves".to_string()));
        }

        UserRepository::new(self.pool)
            .set_active(user_id, false)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("User"),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user_id, "User blocked");
        Ok(())
    }

    /// Create a cafe on behalf of an owner (or unowned).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `owner_id` is not an active
    /// owner or the cafe fields are invalid.
    #[instrument(skip(self, admin, input), fields(admin_id = %admin.id))]
    pub async fn create_cafe(
        &self,
        admin: &User,
        input: CafeInput,
        owner_id: Option<UserId>,
    ) -> Result<Cafe, ServiceError> {
        require_role(admin, &[Role::Admin])?;
        input.validate()?;

        if let Some(owner_id) = owner_id {
            UserRepository::new(self.pool)
                .get_by_id(owner_id)
                .await?
                .filter(|user| user.role == Role::Owner && user.is_active)
                .ok_or_else(|| ServiceError::Validation("owner_id must refer to an active owner".to_string()))?;
        }

        let cafe = CafeRepository::new(self.pool)
            .create(&input.into_new_cafe(owner_id))
            .await?;
        tracing::info!(cafe_id = %cafe.id, "Cafe created by admin");
        Ok(cafe)
    }

    /// Remove a cafe. Cafes with order history are deactivated instead.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown cafe.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn delete_cafe(&self, admin: &User, cafe_id: CafeId) -> Result<CafeRemoval, ServiceError> {
        require_role(admin, &[Role::Admin])?;

        let removal = CafeRepository::new(self.pool)
            .remove(cafe_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::not_found("Cafe"),
                other => other.into(),
            })?;

        tracing::info!(cafe_id = %cafe_id, ?removal, "Cafe removed");
        Ok(removal)
    }
}
