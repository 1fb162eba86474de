//! Authorization guard.
//!
//! Every mutating operation on cafes, menus, orders, dispatch and analytics
//! goes through [`Guard`] before touching data. The decisions themselves are
//! pure functions so they can be tested without a database.

use sqlx::PgPool;

use cafe_calories_core::{CafeId, Role, UserId};

use super::ServiceError;
use crate::db::CafeRepository;
use crate::models::{Cafe, User};

/// How a caller is related to a cafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CafeAccess {
    Admin,
    Owner,
    Staff,
}

/// Relationship of `user` to `cafe`, if any.
#[must_use]
pub fn cafe_access(user: &User, cafe: &Cafe, has_staff_assignment: bool) -> Option<CafeAccess> {
    if user.role == Role::Admin {
        Some(CafeAccess::Admin)
    } else if cafe.owner_id == Some(user.id) {
        Some(CafeAccess::Owner)
    } else if has_staff_assignment {
        Some(CafeAccess::Staff)
    } else {
        None
    }
}

/// # Errors
///
/// Returns `ServiceError::Forbidden` unless the caller's role is in `allowed`.
pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), ServiceError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Insufficient role".to_string()))
    }
}

/// Drivers act on their own records; admins on anyone's.
///
/// # Errors
///
/// Returns `ServiceError::Forbidden` otherwise.
pub fn require_self_or_admin(user: &User, target: UserId) -> Result<(), ServiceError> {
    if user.role == Role::Admin || user.id == target {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Not allowed to act for this driver".to_string()))
    }
}

/// Cafe-scoped checks that need the database.
pub struct Guard<'a> {
    cafes: CafeRepository<'a>,
}

impl<'a> Guard<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cafes: CafeRepository::new(pool),
        }
    }

    async fn load_cafe(&self, cafe_id: CafeId) -> Result<Cafe, ServiceError> {
        self.cafes
            .get(cafe_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cafe"))
    }

    /// Admin, owner, or assigned staff of the cafe.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the cafe does not exist and
    /// `ServiceError::Forbidden` if the caller has no access.
    pub async fn require_cafe_access(
        &self,
        cafe_id: CafeId,
        user: &User,
    ) -> Result<(Cafe, CafeAccess), ServiceError> {
        let cafe = self.load_cafe(cafe_id).await?;

        // Staff lookup only when the cheaper checks fail
        let staff = user.role != Role::Admin
            && cafe.owner_id != Some(user.id)
            && self.cafes.is_staff(cafe_id, user.id).await?;

        match cafe_access(user, &cafe, staff) {
            Some(access) => Ok((cafe, access)),
            None => Err(ServiceError::Forbidden(
                "Not authorized for this cafe".to_string(),
            )),
        }
    }

    /// Admin or owner of the cafe. Staff may run a cafe but not change its
    /// menu or staff.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the cafe does not exist and
    /// `ServiceError::Forbidden` otherwise.
    pub async fn require_cafe_owner(&self, cafe_id: CafeId, user: &User) -> Result<Cafe, ServiceError> {
        let cafe = self.load_cafe(cafe_id).await?;
        match cafe_access(user, &cafe, false) {
            Some(CafeAccess::Admin | CafeAccess::Owner) => Ok(cafe),
            _ => Err(ServiceError::Forbidden(
                "Only the cafe owner or an admin can do this".to_string(),
            )),
        }
    }
}
