//! Cafes, menus and staff assignments.

use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::geo::Coordinate;
use cafe_calories_core::{CafeId, Email, ItemId, Role, UserId};

use super::ServiceError;
use super::authz::{Guard, require_role};
use crate::db::cafes::NewCafe;
use crate::db::{CafeRepository, ItemRepository, UserRepository};
use crate::models::{Cafe, Item, NewItem, StaffMember, User};

/// Fields of a cafe supplied by its creator.
#[derive(Debug, Clone)]
pub struct CafeInput {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl CafeInput {
    pub(crate) fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("Cafe name cannot be empty".to_string()));
        }
        Coordinate::new(self.lat, self.lng)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn into_new_cafe(self, owner_id: Option<UserId>) -> NewCafe {
        NewCafe {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            lat: self.lat,
            lng: self.lng,
            owner_id,
        }
    }
}

/// Catalog operations.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    guard: Guard<'a>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            guard: Guard::new(pool),
        }
    }

    /// Create a cafe. Owners become its owner; admins create unowned cafes.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for other roles and
    /// `ServiceError::Validation` for a blank name or out-of-range coordinates.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn create_cafe(&self, user: &User, input: CafeInput) -> Result<Cafe, ServiceError> {
        require_role(user, &[Role::Owner, Role::Admin])?;
        input.validate()?;

        let owner_id = (user.role == Role::Owner).then_some(user.id);
        let cafe = CafeRepository::new(self.pool)
            .create(&input.into_new_cafe(owner_id))
            .await?;

        tracing::info!(cafe_id = %cafe.id, "Cafe created");
        Ok(cafe)
    }

    /// Active cafes ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_cafes(&self, query: Option<&str>) -> Result<Vec<Cafe>, ServiceError> {
        Ok(CafeRepository::new(self.pool)
            .list_active(non_blank(query))
            .await?)
    }

    /// Add one menu item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown cafe,
    /// `ServiceError::Forbidden` unless the caller owns it or is admin, and
    /// `ServiceError::Validation` for invalid fields.
    #[instrument(skip(self, user, item), fields(user_id = %user.id))]
    pub async fn add_item(
        &self,
        user: &User,
        cafe_id: CafeId,
        item: &NewItem,
    ) -> Result<Item, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        item.validate().map_err(ServiceError::Validation)?;

        Ok(ItemRepository::new(self.pool).create(cafe_id, item).await?)
    }

    /// Add several items at once; all are created or none are.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::add_item`]; the message of a validation
    /// failure names the offending position.
    #[instrument(skip(self, user, items), fields(user_id = %user.id, count = items.len()))]
    pub async fn import_items(
        &self,
        user: &User,
        cafe_id: CafeId,
        items: &[NewItem],
    ) -> Result<Vec<Item>, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        if items.is_empty() {
            return Err(ServiceError::Validation("No items to import".to_string()));
        }
        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|e| ServiceError::Validation(format!("item {index}: {e}")))?;
        }

        let created = ItemRepository::new(self.pool)
            .create_many(cafe_id, items)
            .await?;
        tracing::info!(count = created.len(), "Menu items imported");
        Ok(created)
    }

    /// Active items of a cafe ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_items(
        &self,
        cafe_id: CafeId,
        query: Option<&str>,
    ) -> Result<Vec<Item>, ServiceError> {
        Ok(ItemRepository::new(self.pool)
            .list_active(cafe_id, non_blank(query))
            .await?)
    }

    /// Take an item off the menu. Past orders keep referring to it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the item is not on that cafe's menu.
    pub async fn deactivate_item(
        &self,
        user: &User,
        cafe_id: CafeId,
        item_id: ItemId,
    ) -> Result<(), ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        ItemRepository::new(self.pool)
            .deactivate(cafe_id, item_id)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::NotFound => ServiceError::not_found("Item"),
                other => other.into(),
            })
    }

    /// Grant an active user staff access to a cafe.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no active user has that email and
    /// `ServiceError::InvalidState` if they are already staff there.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn add_staff(
        &self,
        user: &User,
        cafe_id: CafeId,
        email: &str,
    ) -> Result<StaffMember, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;

        let email = Email::parse(email).map_err(|e| ServiceError::Validation(e.to_string()))?;
        let member = UserRepository::new(self.pool)
            .get_active_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let cafes = CafeRepository::new(self.pool);
        cafes.add_staff(cafe_id, member.id).await?;

        cafes
            .list_staff(cafe_id)
            .await?
            .into_iter()
            .find(|staff| staff.user_id == member.id)
            .ok_or_else(|| ServiceError::not_found("Staff assignment"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user was not staff there.
    pub async fn remove_staff(
        &self,
        user: &User,
        cafe_id: CafeId,
        staff_id: UserId,
    ) -> Result<(), ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        CafeRepository::new(self.pool)
            .remove_staff(cafe_id, staff_id)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::NotFound => ServiceError::not_found("Staff assignment"),
                other => other.into(),
            })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` unless the caller owns the cafe or is admin.
    pub async fn list_staff(&self, user: &User, cafe_id: CafeId) -> Result<Vec<StaffMember>, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        Ok(CafeRepository::new(self.pool).list_staff(cafe_id).await?)
    }
}

fn non_blank(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, lat: f64, lng: f64) -> CafeInput {
        CafeInput {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn cafe_input_validation() {
        assert!(input("Bean There", 35.78, -78.64).validate().is_ok());
        assert!(matches!(
            input(" ", 35.78, -78.64).validate(),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            input("Far North", 91.0, 0.0).validate(),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn blank_queries_are_ignored() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" latte ")), Some("latte"));
        assert_eq!(non_blank(None), None);
    }
}
