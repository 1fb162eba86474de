//! Menu ingestion through the AI service.
//!
//! Parsing only returns candidate items; importing them is
//! [`CatalogService::import_items`](super::catalog::CatalogService::import_items).

use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::CafeId;

use super::ServiceError;
use super::authz::Guard;
use crate::ai::{AiClient, MenuItem};
use crate::models::User;

/// Largest accepted menu document.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

pub struct MenuService<'a> {
    guard: Guard<'a>,
    ai: Option<&'a AiClient>,
}

impl<'a> MenuService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, ai: Option<&'a AiClient>) -> Self {
        Self {
            guard: Guard::new(pool),
            ai,
        }
    }

    fn client(&self) -> Result<&'a AiClient, ServiceError> {
        self.ai
            .ok_or_else(|| ServiceError::Unavailable("Menu parsing is not configured".to_string()))
    }

    /// Extract items from an uploaded PDF menu.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Forbidden`/`NotFound` from the cafe owner check.
    /// - `ServiceError::Validation` for an empty or oversized document.
    /// - `ServiceError::Unavailable` when the AI service is not configured.
    /// - `ServiceError::Ai` if parsing fails.
    #[instrument(skip(self, user, document), fields(user_id = %user.id, bytes = document.len()))]
    pub async fn parse_document(
        &self,
        user: &User,
        cafe_id: CafeId,
        document: &[u8],
    ) -> Result<Vec<MenuItem>, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        check_document(document)?;
        Ok(self.client()?.parse_menu_document(document).await?)
    }

    /// Extract items from menu text.
    ///
    /// # Errors
    ///
    /// Same as [`MenuService::parse_document`]; blank text is a validation error.
    #[instrument(skip(self, user, text), fields(user_id = %user.id))]
    pub async fn parse_text(
        &self,
        user: &User,
        cafe_id: CafeId,
        text: &str,
    ) -> Result<Vec<MenuItem>, ServiceError> {
        self.guard.require_cafe_owner(cafe_id, user).await?;
        if text.trim().is_empty() {
            return Err(ServiceError::Validation("Menu text cannot be empty".to_string()));
        }
        Ok(self.client()?.parse_menu_text(text).await?)
    }
}

fn check_document(document: &[u8]) -> Result<(), ServiceError> {
    if document.is_empty() {
        return Err(ServiceError::Validation("Empty file provided".to_string()));
    }
    if document.len() > MAX_DOCUMENT_BYTES {
        return Err(ServiceError::Validation(
            "File size too large. Maximum size is 10MB".to_string(),
        ));
    }
    Ok(())
}
