//! Domain error taxonomy shared by the business services.

use thiserror::Error;

use cafe_calories_core::OrderStatus;
use cafe_calories_core::order::OrderRuleError;

use crate::ai::AiError;
use crate::db::RepositoryError;

/// Errors returned by catalog, cart, order, dispatch, payment, goal and
/// review operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller lacks the role, ownership or staff assignment required.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Input is well-formed but violates a field constraint.
    #[error("{0}")]
    Validation(String),

    /// The operation conflicts with current state (already assigned, already
    /// paid, driver busy, ...).
    #[error("{0}")]
    InvalidState(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Assignee email is not an active user")]
    InvalidAssignee,

    #[error("No available drivers nearby")]
    NoDriversAvailable,

    #[error(transparent)]
    Rule(#[from] OrderRuleError),

    /// A required external service is not configured.
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::InvalidState(message),
            other => Self::Repository(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

impl ServiceError {
    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}
