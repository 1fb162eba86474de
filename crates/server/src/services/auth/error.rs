//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] cafe_calories_core::EmailError),

    /// Role string outside the known role table.
    #[error("{0}")]
    InvalidRole(#[from] cafe_calories_core::RoleParseError),

    /// Public registration tried to create an administrator.
    #[error("admin accounts cannot be self-registered")]
    AdminRegistration,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Other profile field out of range.
    #[error("{0}")]
    InvalidProfile(String),

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Wrong email, wrong password, inactive account or role mismatch.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bearer token missing, malformed, expired, or for an unknown/inactive user.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token encoding error: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
