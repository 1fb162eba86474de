//! User domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use cafe_calories_core::{Email, Role, UserId};

/// A platform account.
///
/// The password hash never leaves the repository layer, so this type is safe
/// to return from the API as-is.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<String>,
    pub dob: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<String>,
    pub dob: Option<NaiveDate>,
}
