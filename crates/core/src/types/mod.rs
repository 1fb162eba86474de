//! Core types for Cafe Calories.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pickup;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pickup::{PickupCode, PickupCodeError};
pub use role::{Role, RoleParseError};
pub use status::*;
