//! Cafe and staff types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cafe_calories_core::geo::Coordinate;
use cafe_calories_core::{CafeId, Email, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Cafe {
    pub id: CafeId,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub active: bool,
    pub owner_id: Option<UserId>,
}

impl Cafe {
    #[must_use]
    pub const fn location(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// A user holding a staff assignment at a cafe.
#[derive(Debug, Clone, Serialize)]
pub struct StaffMember {
    pub user_id: UserId,
    pub email: Email,
    pub name: String,
    pub assigned_at: DateTime<Utc>,
}
