//! Driver location records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cafe_calories_core::geo::Coordinate;
use cafe_calories_core::{DriverLocationId, DriverStatus, UserId};

/// One append-only location/status record.
#[derive(Debug, Clone, Serialize)]
pub struct DriverLocation {
    pub id: DriverLocationId,
    pub driver_id: UserId,
    pub lat: f64,
    pub lng: f64,
    pub status: DriverStatus,
    pub recorded_at: DateTime<Utc>,
}

/// A driver's current state: their most recent record.
#[derive(Debug, Clone, Serialize)]
pub struct DriverState {
    pub driver_id: UserId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub status: DriverStatus,
    pub last_update: DateTime<Utc>,
}

impl DriverState {
    #[must_use]
    pub const fn location(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }
}
