//! Great-circle distance for driver dispatch.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Error for a coordinate outside the valid latitude/longitude ranges.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("coordinate ({lat}, {lng}) is out of range")]
pub struct CoordinateError {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// # Errors
    ///
    /// Returns [`CoordinateError`] unless latitude is within [-90, 90] and
    /// longitude within [-180, 180].
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            Ok(Self { lat, lng })
        } else {
            Err(CoordinateError { lat, lng })
        }
    }

    /// Haversine distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// The candidate closest to `origin`, with its distance.
///
/// Ties keep the earliest candidate.
pub fn nearest<T, I>(origin: Coordinate, candidates: I) -> Option<(T, f64)>
where
    I: IntoIterator<Item = (T, Coordinate)>,
{
    candidates
        .into_iter()
        .map(|(value, at)| (value, origin.distance_km(at)))
        .fold(None, |best, (value, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((value, distance)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let raleigh = at(35.7796, -78.6382);
        assert!(raleigh.distance_km(raleigh).abs() < 1e-9);
    }

    #[test]
    fn known_city_distance() {
        // Raleigh to Durham is roughly 36 km.
        let distance = at(35.7796, -78.6382).distance_km(at(35.9940, -78.8986));
        assert!((30.0..40.0).contains(&distance), "{distance}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let distance = at(0.0, 0.0).distance_km(at(1.0, 0.0));
        assert!((distance - 111.19).abs() < 0.1, "{distance}");
    }

    #[test]
    fn picks_the_closest_candidate() {
        let origin = at(0.0, 0.0);
        let found = nearest(origin, [("far", at(1.0, 1.0)), ("near", at(0.1, 0.1)), ("mid", at(0.5, 0.5))]);
        assert_eq!(found.map(|(name, _)| name), Some("near"));
    }

    #[test]
    fn no_candidates_means_none() {
        let found = nearest::<u8, _>(at(0.0, 0.0), []);
        assert!(found.is_none());
    }

    #[test]
    fn validates_ranges() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
    }
}
