//! Geographic primitives shared by dispatch, tracking and persistence.
//!
//! Coordinates are stored as fixed-precision decimal degrees (8 fractional
//! digits, matching the NUMERIC(10,8)/NUMERIC(11,8) columns) and converted to
//! `f64` only for distance math.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::error::{AppError, Result};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fractional digits kept for stored degrees
const DEGREE_SCALE: u32 = 8;

/// Immutable (latitude, longitude) pair, valid by construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct Coordinate {
    #[schema(value_type = String, example = "12.97160000")]
    latitude: Decimal,
    #[schema(value_type = String, example = "77.59460000")]
    longitude: Decimal,
}

impl Coordinate {
    /// Builds a coordinate, rejecting |lat| > 90 or |lon| > 180
    pub fn new(latitude: Decimal, longitude: Decimal) -> Result<Self> {
        if latitude.abs() > Decimal::from(90) {
            return Err(AppError::Validation(format!(
                "Latitude {} is out of range [-90, 90]",
                latitude
            )));
        }
        if longitude.abs() > Decimal::from(180) {
            return Err(AppError::Validation(format!(
                "Longitude {} is out of range [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude: latitude.round_dp(DEGREE_SCALE),
            longitude: longitude.round_dp(DEGREE_SCALE),
        })
    }

    /// Builds a coordinate from an optional column pair; both halves must be present
    pub fn from_parts(latitude: Option<Decimal>, longitude: Option<Decimal>) -> Result<Option<Self>> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(AppError::Validation(
                "Latitude and longitude must be provided together".to_string(),
            )),
        }
    }

    pub fn latitude(&self) -> Decimal {
        self.latitude
    }

    pub fn longitude(&self) -> Decimal {
        self.longitude
    }

    fn radians(&self) -> (f64, f64) {
        (
            self.latitude.to_f64().unwrap_or_default().to_radians(),
            self.longitude.to_f64().unwrap_or_default().to_radians(),
        )
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Great-circle distance in kilometers (haversine).
///
/// Symmetric and exactly zero for identical points.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = a.radians();
    let (lat2, lon2) = b.radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = lon2 - lon1;

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn coord(lat: &str, lon: &str) -> Coordinate {
        Coordinate::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let a = coord("12.9716", "77.5946");
        assert_eq!(distance(a, a), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (coord("12.9716", "77.5946"), coord("13.05", "77.60")),
            (coord("-6.2088", "106.8456"), coord("-6.9175", "107.6191")),
            (coord("89.9", "-179.9"), coord("-89.9", "179.9")),
            (coord("0", "0"), coord("0", "180")),
        ];

        for (a, b) in pairs {
            assert_eq!(distance(a, b), distance(b, a));
        }
    }

    #[test]
    fn test_distance_known_values() {
        // Bengaluru centre to ~9 km north
        let d = distance(coord("12.9716", "77.5946"), coord("13.05", "77.60"));
        assert!(d > 8.0 && d < 9.5, "got {}", d);

        // Half the equator
        let d = distance(coord("0", "0"), coord("0", "180"));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(Decimal::from(90), Decimal::from(180)).is_ok());
        assert!(Coordinate::new(Decimal::from(-90), Decimal::from(-180)).is_ok());
        assert!(matches!(
            Coordinate::new(Decimal::from_str("90.0001").unwrap(), Decimal::ZERO),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Coordinate::new(Decimal::ZERO, Decimal::from_str("-180.5").unwrap()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_coordinate_rounds_to_storage_scale() {
        let c = coord("12.123456789", "77.5");
        assert_eq!(c.latitude(), Decimal::from_str("12.12345679").unwrap());
    }

    #[test]
    fn test_from_parts_requires_both_halves() {
        assert_eq!(Coordinate::from_parts(None, None).unwrap(), None);
        assert!(Coordinate::from_parts(Some(Decimal::ONE), None).is_err());
        assert!(Coordinate::from_parts(Some(Decimal::ONE), Some(Decimal::ONE))
            .unwrap()
            .is_some());
    }
}
