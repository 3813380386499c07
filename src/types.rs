//! Core data types for flightheight

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in degrees, [-90, 90]
    latitude: f64,
    /// Longitude in degrees, [-180, 180]
    longitude: f64,
}

impl Coordinate {
    /// Creates a validated coordinate
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }

    /// For compile-time constants known to be in range
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns the latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = Error;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Identifies the image an analysis belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinate() {
        let coord = Coordinate::new(47.3769, 8.5417).unwrap();
        assert_eq!(coord.latitude(), 47.3769);
        assert_eq!(coord.longitude(), 8.5417);
    }

    #[test]
    fn test_coordinate_bounds_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_coordinate_out_of_range() {
        assert!(matches!(Coordinate::new(90.1, 0.0), Err(Error::InvalidCoordinate(_))));
        assert!(matches!(Coordinate::new(0.0, -180.5), Err(Error::InvalidCoordinate(_))));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_display() {
        let coord = Coordinate::new(1.5, -2.25).unwrap();
        assert_eq!(coord.to_string(), "1.500000, -2.250000");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude": 10.0, "longitude": 20.0}"#).unwrap();
        assert_eq!(ok.longitude(), 20.0);
        assert!(serde_json::from_str::<Coordinate>(r#"{"latitude": 100.0, "longitude": 0.0}"#).is_err());
    }

    #[test]
    fn test_image_id_serializes_as_string() {
        let id = ImageId::new("DJI_0042.JPG");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"DJI_0042.JPG\"");
    }
}
