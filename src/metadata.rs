//! Parsed image metadata as handed over by the metadata extractor

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::{Coordinate, ImageId};

/// Degrees/minutes/seconds triple as stored in EXIF GPS tags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl Dms {
    pub fn new(degrees: f64, minutes: f64, seconds: f64) -> Self {
        Self { degrees, minutes, seconds }
    }

    /// Builds a triple from EXIF rationals (numerator, denominator)
    pub fn from_rationals(values: [(u32, u32); 3]) -> Result<Self> {
        let mut parts = [0.0; 3];
        for (part, (num, den)) in parts.iter_mut().zip(values) {
            if den == 0 {
                return Err(Error::InvalidCoordinate("zero denominator in GPS rational".to_string()));
            }
            *part = num as f64 / den as f64;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    /// Converts to decimal degrees; "S" and "W" references negate the value
    pub fn to_decimal(&self, reference: &str) -> Result<f64> {
        let magnitude = self.degrees + self.minutes / 60.0 + self.seconds / 3600.0;
        match reference.trim().to_ascii_uppercase().as_str() {
            "N" | "E" => Ok(magnitude),
            "S" | "W" => Ok(-magnitude),
            other => Err(Error::InvalidCoordinate(format!(
                "unknown hemisphere reference '{}'",
                other
            ))),
        }
    }
}

/// Metadata record for one photograph or orthomosaic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub filename: String,
    pub coordinate: Option<Coordinate>,
    pub gps_altitude_m: Option<f64>,
    pub capture_timestamp: Option<String>,
}

impl MetadataRecord {
    /// Creates a record with a known position and altitude
    pub fn new(filename: impl Into<String>, coordinate: Coordinate, gps_altitude_m: f64) -> Self {
        Self {
            filename: filename.into(),
            coordinate: Some(coordinate),
            gps_altitude_m: Some(gps_altitude_m),
            capture_timestamp: None,
        }
    }

    /// Builds a record from EXIF GPS triples and references
    pub fn from_exif_gps(
        filename: impl Into<String>,
        latitude: (Dms, &str),
        longitude: (Dms, &str),
        gps_altitude_m: Option<f64>,
    ) -> Result<Self> {
        let lat = latitude.0.to_decimal(latitude.1)?;
        let lon = longitude.0.to_decimal(longitude.1)?;
        Ok(Self {
            filename: filename.into(),
            coordinate: Some(Coordinate::new(lat, lon)?),
            gps_altitude_m,
            capture_timestamp: None,
        })
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.capture_timestamp = Some(timestamp.into());
        self
    }

    /// Identifier used to key analyses of this record
    pub fn image_id(&self) -> ImageId {
        ImageId::new(self.filename.clone())
    }

    /// Returns position and altitude, or the reason the record cannot be analyzed
    pub fn require_position(&self) -> Result<(Coordinate, f64)> {
        let coordinate = self
            .coordinate
            .ok_or_else(|| Error::MissingCoordinates(self.filename.clone()))?;
        let altitude = self
            .gps_altitude_m
            .filter(|alt| alt.is_finite())
            .ok_or_else(|| Error::MissingAltitude(self.filename.clone()))?;
        Ok((coordinate, altitude))
    }
}
