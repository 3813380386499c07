//! Ground sample distance (GSD) ratio height estimation
//!
//! GSD scales linearly with altitude for a fixed sensor and lens, so a known
//! (height, GSD) pair converts any measured GSD into an equivalent height:
//!
//! ```text
//! height_m = map_gsd_cm_per_px / reference_gsd_cm_per_px * reference_height_m
//! ```
//!
//! # Examples
//!
//! ```
//! use flightheight::gsd::{compute_height, preset};
//!
//! let phantom = preset("DJI Phantom 4 Pro").unwrap();
//! let height = compute_height(2.72, &phantom.reference())?;
//! assert!((height - 100.0).abs() < 1e-9);
//! # Ok::<(), flightheight::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::projection::{self, CrsPoint};

/// A (height, GSD) pair for a camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GsdReference {
    pub label: String,
    pub reference_height_m: f64,
    pub reference_gsd_cm_per_px: f64,
}

impl GsdReference {
    /// Creates a user-entered reference; both values must be positive
    pub fn custom(label: impl Into<String>, reference_height_m: f64, reference_gsd_cm_per_px: f64) -> Result<Self> {
        if !reference_height_m.is_finite() || reference_height_m <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "reference height must be positive, got {}",
                reference_height_m
            )));
        }
        if !reference_gsd_cm_per_px.is_finite() || reference_gsd_cm_per_px <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "reference GSD must be positive, got {}",
                reference_gsd_cm_per_px
            )));
        }
        Ok(Self {
            label: label.into(),
            reference_height_m,
            reference_gsd_cm_per_px,
        })
    }
}

/// Built-in camera reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GsdPreset {
    pub label: &'static str,
    pub reference_height_m: f64,
    pub reference_gsd_cm_per_px: f64,
}

impl GsdPreset {
    pub fn reference(&self) -> GsdReference {
        GsdReference {
            label: self.label.to_string(),
            reference_height_m: self.reference_height_m,
            reference_gsd_cm_per_px: self.reference_gsd_cm_per_px,
        }
    }
}

/// Drone camera presets
pub static PRESETS: &[GsdPreset] = &[
    GsdPreset { label: "DJI Phantom 4 Pro", reference_height_m: 50.0, reference_gsd_cm_per_px: 1.36 },
    GsdPreset { label: "DJI Phantom 4 RTK", reference_height_m: 100.0, reference_gsd_cm_per_px: 2.74 },
    GsdPreset { label: "DJI Mavic 2 Pro", reference_height_m: 100.0, reference_gsd_cm_per_px: 2.35 },
    GsdPreset { label: "DJI Mavic 3 Enterprise", reference_height_m: 100.0, reference_gsd_cm_per_px: 2.67 },
    GsdPreset { label: "DJI Mini 3 Pro", reference_height_m: 100.0, reference_gsd_cm_per_px: 3.5 },
    GsdPreset { label: "DJI Zenmuse P1 35mm", reference_height_m: 100.0, reference_gsd_cm_per_px: 1.26 },
];

/// Looks up a preset by label (case-insensitive)
pub fn preset(label: &str) -> Option<&'static GsdPreset> {
    PRESETS.iter().find(|p| p.label.eq_ignore_ascii_case(label.trim()))
}

/// Converts a map GSD into a flight height using `reference`
pub fn compute_height(map_gsd_cm_per_px: f64, reference: &GsdReference) -> Result<f64> {
    if !map_gsd_cm_per_px.is_finite() || map_gsd_cm_per_px <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "map GSD must be positive, got {}",
            map_gsd_cm_per_px
        )));
    }
    if !reference.reference_gsd_cm_per_px.is_finite() || reference.reference_gsd_cm_per_px <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "reference GSD must be positive, got {}",
            reference.reference_gsd_cm_per_px
        )));
    }
    if !reference.reference_height_m.is_finite() || reference.reference_height_m <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "reference height must be positive, got {}",
            reference.reference_height_m
        )));
    }

    Ok(map_gsd_cm_per_px / reference.reference_gsd_cm_per_px * reference.reference_height_m)
}

/// Raster metadata supplied by the raster reader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Pixel width in CRS units
    pub pixel_size_x: f64,
    /// Pixel height in CRS units (sign ignored)
    pub pixel_size_y: f64,
    /// Metres per CRS unit, when the reader knows it
    #[serde(default)]
    pub coordinate_reference_system_scale: Option<f64>,
    /// EPSG code of the raster CRS
    #[serde(default)]
    pub epsg: Option<u16>,
    /// Raster origin in CRS units, used for geographic rasters
    #[serde(default)]
    pub origin: Option<(f64, f64)>,
}

impl RasterMetadata {
    /// Metadata for a raster whose CRS units are metres
    pub fn metric(pixel_size_x: f64, pixel_size_y: f64) -> Self {
        Self {
            pixel_size_x,
            pixel_size_y,
            coordinate_reference_system_scale: None,
            epsg: None,
            origin: None,
        }
    }
}

/// Measured map resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterResolution {
    pub map_gsd_cm_per_px: f64,
}

impl RasterResolution {
    pub fn new(map_gsd_cm_per_px: f64) -> Result<Self> {
        if !map_gsd_cm_per_px.is_finite() || map_gsd_cm_per_px <= 0.0 {
            return Err(Error::InvalidRasterInput(format!(
                "map GSD must be positive, got {}",
                map_gsd_cm_per_px
            )));
        }
        Ok(Self { map_gsd_cm_per_px })
    }

    /// Derives the map GSD from raster metadata.
    ///
    /// The scale is taken from `coordinate_reference_system_scale` when
    /// present. Geographic rasters without an explicit scale are measured at
    /// their origin with PROJ. Otherwise CRS units are assumed to be metres.
    pub fn from_metadata(metadata: &RasterMetadata) -> Result<Self> {
        let (px, py) = (metadata.pixel_size_x.abs(), metadata.pixel_size_y.abs());
        if !px.is_finite() || !py.is_finite() || px == 0.0 || py == 0.0 {
            return Err(Error::InvalidRasterInput(format!(
                "pixel size must be non-zero, got {} x {}",
                metadata.pixel_size_x, metadata.pixel_size_y
            )));
        }

        let ground_m = match (metadata.coordinate_reference_system_scale, metadata.epsg) {
            (Some(scale), _) => {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(Error::InvalidRasterInput(format!("CRS scale must be positive, got {}", scale)));
                }
                (px + py) / 2.0 * scale
            }
            (None, Some(code)) if projection::is_geographic(code) => {
                let (ox, oy) = metadata.origin.ok_or_else(|| {
                    Error::InvalidRasterInput("geographic raster without origin".to_string())
                })?;
                let (gx, gy) = projection::pixel_ground_size(code, CrsPoint::new(ox, oy), px, py)
                    .map_err(|e| Error::InvalidRasterInput(e.to_string()))?;
                (gx + gy) / 2.0
            }
            _ => (px + py) / 2.0,
        };

        Self::new(ground_m * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phantom() -> GsdReference {
        preset("DJI Phantom 4 Pro").unwrap().reference()
    }

    #[test]
    fn test_identity_when_resolutions_match() {
        let height = compute_height(1.36, &phantom()).unwrap();
        assert!((height - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_scaling() {
        let reference = phantom();
        let single = compute_height(1.7, &reference).unwrap();
        let double = compute_height(3.4, &reference).unwrap();
        assert!((double - 2.0 * single).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_map_gsd() {
        assert!(matches!(compute_height(0.0, &phantom()), Err(Error::InvalidInput(_))));
        assert!(matches!(compute_height(-1.2, &phantom()), Err(Error::InvalidInput(_))));
        assert!(compute_height(f64::NAN, &phantom()).is_err());
    }

    #[test]
    fn test_rejects_bad_reference() {
        let bad = GsdReference {
            label: "broken".to_string(),
            reference_height_m: 50.0,
            reference_gsd_cm_per_px: 0.0,
        };
        assert!(matches!(compute_height(1.0, &bad), Err(Error::InvalidInput(_))));
        assert!(GsdReference::custom("x", 0.0, 1.0).is_err());
        assert!(GsdReference::custom("x", 80.0, -2.0).is_err());
    }

    #[test]
    fn test_custom_reference() {
        let reference = GsdReference::custom("My camera", 80.0, 2.0).unwrap();
        assert_eq!(compute_height(3.0, &reference).unwrap(), 120.0);
    }

    #[test]
    fn test_preset_lookup() {
        assert!(preset("dji phantom 4 pro").is_some());
        assert!(preset("Unknown drone").is_none());
        assert!(PRESETS.iter().all(|p| p.reference_height_m > 0.0 && p.reference_gsd_cm_per_px > 0.0));
    }

    #[test]
    fn test_resolution_from_metric_raster() {
        let res = RasterResolution::from_metadata(&RasterMetadata::metric(0.02, -0.02)).unwrap();
        assert!((res.map_gsd_cm_per_px - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_resolution_with_crs_scale() {
        // US survey feet
        let metadata = RasterMetadata {
            coordinate_reference_system_scale: Some(0.3048006096),
            ..RasterMetadata::metric(0.1, 0.1)
        };
        let res = RasterResolution::from_metadata(&metadata).unwrap();
        assert!((res.map_gsd_cm_per_px - 3.048006096).abs() < 1e-9);
    }

    #[test]
    fn test_resolution_rejects_zero_pixel() {
        let result = RasterResolution::from_metadata(&RasterMetadata::metric(0.0, 0.02));
        assert!(matches!(result, Err(Error::InvalidRasterInput(_))));

        let metadata = RasterMetadata {
            coordinate_reference_system_scale: Some(-1.0),
            ..RasterMetadata::metric(0.02, 0.02)
        };
        assert!(RasterResolution::from_metadata(&metadata).is_err());
        assert!(RasterResolution::new(0.0).is_err());
    }

    #[test]
    fn test_geographic_raster_requires_origin() {
        let metadata = RasterMetadata {
            epsg: Some(4326),
            ..RasterMetadata::metric(1e-6, 1e-6)
        };
        assert!(matches!(
            RasterResolution::from_metadata(&metadata),
            Err(Error::InvalidRasterInput(_))
        ));
    }
}
