use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gsd::{preset, GsdReference, RasterMetadata, RasterResolution};
use crate::metadata::MetadataRecord;
use crate::report::ResultView;
use crate::session::Recalculation;
use crate::types::Coordinate;

/// Body of `POST /api/sessions/:id/images`
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_altitude_m: Option<f64>,
    #[serde(default)]
    pub capture_timestamp: Option<String>,
}

impl AnalyzeRequest {
    pub fn into_record(self) -> Result<MetadataRecord> {
        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)?),
            _ => None,
        };
        Ok(MetadataRecord {
            filename: self.filename,
            coordinate,
            gps_altitude_m: self.gps_altitude_m,
            capture_timestamp: self.capture_timestamp,
        })
    }
}

/// Body of `POST /api/sessions/:id/recalculate`.
///
/// The reference is either a preset label or a custom height/GSD pair; the
/// map resolution comes from raster metadata or a direct GSD value.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecalculateRequest {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub reference_height_m: Option<f64>,
    #[serde(default)]
    pub reference_gsd_cm_per_px: Option<f64>,
    #[serde(default)]
    pub raster: Option<RasterMetadata>,
    #[serde(default)]
    pub map_gsd_cm_per_px: Option<f64>,
}

impl RecalculateRequest {
    pub fn reference(&self) -> Result<GsdReference> {
        if let Some(label) = &self.preset {
            return preset(label)
                .map(|p| p.reference())
                .ok_or_else(|| Error::UnknownPreset(label.clone()));
        }
        match (self.reference_height_m, self.reference_gsd_cm_per_px) {
            (Some(height), Some(gsd)) => GsdReference::custom("Custom", height, gsd),
            _ => Err(Error::InvalidInput(
                "either preset or reference_height_m and reference_gsd_cm_per_px are required".to_string(),
            )),
        }
    }

    pub fn into_recalculation(self) -> Result<Recalculation> {
        let reference = self.reference()?;
        match (self.raster, self.map_gsd_cm_per_px) {
            (Some(raster), _) => Ok(Recalculation::Raster { raster, reference }),
            (None, Some(gsd)) => Ok(Recalculation::Resolution {
                resolution: RasterResolution::new(gsd)?,
                reference,
            }),
            (None, None) => Err(Error::InvalidRasterInput(
                "raster metadata or map_gsd_cm_per_px is required".to_string(),
            )),
        }
    }
}

/// A manual height as typed (text) or as a number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManualHeight {
    Number(f64),
    Text(String),
}

/// Body of `POST /api/sessions/:id/override`
#[derive(Debug, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub manual_height: ManualHeight,
}

/// Body of `GET /api/sessions/:id`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub image_id: Option<String>,
    pub state: Option<String>,
    pub result: Option<ResultView>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
