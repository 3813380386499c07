//! Flight height analyzer

use std::sync::Arc;

use crate::config::Config;
use crate::elevation::{build_sources, ElevationSource, TerrainAggregator, TerrainEstimate};
use crate::error::{Error, Result};
use crate::gsd::{compute_height, GsdReference, RasterMetadata, RasterResolution};
use crate::metadata::MetadataRecord;
use crate::types::ImageId;
use super::policy::HeightPolicy;
use super::result::{FlightHeightResult, HeightMethod, WarningKind};

/// Computes flight heights and drives their recalculation.
///
/// Each operation returns a new [`FlightHeightResult`]; rejected input leaves
/// the caller's current result untouched.
#[derive(Clone)]
pub struct FlightHeightAnalyzer {
    aggregator: TerrainAggregator,
    policy: HeightPolicy,
}

impl FlightHeightAnalyzer {
    pub fn new(aggregator: TerrainAggregator, policy: HeightPolicy) -> Self {
        Self { aggregator, policy }
    }

    /// Builds the provider set and policy from a configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let sources: Vec<Arc<dyn ElevationSource>> = build_sources(config)?;
        Ok(Self::new(TerrainAggregator::new(sources), HeightPolicy::from_config(config)))
    }

    pub fn aggregator(&self) -> &TerrainAggregator {
        &self.aggregator
    }

    pub fn policy(&self) -> &HeightPolicy {
        &self.policy
    }

    /// Analyzes one image.
    ///
    /// Missing GPS data is an error. Failing elevation lookups are not: the
    /// result is returned in the `Failed` state so the caller can show which
    /// sources failed.
    pub async fn analyze(&self, record: &MetadataRecord) -> Result<FlightHeightResult> {
        let (coordinate, gps_altitude_m) = record.require_position()?;
        tracing::info!(image = %record.filename, %coordinate, gps_altitude_m, "analyzing image");

        let terrain = self.aggregator.estimate(coordinate).await;
        Ok(self.evaluate(record.image_id(), gps_altitude_m, terrain))
    }

    /// Turns a terrain estimate into a result
    pub fn evaluate(&self, image_id: ImageId, gps_altitude_m: f64, terrain: TerrainEstimate) -> FlightHeightResult {
        let Some(terrain_m) = terrain.elevation_meters else {
            tracing::warn!(image = %image_id, "terrain elevation unavailable");
            return FlightHeightResult::failed(image_id, gps_altitude_m, terrain);
        };

        let height = gps_altitude_m - terrain_m;
        let warnings = self.policy.evaluate(height);
        if warnings.contains(&WarningKind::NegativeHeight) {
            tracing::warn!(image = %image_id, height, "negative flight height");
        }
        FlightHeightResult::computed(image_id, gps_altitude_m, terrain, height, warnings)
    }

    /// Replaces the height with a GSD ratio estimate from a known resolution
    pub fn recalculate_with_resolution(
        &self,
        current: &FlightHeightResult,
        resolution: RasterResolution,
        reference: &GsdReference,
    ) -> Result<FlightHeightResult> {
        Self::check_recalculable(current)?;
        let height = compute_height(resolution.map_gsd_cm_per_px, reference)?;

        let mut warnings = self.policy.evaluate(height);
        warnings.remove(&WarningKind::NegativeHeight);
        tracing::info!(
            image = %current.image_id(),
            reference = %reference.label,
            map_gsd = resolution.map_gsd_cm_per_px,
            height,
            "recalculated from GSD ratio"
        );

        let method = HeightMethod::GsdRatio {
            reference: reference.clone(),
            map_gsd_cm_per_px: resolution.map_gsd_cm_per_px,
        };
        Ok(current.recalculated(height, method, warnings))
    }

    /// Derives the map resolution from raster metadata, then recalculates
    pub fn recalculate_from_raster(
        &self,
        current: &FlightHeightResult,
        raster: &RasterMetadata,
        reference: &GsdReference,
    ) -> Result<FlightHeightResult> {
        Self::check_recalculable(current)?;
        let resolution = RasterResolution::from_metadata(raster)?;
        self.recalculate_with_resolution(current, resolution, reference)
    }

    /// Applies a user-entered height.
    ///
    /// The computed height is kept for audit; only the effective height
    /// changes.
    pub fn override_height(&self, current: &FlightHeightResult, manual_height_m: f64) -> Result<FlightHeightResult> {
        Self::check_recalculable(current)?;
        let manual = self.policy.validate_manual(manual_height_m)?;

        let mut warnings = self.policy.evaluate(manual);
        warnings.remove(&WarningKind::NegativeHeight);
        tracing::info!(image = %current.image_id(), manual, "manual height override");
        Ok(current.overridden(manual, warnings))
    }

    /// Parses user text and applies it as a manual override
    pub fn override_height_str(&self, current: &FlightHeightResult, input: &str) -> Result<FlightHeightResult> {
        let manual = self.policy.parse_manual(input)?;
        self.override_height(current, manual)
    }

    fn check_recalculable(current: &FlightHeightResult) -> Result<()> {
        if current.state().can_recalculate() {
            Ok(())
        } else {
            Err(Error::InvalidTransition(format!(
                "cannot recalculate '{}' from state {}",
                current.image_id(),
                current.state()
            )))
        }
    }
}
