//! Flight height analysis results

use std::collections::BTreeSet;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::elevation::TerrainEstimate;
use crate::error::{Error, Result};
use crate::gsd::GsdReference;
use crate::types::ImageId;

/// Analysis lifecycle of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisState {
    /// Image selected, no result yet
    Unanalyzed,
    /// Height computed without issues
    Computed,
    /// Height computed but a warning applies
    Flagged,
    /// Height replaced by a GSD ratio or manual value
    Recalculated,
    /// No terrain data available at all
    Failed,
}

impl AnalysisState {
    /// States from which a recalculation may start
    pub fn can_recalculate(&self) -> bool {
        matches!(self, AnalysisState::Computed | AnalysisState::Flagged | AnalysisState::Recalculated)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisState::Unanalyzed => "Unanalyzed",
            AnalysisState::Computed => "Computed",
            AnalysisState::Flagged => "Flagged",
            AnalysisState::Recalculated => "Recalculated",
            AnalysisState::Failed => "Failed",
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Issues attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// GPS altitude below terrain; metadata likely inaccurate
    NegativeHeight,
    /// Height above the configured regulatory limit
    AboveRegulatoryLimit,
    /// Every elevation source failed
    ElevationUnavailable,
}

impl WarningKind {
    /// Whether the UI should offer a recalculation for this warning
    pub fn prompts_recalculation(&self) -> bool {
        matches!(self, WarningKind::NegativeHeight)
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::NegativeHeight => "Computed height is negative; GPS altitude or terrain data is inaccurate",
            WarningKind::AboveRegulatoryLimit => "Flight height exceeds the regulatory limit",
            WarningKind::ElevationUnavailable => "Terrain elevation unavailable from all sources",
        }
    }
}

/// How `computed_height_m` was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeightMethod {
    /// GPS altitude minus aggregated terrain elevation
    TerrainDifference,
    /// Ratio of map GSD to a camera reference
    GsdRatio {
        reference: GsdReference,
        map_gsd_cm_per_px: f64,
    },
}

/// Height analysis of one image.
///
/// Results are never edited in place: a recalculation builds a new result and
/// keeps the one it replaced in [`previous`](FlightHeightResult::previous).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightHeightResult {
    image_id: ImageId,
    gps_altitude_m: f64,
    terrain_estimate: TerrainEstimate,
    /// Absent only in the `Failed` state
    computed_height_m: Option<f64>,
    is_manual_override: bool,
    manual_height_m: Option<f64>,
    warnings: BTreeSet<WarningKind>,
    state: AnalysisState,
    method: HeightMethod,
    previous: Option<Box<FlightHeightResult>>,
}

impl FlightHeightResult {
    pub(crate) fn computed(
        image_id: ImageId,
        gps_altitude_m: f64,
        terrain_estimate: TerrainEstimate,
        computed_height_m: f64,
        warnings: BTreeSet<WarningKind>,
    ) -> Self {
        let state = if warnings.is_empty() {
            AnalysisState::Computed
        } else {
            AnalysisState::Flagged
        };
        Self {
            image_id,
            gps_altitude_m,
            terrain_estimate,
            computed_height_m: Some(computed_height_m),
            is_manual_override: false,
            manual_height_m: None,
            warnings,
            state,
            method: HeightMethod::TerrainDifference,
            previous: None,
        }
    }

    pub(crate) fn failed(image_id: ImageId, gps_altitude_m: f64, terrain_estimate: TerrainEstimate) -> Self {
        Self {
            image_id,
            gps_altitude_m,
            terrain_estimate,
            computed_height_m: None,
            is_manual_override: false,
            manual_height_m: None,
            warnings: BTreeSet::from([WarningKind::ElevationUnavailable]),
            state: AnalysisState::Failed,
            method: HeightMethod::TerrainDifference,
            previous: None,
        }
    }

    /// New result from a GSD ratio recalculation of `self`
    pub(crate) fn recalculated(&self, height_m: f64, method: HeightMethod, warnings: BTreeSet<WarningKind>) -> Self {
        Self {
            image_id: self.image_id.clone(),
            gps_altitude_m: self.gps_altitude_m,
            terrain_estimate: self.terrain_estimate.clone(),
            computed_height_m: Some(height_m),
            is_manual_override: false,
            manual_height_m: None,
            warnings,
            state: AnalysisState::Recalculated,
            method,
            previous: Some(Box::new(self.clone())),
        }
    }

    /// New result overriding the effective height of `self`
    pub(crate) fn overridden(&self, manual_height_m: f64, warnings: BTreeSet<WarningKind>) -> Self {
        Self {
            is_manual_override: true,
            manual_height_m: Some(manual_height_m),
            warnings,
            state: AnalysisState::Recalculated,
            previous: Some(Box::new(self.clone())),
            ..self.clone()
        }
    }

    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    pub fn gps_altitude_m(&self) -> f64 {
        self.gps_altitude_m
    }

    pub fn terrain_estimate(&self) -> &TerrainEstimate {
        &self.terrain_estimate
    }

    /// Height from terrain difference or GSD ratio; kept for audit even when
    /// a manual override applies
    pub fn computed_height_m(&self) -> Option<f64> {
        self.computed_height_m
    }

    pub fn is_manual_override(&self) -> bool {
        self.is_manual_override
    }

    pub fn manual_height_m(&self) -> Option<f64> {
        self.manual_height_m
    }

    /// The height consumers must display and export
    pub fn effective_height_m(&self) -> Option<f64> {
        if self.is_manual_override {
            self.manual_height_m
        } else {
            self.computed_height_m
        }
    }

    /// Effective height, or `AllSourcesFailed` for a failed analysis
    pub fn require_height(&self) -> Result<f64> {
        self.effective_height_m().ok_or_else(|| {
            Error::AllSourcesFailed(self.terrain_estimate.failed_sources.len())
        })
    }

    pub fn warnings(&self) -> &BTreeSet<WarningKind> {
        &self.warnings
    }

    pub fn has_warning(&self, warning: WarningKind) -> bool {
        self.warnings.contains(&warning)
    }

    /// Whether the UI should open the recalculation prompt
    pub fn prompts_recalculation(&self) -> bool {
        self.warnings.iter().any(WarningKind::prompts_recalculation)
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn method(&self) -> &HeightMethod {
        &self.method
    }

    pub fn previous(&self) -> Option<&FlightHeightResult> {
        self.previous.as_deref()
    }

    /// This result followed by every result it superseded, newest first
    pub fn audit_trail(&self) -> impl Iterator<Item = &FlightHeightResult> {
        std::iter::successors(Some(self), |r| r.previous())
    }

    /// The first result of the chain, as computed from terrain data
    pub fn original(&self) -> &FlightHeightResult {
        self.audit_trail().last().unwrap_or(self)
    }
}
