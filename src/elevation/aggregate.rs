//! Multi-source terrain elevation estimate

use std::sync::Arc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::types::Coordinate;
use super::{ElevationErrorKind, ElevationSample, ElevationSource};

/// Aggregated terrain elevation for one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainEstimate {
    pub coordinate: Coordinate,
    /// Mean of the contributing samples; absent when nothing succeeded
    pub elevation_meters: Option<f64>,
    /// Successful samples in configured source order
    pub contributing_sources: Vec<ElevationSample>,
    pub source_count: usize,
    /// Samples that were excluded from the mean
    pub failed_sources: Vec<ElevationSample>,
}

impl TerrainEstimate {
    /// Splits samples into successes and failures and averages the successes
    pub fn from_samples(coordinate: Coordinate, samples: Vec<ElevationSample>) -> Self {
        let (contributing, failed): (Vec<_>, Vec<_>) =
            samples.into_iter().partition(|s| s.elevation().is_some());

        let elevation_meters = if contributing.is_empty() {
            None
        } else {
            let sum: f64 = contributing.iter().filter_map(|s| s.elevation()).sum();
            Some(sum / contributing.len() as f64)
        };

        Self {
            coordinate,
            elevation_meters,
            source_count: contributing.len(),
            contributing_sources: contributing,
            failed_sources: failed,
        }
    }

    /// True when no source produced an elevation
    pub fn is_failure(&self) -> bool {
        self.source_count == 0
    }

    /// Names of the sources that contributed to the mean
    pub fn source_names(&self) -> Vec<&str> {
        self.contributing_sources
            .iter()
            .map(|s| s.source_name.as_str())
            .collect()
    }
}

/// Queries every source concurrently and averages the successes.
///
/// Each query is bounded by its source's own timeout, so the call returns no
/// later than the slowest timeout. The estimate is built only after every
/// query has finished or timed out.
pub async fn estimate(coordinate: Coordinate, sources: &[Arc<dyn ElevationSource>]) -> TerrainEstimate {
    let samples = fetch_all(coordinate, sources).await;
    let estimate = TerrainEstimate::from_samples(coordinate, samples);
    if estimate.is_failure() {
        tracing::warn!(%coordinate, sources = sources.len(), "no elevation source succeeded");
    }
    estimate
}

/// One sample per source, in source order
async fn fetch_all(coordinate: Coordinate, sources: &[Arc<dyn ElevationSource>]) -> Vec<ElevationSample> {
    let queries = sources.iter().map(|source| async move {
        match tokio::time::timeout(source.timeout(), source.fetch(coordinate)).await {
            Ok(sample) => sample,
            Err(_) => {
                tracing::warn!(source = source.name(), "elevation lookup exceeded timeout");
                ElevationSample::failure(coordinate, source.name(), ElevationErrorKind::Timeout)
            }
        }
    });

    let samples = join_all(queries).await;
    for sample in &samples {
        match sample.elevation() {
            Some(elevation) => tracing::debug!(source = %sample.source_name, elevation, "elevation sample"),
            None => tracing::debug!(source = %sample.source_name, error = ?sample.error, "elevation sample failed"),
        }
    }
    samples
}

/// Fixed lookup point for connectivity checks (Zurich)
const REFERENCE_POINT: Coordinate = Coordinate::new_unchecked(47.3769, 8.5417);

/// Reachability of one source as seen by [`TerrainAggregator::check_connectivity`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub name: String,
    pub reachable: bool,
    pub error: Option<ElevationErrorKind>,
}

/// Result of a connectivity check across all sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub sources: Vec<SourceStatus>,
    /// At least one source answered
    pub online: bool,
    pub message: String,
}

/// Terrain elevation aggregator over a fixed set of sources
#[derive(Clone)]
pub struct TerrainAggregator {
    sources: Vec<Arc<dyn ElevationSource>>,
}

impl TerrainAggregator {
    pub fn new(sources: Vec<Arc<dyn ElevationSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Arc<dyn ElevationSource>] {
        &self.sources
    }

    pub async fn estimate(&self, coordinate: Coordinate) -> TerrainEstimate {
        estimate(coordinate, &self.sources).await
    }

    /// Looks up a reference point on every source and reports which ones answered
    pub async fn check_connectivity(&self) -> ConnectivityReport {
        let samples = fetch_all(REFERENCE_POINT, &self.sources).await;

        let statuses: Vec<SourceStatus> = self
            .sources
            .iter()
            .zip(samples)
            .map(|(source, sample)| SourceStatus {
                name: source.name().to_string(),
                reachable: sample.elevation().is_some(),
                error: sample.error,
            })
            .collect();

        let reachable = statuses.iter().filter(|s| s.reachable).count();
        let message = if reachable == statuses.len() {
            "Online".to_string()
        } else if reachable == 0 {
            "Offline: no elevation source reachable".to_string()
        } else {
            format!("Degraded: {} of {} elevation sources reachable", reachable, statuses.len())
        };
        tracing::info!(reachable, total = statuses.len(), "connectivity check finished");

        ConnectivityReport {
            sources: statuses,
            online: reachable > 0,
            message,
        }
    }
}
