//! Terrain elevation lookups
//!
//! An [`ElevationSource`] queries exactly one provider for one coordinate and
//! reports the outcome as an [`ElevationSample`]. Provider failures are data:
//! a source never returns an error or panics, so the aggregator can continue
//! with whatever the remaining sources deliver.

pub mod providers;
pub mod aggregate;

use std::fmt;
use std::time::Duration;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use crate::types::Coordinate;

pub use aggregate::{estimate, ConnectivityReport, SourceStatus, TerrainAggregator, TerrainEstimate};
pub use providers::{build_sources, OpenElevation, OpenMeteo, OpenTopoData};

/// Why a single provider lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElevationErrorKind {
    /// No answer within the source's timeout
    Timeout,
    /// Connection failed or the provider answered with an error status
    Unreachable,
    /// The provider answered, but not with a usable elevation
    MalformedResponse,
    /// HTTP 429
    RateLimited,
}

impl fmt::Display for ElevationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ElevationErrorKind::Timeout => "timeout",
            ElevationErrorKind::Unreachable => "unreachable",
            ElevationErrorKind::MalformedResponse => "malformed response",
            ElevationErrorKind::RateLimited => "rate limited",
        };
        f.write_str(text)
    }
}

/// Outcome of one provider lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub coordinate: Coordinate,
    /// Present exactly when `success` is true
    pub elevation_meters: Option<f64>,
    pub source_name: String,
    pub success: bool,
    pub error: Option<ElevationErrorKind>,
}

impl ElevationSample {
    pub fn success(coordinate: Coordinate, source_name: impl Into<String>, elevation_meters: f64) -> Self {
        Self {
            coordinate,
            elevation_meters: Some(elevation_meters),
            source_name: source_name.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(coordinate: Coordinate, source_name: impl Into<String>, error: ElevationErrorKind) -> Self {
        Self {
            coordinate,
            elevation_meters: None,
            source_name: source_name.into(),
            success: false,
            error: Some(error),
        }
    }

    /// Builds a sample from a provider result
    pub fn from_result(
        coordinate: Coordinate,
        source_name: &str,
        result: std::result::Result<f64, ElevationErrorKind>,
    ) -> Self {
        match result {
            Ok(elevation) if elevation.is_finite() => Self::success(coordinate, source_name, elevation),
            Ok(_) => Self::failure(coordinate, source_name, ElevationErrorKind::MalformedResponse),
            Err(kind) => Self::failure(coordinate, source_name, kind),
        }
    }

    /// Returns the elevation of a successful sample
    pub fn elevation(&self) -> Option<f64> {
        if self.success {
            self.elevation_meters
        } else {
            None
        }
    }
}

/// A single terrain-elevation provider
pub trait ElevationSource: Send + Sync {
    /// Provider name recorded in samples
    fn name(&self) -> &str;

    /// Upper bound for one lookup
    fn timeout(&self) -> Duration;

    /// Looks up the terrain elevation at `coordinate`. Never fails: errors are
    /// reported through the returned sample.
    fn fetch(&self, coordinate: Coordinate) -> BoxFuture<'_, ElevationSample>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use futures::FutureExt;

    /// Source answering with a fixed result after an optional delay
    pub struct FixedSource {
        pub name: String,
        pub result: std::result::Result<f64, ElevationErrorKind>,
        pub delay: Duration,
        pub timeout: Duration,
    }

    impl FixedSource {
        pub fn ok(name: &str, elevation: f64) -> Self {
            Self {
                name: name.to_string(),
                result: Ok(elevation),
                delay: Duration::ZERO,
                timeout: Duration::from_secs(2),
            }
        }

        pub fn failing(name: &str, kind: ElevationErrorKind) -> Self {
            Self {
                result: Err(kind),
                ..Self::ok(name, 0.0)
            }
        }

        pub fn delayed(mut self, delay: Duration, timeout: Duration) -> Self {
            self.delay = delay;
            self.timeout = timeout;
            self
        }
    }

    impl ElevationSource for FixedSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        fn fetch(&self, coordinate: Coordinate) -> BoxFuture<'_, ElevationSample> {
            async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                ElevationSample::from_result(coordinate, &self.name, self.result)
            }
            .boxed()
        }
    }
}
