//! Error types for flightheight

use std::io;
use thiserror::Error;

/// Result type for flightheight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in flightheight operations
///
/// Per-provider elevation failures are not represented here; they are carried
/// as [`crate::elevation::ElevationErrorKind`] values inside samples.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Latitude/longitude outside the valid range
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// GSD calculation preconditions violated
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Raster resolution or metadata unusable for recalculation
    #[error("Invalid raster input: {0}")]
    InvalidRasterInput(String),

    /// Manual height rejected before touching any state
    #[error("Invalid manual height: {0}")]
    InvalidManualInput(String),

    /// Metadata record carries no GPS altitude
    #[error("Metadata for '{0}' has no GPS altitude")]
    MissingAltitude(String),

    /// Metadata record carries no GPS position
    #[error("Metadata for '{0}' has no GPS coordinates")]
    MissingCoordinates(String),

    /// Every configured elevation provider failed
    #[error("All {0} elevation sources failed")]
    AllSourcesFailed(usize),

    /// Requested state change is not allowed from the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Unknown GSD preset label
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Projection error
    #[error("Projection error: {0}")]
    Projection(String),
}

impl Error {
    /// Returns true for errors caused by rejected user input rather than
    /// environment or data failures
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidCoordinate(_)
                | Error::InvalidInput(_)
                | Error::InvalidRasterInput(_)
                | Error::InvalidManualInput(_)
                | Error::MissingAltitude(_)
                | Error::MissingCoordinates(_)
                | Error::InvalidTransition(_)
                | Error::UnknownPreset(_)
        )
    }
}
