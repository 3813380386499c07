//! flightheight - Drone flight height above terrain
//!
//! flightheight estimates how high a drone flew above the ground when a photo
//! was taken. Terrain elevation at the photo's position is looked up from
//! several public elevation services at once and averaged; the flight height
//! is the GPS altitude minus that terrain elevation. When the GPS altitude is
//! unreliable, the height can be recalculated from the ground sample distance
//! (GSD) of the resulting map, or set by hand.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use flightheight::{Config, Coordinate, FlightHeightAnalyzer, MetadataRecord};
//!
//! # async fn run() -> flightheight::Result<()> {
//! let analyzer = FlightHeightAnalyzer::from_config(&Config::default())?;
//! let record = MetadataRecord::new("DJI_0001.JPG", Coordinate::new(46.55, 7.98)?, 2150.0);
//!
//! let result = analyzer.analyze(&record).await?;
//! println!("{}: {:?} m ({})", result.image_id(), result.effective_height_m(), result.state());
//! # Ok(())
//! # }
//! ```
//!
//! ## Recalculating from Map Resolution
//!
//! ```no_run
//! use flightheight::gsd::{preset, RasterMetadata};
//! # use flightheight::{Config, Coordinate, FlightHeightAnalyzer, MetadataRecord};
//!
//! # async fn run() -> flightheight::Result<()> {
//! # let analyzer = FlightHeightAnalyzer::from_config(&Config::default())?;
//! # let record = MetadataRecord::new("DJI_0001.JPG", Coordinate::new(46.55, 7.98)?, 2150.0);
//! let result = analyzer.analyze(&record).await?;
//! if result.prompts_recalculation() {
//!     let reference = preset("DJI Phantom 4 Pro").unwrap().reference();
//!     let raster = RasterMetadata::metric(0.0272, 0.0272);
//!     let recalculated = analyzer.recalculate_from_raster(&result, &raster, &reference)?;
//!     println!("GSD height: {:?} m", recalculated.effective_height_m());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod metadata;
pub mod elevation;
pub mod projection;
pub mod gsd;
pub mod analysis;
pub mod session;
pub mod worker;
pub mod report;
pub mod api;

pub use error::{Error, Result};
pub use types::{Coordinate, ImageId};
pub use config::{Config, ProviderConfig};
pub use metadata::{Dms, MetadataRecord};
pub use elevation::{ElevationErrorKind, ElevationSample, ElevationSource, TerrainAggregator, TerrainEstimate};
pub use gsd::{GsdPreset, GsdReference, RasterMetadata, RasterResolution};
pub use analysis::{AnalysisState, FlightHeightAnalyzer, FlightHeightResult, HeightPolicy, WarningKind};
pub use session::{AnalysisEvent, AnalysisOutcome, Session};
pub use worker::AnalysisWorker;
