//! Flight height analysis
//!
//! An image moves through the states of [`AnalysisState`]:
//!
//! - `Unanalyzed` to `Computed` or `Flagged` once terrain data arrives
//! - `Unanalyzed` to `Failed` when no elevation source answers
//! - `Computed`/`Flagged`/`Recalculated` to `Recalculated` on a GSD ratio
//!   recalculation or manual override
//!
//! `Failed` is terminal for the image; selecting it again starts over.

pub mod analyzer;
pub mod policy;
pub mod result;

pub use analyzer::FlightHeightAnalyzer;
pub use policy::{HeightPolicy, MAX_MANUAL_HEIGHT_M};
pub use result::{AnalysisState, FlightHeightResult, HeightMethod, WarningKind};
