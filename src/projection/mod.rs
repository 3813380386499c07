//! Coordinate reference system helpers
//!
//! Used to turn raster pixel sizes expressed in CRS units into ground
//! distances.

pub mod coordinate;
pub mod transformer;
pub mod ground;

pub use coordinate::CrsPoint;
pub use transformer::Transformer;
pub use ground::{is_geographic, pixel_ground_size, utm_epsg};

/// Frequently used EPSG codes
pub mod epsg {
    /// WGS84 geographic (degrees)
    pub const WGS84: u16 = 4326;
    /// ETRS89 geographic (degrees)
    pub const ETRS89: u16 = 4258;
    /// NAD83 geographic (degrees)
    pub const NAD83: u16 = 4269;
    /// GDA94 geographic (degrees)
    pub const GDA94: u16 = 4283;
    /// NAD83(CSRS) geographic (degrees)
    pub const NAD83_CSRS: u16 = 4617;
    /// SIRGAS 2000 geographic (degrees)
    pub const SIRGAS2000: u16 = 4674;
    /// GDA2020 geographic (degrees)
    pub const GDA2020: u16 = 7844;
    /// Web Mercator
    pub const WEB_MERCATOR: u16 = 3857;
}
