/// A point in the units of some coordinate reference system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrsPoint {
    pub x: f64,
    pub y: f64,
}

impl CrsPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a point from longitude/latitude in degrees (WGS84)
    pub fn from_lonlat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat)
    }

    /// Returns this point moved by (dx, dy) CRS units
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Planar distance, meaningful only within a metric CRS
    pub fn distance(&self, other: &CrsPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
