use crate::error::{Error, Result};
use crate::projection::coordinate::CrsPoint;
use proj::Proj;

/// Transforms points between different coordinate reference systems
pub struct Transformer {
    proj: Proj,
    from_epsg: u16,
    to_epsg: u16,
}

impl Transformer {
    /// Creates a new transformer from source to target CRS using EPSG codes.
    /// Geographic CRSs use (longitude, latitude) axis order.
    pub fn new(from_epsg: u16, to_epsg: u16) -> Result<Self> {
        let from = format!("EPSG:{}", from_epsg);
        let to = format!("EPSG:{}", to_epsg);

        let proj = Proj::new_known_crs(&from, &to, None)
            .map_err(|e| Error::Projection(format!("Failed to create projection {} -> {}: {}", from, to, e)))?;

        Ok(Self {
            proj,
            from_epsg,
            to_epsg,
        })
    }

    /// Transforms a point from source to target CRS
    pub fn transform(&self, point: CrsPoint) -> Result<CrsPoint> {
        let result = self.proj.convert((point.x, point.y))
            .map_err(|e| Error::Projection(format!("Transformation failed: {}", e)))?;

        if !result.0.is_finite() || !result.1.is_finite() {
            return Err(Error::Projection(format!(
                "EPSG:{} -> EPSG:{} produced a non-finite point",
                self.from_epsg, self.to_epsg
            )));
        }

        Ok(CrsPoint::new(result.0, result.1))
    }

    pub fn from_epsg(&self) -> u16 {
        self.from_epsg
    }

    pub fn to_epsg(&self) -> u16 {
        self.to_epsg
    }
}
