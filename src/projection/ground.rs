//! Ground distance of raster pixels

use crate::error::{Error, Result};
use crate::types::Coordinate;
use super::coordinate::CrsPoint;
use super::epsg;
use super::transformer::Transformer;

/// Returns true for CRSs whose units are degrees
pub fn is_geographic(code: u16) -> bool {
    matches!(
        code,
        epsg::WGS84
            | epsg::ETRS89
            | epsg::NAD83
            | epsg::GDA94
            | epsg::NAD83_CSRS
            | epsg::SIRGAS2000
            | epsg::GDA2020
    )
}

/// WGS84 UTM zone EPSG code containing `coordinate`
pub fn utm_epsg(coordinate: Coordinate) -> u16 {
    let zone = (((coordinate.longitude() + 180.0) / 6.0).floor() as u16 + 1).clamp(1, 60);
    if coordinate.latitude() >= 0.0 {
        32600 + zone
    } else {
        32700 + zone
    }
}

/// Measures one pixel step at `origin` in metres.
///
/// `origin` and the pixel sizes are in units of `source_epsg`. The pixel edges
/// are projected into the UTM zone containing the origin and measured there.
/// Returns (ground_x_m, ground_y_m).
pub fn pixel_ground_size(
    source_epsg: u16,
    origin: CrsPoint,
    pixel_size_x: f64,
    pixel_size_y: f64,
) -> Result<(f64, f64)> {
    let lonlat = if source_epsg == epsg::WGS84 {
        origin
    } else {
        Transformer::new(source_epsg, epsg::WGS84)?.transform(origin)?
    };
    let location = Coordinate::new(lonlat.y, lonlat.x)
        .map_err(|e| Error::Projection(format!("Raster origin is not a valid position: {}", e)))?;

    let utm = Transformer::new(source_epsg, utm_epsg(location))?;
    let base = utm.transform(origin)?;
    let step_x = utm.transform(origin.offset(pixel_size_x.abs(), 0.0))?;
    let step_y = utm.transform(origin.offset(0.0, -pixel_size_y.abs()))?;

    let ground = (base.distance(&step_x), base.distance(&step_y));
    tracing::debug!(source_epsg, ground_x = ground.0, ground_y = ground.1, "pixel ground size");
    Ok(ground)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_zone() {
        let zurich = Coordinate::new(47.37, 8.54).unwrap();
        assert_eq!(utm_epsg(zurich), 32632);

        let sydney = Coordinate::new(-33.86, 151.2).unwrap();
        assert_eq!(utm_epsg(sydney), 32756);

        let antimeridian = Coordinate::new(10.0, 180.0).unwrap();
        assert_eq!(utm_epsg(antimeridian), 32660);
    }

    #[test]
    fn test_is_geographic() {
        assert!(is_geographic(epsg::WGS84));
        assert!(is_geographic(epsg::GDA94));
        assert!(is_geographic(epsg::NAD83_CSRS));
        assert!(is_geographic(epsg::SIRGAS2000));
        assert!(is_geographic(epsg::GDA2020));
        assert!(!is_geographic(epsg::WEB_MERCATOR));
        assert!(!is_geographic(32632));
    }

    #[test]
    fn test_geographic_pixel_ground_size() {
        // 1e-6 degrees at the equator is about 11 cm in both directions
        let origin = CrsPoint::from_lonlat(9.0, 0.5);
        let (gx, gy) = pixel_ground_size(epsg::WGS84, origin, 1e-6, 1e-6).unwrap();
        assert!((gx - 0.1113).abs() < 0.002, "gx = {}", gx);
        assert!((gy - 0.1106).abs() < 0.002, "gy = {}", gy);
    }

    #[test]
    fn test_projected_pixel_ground_size_is_close_to_units() {
        // UTM 32N raster: metres already, so one 5 cm pixel stays ~5 cm
        let origin = CrsPoint::new(465_000.0, 5_247_000.0);
        let (gx, gy) = pixel_ground_size(32632, origin, 0.05, 0.05).unwrap();
        assert!((gx - 0.05).abs() < 1e-6);
        assert!((gy - 0.05).abs() < 1e-6);
    }
}
