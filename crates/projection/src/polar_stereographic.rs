//! Polar Stereographic projection.
//!
//! The NDFD Alaska grid (GRIB2 template 3.20) uses this projection on a
//! sphere of radius 6371200 m. A plane tangent at the pole is cut so that
//! distances are true at latitude LaD (60°N for Alaska).
//!
//! The projection parameters include:
//! - True latitude (LaD)
//! - Orientation longitude (LoV): the meridian parallel to the grid y axis
//! - Grid spacing: dx, dy in meters
//! - First grid point: lat1, lon1

use std::f64::consts::PI;

use crate::{normalize_longitude, ProjectionError, Result};

/// Polar Stereographic projection parameters (north pole only).
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Orientation longitude (LoV) in radians
    pub lov: f64,
    /// Latitude where scale is true (LaD) in radians
    pub lad: f64,
    /// Latitude of first grid point in radians
    pub lat1: f64,
    /// Longitude of first grid point in radians
    pub lon1: f64,
    /// Grid spacing in X direction (meters)
    pub dx: f64,
    /// Grid spacing in Y direction (meters)
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
    pub earth_radius: f64,
    /// R * (1 + sin LaD)
    scale: f64,
    /// Projected x of the first grid point
    x0: f64,
    /// Projected y of the first grid point
    y0: f64,
}

impl PolarStereographic {
    /// Create a new projection from GRIB2 template 3.20 values (degrees).
    #[allow(clippy::too_many_arguments)]
    pub fn from_grib2(
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        lad_deg: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
        earth_radius: f64,
        south_pole: bool,
    ) -> Result<Self> {
        if south_pole {
            return Err(ProjectionError::Unsupported(
                "south pole stereographic grids".to_string(),
            ));
        }
        if dx <= 0.0 || dy <= 0.0 {
            return Err(ProjectionError::InvalidParameters(format!(
                "grid spacing must be positive, got dx={} dy={}",
                dx, dy
            )));
        }

        let lad = lad_deg.to_radians();
        let scale = earth_radius * (1.0 + lad.sin());
        let mut proj = Self {
            lov: lov_deg.to_radians(),
            lad,
            lat1: lat1_deg.to_radians(),
            lon1: lon1_deg.to_radians(),
            dx,
            dy,
            nx,
            ny,
            earth_radius,
            scale,
            x0: 0.0,
            y0: 0.0,
        };
        let (x0, y0) = proj.forward(proj.lat1, proj.lon1);
        proj.x0 = x0;
        proj.y0 = y0;
        Ok(proj)
    }

    /// NDFD Alaska 2.976 km grid, 1649 x 1105 points.
    pub fn ndfd_alaska() -> Self {
        let lad = 60f64.to_radians();
        let earth_radius = 6_371_200.0;
        let mut proj = Self {
            lov: 210f64.to_radians(),
            lad,
            lat1: 40.53f64.to_radians(),
            lon1: 181.429f64.to_radians(),
            dx: 2976.563,
            dy: 2976.563,
            nx: 1649,
            ny: 1105,
            earth_radius,
            scale: earth_radius * (1.0 + lad.sin()),
            x0: 0.0,
            y0: 0.0,
        };
        let (x0, y0) = proj.forward(proj.lat1, proj.lon1);
        proj.x0 = x0;
        proj.y0 = y0;
        proj
    }

    /// Projected (x, y) in meters for a point in radians.
    fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let rho = self.scale * (PI / 4.0 - lat / 2.0).tan();
        let dlon = lon - self.lov;
        (rho * dlon.sin(), -rho * dlon.cos())
    }

    /// Convert geographic coordinates (degrees) to fractional grid indices (i, j).
    ///
    /// j increases with projected y, i.e. away from the pole along LoV is -j.
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let (x, y) = self.forward(lat_deg.to_radians(), lon_deg.to_radians());
        ((x - self.x0) / self.dx, (y - self.y0) / self.dy)
    }

    /// Convert grid indices (i, j) to (lat, lon) in degrees, lon in [-180, 180).
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let x = self.x0 + i * self.dx;
        let y = self.y0 + j * self.dy;

        let rho = (x * x + y * y).sqrt();
        let lat = PI / 2.0 - 2.0 * (rho / self.scale).atan();
        let lon = self.lov + x.atan2(-y);

        (lat.to_degrees(), normalize_longitude(lon.to_degrees()))
    }

    /// Check if a geographic point is within the grid.
    pub fn contains(&self, lat_deg: f64, lon_deg: f64) -> bool {
        let (i, j) = self.geo_to_grid(lat_deg, lon_deg);
        i >= 0.0 && i < self.nx as f64 && j >= 0.0 && j < self.ny as f64
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alaska_first_grid_point() {
        let proj = PolarStereographic::ndfd_alaska();

        let (i, j) = proj.geo_to_grid(40.53, 181.429);
        assert!(i.abs() < 0.01, "i should be ~0, got {}", i);
        assert!(j.abs() < 0.01, "j should be ~0, got {}", j);

        let (lat, lon) = proj.grid_to_geo(0.0, 0.0);
        assert!((lat - 40.53).abs() < 1e-6);
        assert!((lon - (181.429 - 360.0)).abs() < 1e-6);
    }

    #[test]
    fn test_alaska_roundtrip() {
        let proj = PolarStereographic::ndfd_alaska();

        let (lat, lon) = proj.grid_to_geo(800.0, 550.0);
        let (i, j) = proj.geo_to_grid(lat, lon);

        assert!((i - 800.0).abs() < 0.01, "i roundtrip failed: {}", i);
        assert!((j - 550.0).abs() < 0.01, "j roundtrip failed: {}", j);
    }

    #[test]
    fn test_anchorage_inside_grid() {
        let proj = PolarStereographic::ndfd_alaska();
        assert!(proj.contains(61.2, -149.9));

        let (i, j) = proj.geo_to_grid(61.2, -149.9);
        assert!(i > 800.0 && i < 950.0, "Anchorage x out of range: {}", i);
        assert!(j > 500.0 && j < 700.0, "Anchorage y out of range: {}", j);
    }

    #[test]
    fn test_pole_maps_to_lov_axis() {
        let proj = PolarStereographic::ndfd_alaska();
        let (i_pole, j_pole) = proj.geo_to_grid(90.0, 0.0);
        let (lat, _) = proj.grid_to_geo(i_pole, j_pole);
        assert!((lat - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_south_pole_rejected() {
        let result = PolarStereographic::from_grib2(
            -40.0, 0.0, 0.0, -60.0, 5000.0, 5000.0, 10, 10, 6_371_200.0, true,
        );
        assert!(matches!(result, Err(ProjectionError::Unsupported(_))));
    }

    #[test]
    fn test_from_grib2_matches_preset() {
        let preset = PolarStereographic::ndfd_alaska();
        let parsed = PolarStereographic::from_grib2(
            40.53, 181.429, 210.0, 60.0, 2976.563, 2976.563, 1649, 1105, 6_371_200.0, false,
        )
        .unwrap();

        let a = preset.grid_to_geo(1648.0, 1104.0);
        let b = parsed.grid_to_geo(1648.0, 1104.0);
        assert!((a.0 - b.0).abs() < 1e-9);
        assert!((a.1 - b.1).abs() < 1e-9);
    }
}
