//! Per-point coordinates for a whole GRIB2 grid.
//!
//! [`grid_coordinates`] expands a grid description into flat latitude and
//! longitude arrays laid out in the same row-major order as the unpacked
//! data values, so `lat[k]`, `lon[k]` and `values[k]` describe one point.

use crate::polar_stereographic::PolarStereographic;
use crate::{normalize_longitude, ProjectionError, Result};

/// Flag table 3.4: points scan in the -i direction.
pub const SCAN_NEGATIVE_I: u8 = 0x80;
/// Flag table 3.4: points scan in the +j direction.
pub const SCAN_POSITIVE_J: u8 = 0x40;
/// Flag table 3.4: adjacent rows scan in opposite directions.
pub const SCAN_BOUSTROPHEDON: u8 = 0x10;

/// Geometry of a grid, in degrees and meters.
#[derive(Debug, Clone, PartialEq)]
pub enum GridKind {
    LatLon {
        la1: f64,
        lo1: f64,
        di: f64,
        dj: f64,
    },
    PolarStereographic {
        la1: f64,
        lo1: f64,
        lad: f64,
        lov: f64,
        dx_m: f64,
        dy_m: f64,
        earth_radius_m: f64,
        south_pole: bool,
    },
}

/// Everything needed to place every point of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub nx: usize,
    pub ny: usize,
    pub scanning_mode: u8,
    pub kind: GridKind,
}

/// Latitude/longitude of every grid point, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCoords {
    pub width: usize,
    pub height: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl GridCoords {
    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// (lat, lon) at a row and column.
    pub fn get(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let idx = row * self.width + col;
        Some((self.lat[idx], self.lon[idx]))
    }
}

/// Compute coordinates for every point of `spec`.
pub fn grid_coordinates(spec: &GridSpec) -> Result<GridCoords> {
    if spec.nx == 0 || spec.ny == 0 {
        return Err(ProjectionError::InvalidParameters(format!(
            "empty grid {}x{}",
            spec.nx, spec.ny
        )));
    }

    let n = spec.nx * spec.ny;
    let mut lat = Vec::with_capacity(n);
    let mut lon = Vec::with_capacity(n);

    let x_sign = if spec.scanning_mode & SCAN_NEGATIVE_I != 0 { -1.0 } else { 1.0 };
    let y_sign = if spec.scanning_mode & SCAN_POSITIVE_J != 0 { 1.0 } else { -1.0 };

    // Column index of a scanned point, honouring alternating rows
    let column = |row: usize, col: usize| -> f64 {
        if spec.scanning_mode & SCAN_BOUSTROPHEDON != 0 && row % 2 == 1 {
            (spec.nx - 1 - col) as f64
        } else {
            col as f64
        }
    };

    match spec.kind {
        GridKind::LatLon { la1, lo1, di, dj } => {
            for row in 0..spec.ny {
                for col in 0..spec.nx {
                    lat.push(la1 + y_sign * row as f64 * dj);
                    lon.push(normalize_longitude(lo1 + x_sign * column(row, col) * di));
                }
            }
        }
        GridKind::PolarStereographic {
            la1,
            lo1,
            lad,
            lov,
            dx_m,
            dy_m,
            earth_radius_m,
            south_pole,
        } => {
            let proj = PolarStereographic::from_grib2(
                la1,
                lo1,
                lov,
                lad,
                dx_m,
                dy_m,
                spec.nx,
                spec.ny,
                earth_radius_m,
                south_pole,
            )?;

            for row in 0..spec.ny {
                let j = y_sign * row as f64;
                for col in 0..spec.nx {
                    let (plat, plon) = proj.grid_to_geo(x_sign * column(row, col), j);
                    lat.push(plat);
                    lon.push(plon);
                }
            }
        }
    }

    Ok(GridCoords {
        width: spec.nx,
        height: spec.ny,
        lat,
        lon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latlon_spec(scanning_mode: u8) -> GridSpec {
        GridSpec {
            nx: 3,
            ny: 2,
            scanning_mode,
            kind: GridKind::LatLon {
                la1: 60.0,
                lo1: 200.0,
                di: 1.0,
                dj: 0.5,
            },
        }
    }

    #[test]
    fn test_latlon_north_to_south() {
        let coords = grid_coordinates(&latlon_spec(0)).unwrap();
        assert_eq!(coords.shape(), (2, 3));
        assert_eq!(coords.get(0, 0), Some((60.0, -160.0)));
        assert_eq!(coords.get(0, 2), Some((60.0, -158.0)));
        assert_eq!(coords.get(1, 0), Some((59.5, -160.0)));
        assert_eq!(coords.get(2, 0), None);
    }

    #[test]
    fn test_latlon_positive_j() {
        let coords = grid_coordinates(&latlon_spec(SCAN_POSITIVE_J)).unwrap();
        assert_eq!(coords.get(1, 0), Some((60.5, -160.0)));
    }

    #[test]
    fn test_latlon_boustrophedon() {
        let coords = grid_coordinates(&latlon_spec(SCAN_BOUSTROPHEDON)).unwrap();
        // Second row runs east to west
        assert_eq!(coords.get(1, 0), Some((59.5, -158.0)));
        assert_eq!(coords.get(1, 2), Some((59.5, -160.0)));
    }

    #[test]
    fn test_polar_stereographic_matches_projection() {
        let spec = GridSpec {
            nx: 4,
            ny: 3,
            scanning_mode: SCAN_POSITIVE_J,
            kind: GridKind::PolarStereographic {
                la1: 40.53,
                lo1: 181.429,
                lad: 60.0,
                lov: 210.0,
                dx_m: 2976.563,
                dy_m: 2976.563,
                earth_radius_m: 6_371_200.0,
                south_pole: false,
            },
        };
        let coords = grid_coordinates(&spec).unwrap();
        let proj = PolarStereographic::ndfd_alaska();

        let (lat, lon) = proj.grid_to_geo(3.0, 2.0);
        let (clat, clon) = coords.get(2, 3).unwrap();
        assert!((lat - clat).abs() < 1e-9);
        assert!((lon - clon).abs() < 1e-9);
        // Moving +j from the south-west corner heads north
        assert!(coords.get(2, 0).unwrap().0 > coords.get(0, 0).unwrap().0);
    }

    #[test]
    fn test_empty_grid_rejected() {
        let mut spec = latlon_spec(0);
        spec.nx = 0;
        assert!(grid_coordinates(&spec).is_err());
    }
}
