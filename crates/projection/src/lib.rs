//! Coordinate reference system transformations.
//!
//! Implements the grid projections NDFD ships from scratch without external
//! dependencies: regular latitude/longitude and north polar stereographic.

pub mod grid;
pub mod polar_stereographic;

pub use grid::{grid_coordinates, GridCoords, GridKind, GridSpec};
pub use polar_stereographic::PolarStereographic;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Unsupported projection: {0}")]
    Unsupported(String),

    #[error("Invalid projection parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Wrap a longitude in degrees into [-180, 180).
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
