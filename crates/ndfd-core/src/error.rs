//! Error types for forecast assembly.

use thiserror::Error;

/// Errors that can occur while assembling forecast periods.
///
/// Partial availability (a missing 7th period, a station table that could
/// not be built) is never an error; it shows up as `None` or as an entry in
/// [`crate::SampledStations::missing`].
#[derive(Error, Debug)]
pub enum ForecastError {
    /// The raw product contained no decodable forecast period.
    #[error("failed to decode {product}: {reason}")]
    Decode { product: String, reason: String },

    /// Two grids that must be co-registered have different shapes.
    #[error("grid mismatch in {context}: expected {expected:?}, got {actual:?}")]
    GridMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
        context: String,
    },

    /// The period index ends before the aligned step count.
    #[error("period index holds only {available} of the aligned forecast periods")]
    InsufficientPeriods { available: usize },

    /// The requested field is not the one the series holds.
    #[error("unknown field '{requested}', series holds '{available}'")]
    UnknownField { requested: String, available: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A render sink rejected a frame.
    #[error("render sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Grib2(#[from] grib2_parser::Grib2Error),

    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),
}

impl ForecastError {
    /// Create a Decode error.
    pub fn decode(product: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            product: product.into(),
            reason: reason.into(),
        }
    }

    /// Create a GridMismatch error.
    pub fn grid_mismatch(
        expected: (usize, usize),
        actual: (usize, usize),
        context: impl Into<String>,
    ) -> Self {
        Self::GridMismatch {
            expected,
            actual,
            context: context.into(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for forecast assembly operations.
pub type Result<T> = std::result::Result<T, ForecastError>;
