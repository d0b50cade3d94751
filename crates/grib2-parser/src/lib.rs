//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Reads the gridded forecast products published by the National Digital
//! Forecast Database. NDFD files are plain concatenations of GRIB2 messages,
//! one field per message, so [`Grib2Reader`] walks the buffer message by
//! message and hands out fully parsed [`Grib2Message`] values.
//!
//! Simple packing (template 5.0) is unpacked here; every other packing
//! template (NDFD uses complex packing with spatial differencing) is handed
//! to the `grib` crate.

pub mod reader;
pub mod sections;
pub mod tables;
pub mod unpacking;

use thiserror::Error;

pub use reader::{Grib2Message, Grib2Reader};
pub use sections::{
    decode_grib2_signed, decode_grib2_signed_i16, time_unit_duration, Bitmap, DataRepresentation,
    DataSection, GridDefinition, GridGeometry, Identification, Indicator, ProductDefinition,
    StatisticalInterval,
};
pub use tables::{Grib2Tables, LevelDescription};
pub use unpacking::unpack_simple;

/// Errors raised while reading GRIB2 data.
#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("truncated message at offset {offset}: needs {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unsupported template {template} in section {section}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("unpacking error: {0}")]
    UnpackingError(String),
}

/// Result type for GRIB2 operations.
pub type Result<T> = std::result::Result<T, Grib2Error>;
