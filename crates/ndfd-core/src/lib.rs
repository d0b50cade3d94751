//! Forecast-grid assembly for NDFD Alaska products
//!
//! This crate turns raw NDFD GRIB2 files into per-period fields ready for
//! rendering. It:
//!
//! - **Decodes** every message of a product into local-time periods
//! - **Splits** the periods into the short-range (days 1-3) and
//!   extended-range (days 4-7) series
//! - **Aligns** the two series into up to seven logical periods, one per
//!   forecast day
//! - **Extracts** one field per period, raw or as a day-over-day difference
//! - **Samples** decimated station tables for label placement
//! - **Masks** hot-dry-windy conditions from temperature, humidity and wind
//!
//! # Architecture
//!
//! ```text
//! RawProduct ──► GridDecoder::decode_all ──► Vec<ForecastPeriod>
//!                                                  │
//!                                                  ▼
//!                                    CadenceSplitter::split ──► SplitSeries
//!                                                                   │
//!                                                                   ▼
//!                                      StepAligner::ndfd_step_count ──► StepCount
//!                                                                          │
//!                    ┌─────────────────────────────────────────────────────┤
//!                    ▼                                                     ▼
//!             find_ds_vals                                parse_nws_grib_data_array
//!           (PeriodFields)                                   (SampledStations)
//!                    │
//!                    ▼
//!              build_mask (x3 products) ──► HazardMask
//! ```
//!
//! The 7th period is frequently absent. Every stage represents that with
//! `Option` or a shorter list, never with an error.
//!
//! # Example
//!
//! ```ignore
//! use ndfd_core::{Overrides, Pipeline, PipelineConfig, ProductCode, ResolvedSettings};
//!
//! let settings = ResolvedSettings::resolve(&PipelineConfig::default(), &Overrides::default())?;
//! let pipeline = Pipeline::new(settings);
//!
//! let maxt = pipeline.assemble(ProductCode::MaxTemperature, &raw_files)?;
//! let fields = maxt.fields(false)?;
//! if fields.period_7().is_none() {
//!     // render six days
//! }
//! ```

pub mod align;
pub mod cadence;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod hazard;
pub mod pipeline;
pub mod products;
pub mod stations;
pub mod time;
pub mod types;
pub mod units;

// Re-export commonly used types at crate root
pub use align::{StepAligner, MAX_PERIODS, MIN_PERIODS};
pub use cadence::{CadenceSplitter, SplitRule, DEFAULT_SPLIT_HOURS};
pub use config::{
    BorderSettings, DecimationTable, Overrides, PipelineConfig, ReferenceSystem, ResolvedSettings,
};
pub use decoder::GridDecoder;
pub use error::{ForecastError, Result};
pub use extract::{find_ds_vals, PeriodField, PeriodFields};
pub use hazard::{
    build_display_mask, build_mask, build_profile_masks, HazardProfile, HazardThresholds,
    NativeInputs, ProfileMask,
};
pub use pipeline::{AssembledProduct, HazardFrame, PeriodFrame, Pipeline, RenderSink};
pub use products::{Horizon, ProductCode, RawProduct, NDFD_ALASKA_BASE_URL};
pub use stations::{
    parse_nws_grib_data_array, SampleOptions, SampledStations, StationTable, DIFF_COLUMN,
};
pub use time::{DayHalf, LocalZone, PeriodTitle};
pub use types::{
    FieldStats, ForecastPeriod, Grid2D, HazardMask, PeriodIndex, PeriodSlot, Series, SeriesKind,
    SplitSeries, StepCount,
};
pub use units::{convert_grid, Conversion, Unit};

pub use projection::GridCoords;
