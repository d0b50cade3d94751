//! StationSampler: decimated per-point tables for label placement.
//!
//! Each logical period is flattened into one row per grid point
//! `(longitude, latitude, value[, diff])`, then every `stride`-th row is
//! kept. Sampling never fails: a period that cannot be reconciled is left
//! out and reported in [`SampledStations::missing`].

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, warn};

use crate::align::MAX_PERIODS;
use crate::extract::period_source;
use crate::types::{ForecastPeriod, SplitSeries, StepCount};
use crate::units::Conversion;

/// Name of the day-over-day difference column.
pub const DIFF_COLUMN: &str = "diff";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOptions {
    /// Keep every n-th row; 0 is treated as 1.
    pub stride: usize,
    pub include_coords: bool,
    pub include_diff: bool,
    /// Drop rows whose value is NaN before decimating.
    pub drop_missing: bool,
    /// Display conversion applied to the value and diff columns.
    pub conversion: Option<Conversion>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            stride: 1,
            include_coords: true,
            include_diff: false,
            drop_missing: true,
            conversion: None,
        }
    }
}

/// Sampled rows of one period. All columns have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTable {
    pub period: usize,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Vec<f64>>,
    pub columns: BTreeMap<String, Vec<f32>>,
}

impl StationTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// Tables for every period that could be sampled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampledStations {
    pub field_name: String,
    pub tables: Vec<StationTable>,
    /// Periods that should have had a table but could not be sampled.
    pub missing: Vec<usize>,
}

impl SampledStations {
    /// True when no period produced a table; callers suppress the
    /// annotation layer.
    pub fn no_values(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, period: usize) -> Option<&StationTable> {
        self.tables.iter().find(|t| t.period == period)
    }
}

/// Sample every aligned period of `field_name`.
pub fn parse_nws_grib_data_array(
    series: &SplitSeries,
    steps: &StepCount,
    field_name: &str,
    options: &SampleOptions,
) -> SampledStations {
    let mut sampled = SampledStations {
        field_name: field_name.to_string(),
        ..Default::default()
    };
    let periods = 1..=steps.total_steps.min(MAX_PERIODS);

    if !series.is_empty() && !series.parameter().eq_ignore_ascii_case(field_name) {
        warn!(
            requested = field_name,
            available = series.parameter(),
            "no such field, skipping station sampling"
        );
        sampled.missing = periods.collect();
        return sampled;
    }

    for period in periods {
        let Some(current) = period_source(series, steps, period) else {
            if period < MAX_PERIODS {
                sampled.missing.push(period);
            }
            continue;
        };
        let previous = if options.include_diff && period > 1 {
            period_source(series, steps, period - 1)
        } else {
            None
        };

        match sample_period(period, current, previous, field_name, options) {
            Some(table) => sampled.tables.push(table),
            None => {
                warn!(field = field_name, period, "period grid not reconciled, omitting");
                sampled.missing.push(period);
            }
        }
    }

    debug!(
        field = field_name,
        tables = sampled.tables.len(),
        missing = ?sampled.missing,
        stride = options.stride,
        "sampled stations"
    );
    sampled
}

fn sample_period(
    period: usize,
    current: &ForecastPeriod,
    previous: Option<&ForecastPeriod>,
    field_name: &str,
    options: &SampleOptions,
) -> Option<StationTable> {
    let field = &current.field;
    let coords = &current.coords;
    if field.shape() != coords.shape() || coords.lat.len() != field.len() {
        return None;
    }
    if let Some(prev) = previous {
        if prev.field.shape() != field.shape() {
            return None;
        }
    }

    let convert = |v: f32| options.conversion.map_or(v, |c| c.apply(v));
    let stride = options.stride.max(1);

    let rows = (0..field.len())
        .filter(|&i| !(options.drop_missing && field.data[i].is_nan()))
        .step_by(stride);

    let mut longitude = Vec::new();
    let mut latitude = Vec::new();
    let mut values = Vec::new();
    let mut diffs = Vec::new();
    for i in rows {
        let value = convert(field.data[i]);
        values.push(value);
        if options.include_diff {
            let diff = previous.map_or(f32::NAN, |prev| value - convert(prev.field.data[i]));
            diffs.push(diff);
        }
        if options.include_coords {
            longitude.push(coords.lon[i]);
            latitude.push(coords.lat[i]);
        }
    }

    let mut columns = BTreeMap::new();
    columns.insert(field_name.to_string(), values);
    if options.include_diff {
        columns.insert(DIFF_COLUMN.to_string(), diffs);
    }

    Some(StationTable {
        period,
        start: current.start,
        end: current.end,
        longitude: options.include_coords.then_some(longitude),
        latitude: options.include_coords.then_some(latitude),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::StepAligner;
    use crate::time::DayHalf;
    use crate::types::{Grid2D, Series, SeriesKind};
    use crate::units::Unit;
    use chrono::{Duration, TimeZone};
    use projection::GridCoords;
    use std::sync::Arc;

    fn split(days: usize, values: impl Fn(usize) -> Vec<f32>) -> SplitSeries {
        let coords = Arc::new(GridCoords {
            width: 2,
            height: 2,
            lat: vec![61.0, 61.0, 60.0, 60.0],
            lon: vec![-150.0, -149.0, -150.0, -149.0],
        });
        let base = FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 6, 0, 0)
            .unwrap();
        let periods: Vec<ForecastPeriod> = (0..days)
            .map(|d| {
                let start = base + Duration::days(d as i64);
                ForecastPeriod::new(
                    start,
                    start + Duration::hours(12),
                    "MINRH",
                    Grid2D::new(2, 2, values(d)).unwrap(),
                    coords.clone(),
                )
                .unwrap()
            })
            .collect();
        let extended = periods[3.min(days)..].to_vec();
        let short = periods[..3.min(days)].to_vec();
        SplitSeries {
            short: Series::new(SeriesKind::Short, "MINRH", short),
            extended: Series::new(SeriesKind::Extended, "MINRH", extended),
            discarded: 0,
        }
    }

    fn steps(series: &SplitSeries) -> StepCount {
        StepAligner::new(DayHalf::Day)
            .ndfd_step_count(&series.short, &series.extended)
            .unwrap()
    }

    #[test]
    fn test_one_table_per_period() {
        let series = split(7, |d| vec![d as f32; 4]);
        let sampled = parse_nws_grib_data_array(
            &series,
            &steps(&series),
            "MINRH",
            &SampleOptions::default(),
        );
        assert_eq!(sampled.tables.len(), 7);
        assert!(sampled.missing.is_empty());
        let table = sampled.get(3).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.column("MINRH").unwrap(), &[2.0; 4]);
        assert_eq!(table.latitude.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_stride_and_missing_rows() {
        let series = split(6, |_| vec![1.0, f32::NAN, 3.0, 4.0]);
        let options = SampleOptions {
            stride: 2,
            ..Default::default()
        };
        let sampled = parse_nws_grib_data_array(&series, &steps(&series), "MINRH", &options);
        let table = sampled.get(1).unwrap();
        // NaN dropped first, then every second of [1, 3, 4]
        assert_eq!(table.column("MINRH").unwrap(), &[1.0, 4.0]);
        assert_eq!(table.longitude.as_ref().unwrap(), &vec![-150.0, -149.0]);
        assert!(sampled.get(7).is_none());
        assert!(sampled.missing.is_empty());
    }

    #[test]
    fn test_diff_column() {
        let series = split(7, |d| vec![10.0 + d as f32; 4]);
        let options = SampleOptions {
            include_diff: true,
            include_coords: false,
            ..Default::default()
        };
        let sampled = parse_nws_grib_data_array(&series, &steps(&series), "MINRH", &options);
        assert!(sampled.get(1).unwrap().column(DIFF_COLUMN).unwrap()[0].is_nan());
        assert_eq!(sampled.get(5).unwrap().column(DIFF_COLUMN).unwrap(), &[1.0; 4]);
        assert!(sampled.get(5).unwrap().longitude.is_none());
    }

    #[test]
    fn test_conversion_applied() {
        let mut series = split(6, |_| vec![273.15; 4]);
        series.short.parameter = "TMAX".into();
        series.extended.parameter = "TMAX".into();
        let options = SampleOptions {
            conversion: Some(Conversion::new(Unit::Kelvin, Unit::Fahrenheit).unwrap()),
            ..Default::default()
        };
        let sampled = parse_nws_grib_data_array(&series, &steps(&series), "TMAX", &options);
        let value = sampled.get(2).unwrap().column("TMAX").unwrap()[0];
        assert!((value - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_unreconciled_period_fails_soft() {
        let mut series = split(7, |d| vec![d as f32; 4]);
        let steps = steps(&series);
        series.extended.periods[1].field = Grid2D::filled(3, 1, 0.0);
        let sampled = parse_nws_grib_data_array(&series, &steps, "MINRH", &SampleOptions::default());
        assert_eq!(sampled.tables.len(), 6);
        assert_eq!(sampled.missing, vec![5]);
        assert!(!sampled.no_values());
    }

    #[test]
    fn test_unknown_field_has_no_values() {
        let series = split(7, |d| vec![d as f32; 4]);
        let sampled =
            parse_nws_grib_data_array(&series, &steps(&series), "WIND", &SampleOptions::default());
        assert!(sampled.no_values());
        assert_eq!(sampled.missing.len(), 7);
    }
}
