//! Core types for forecast assembly.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use projection::GridCoords;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// A 2-D field in row-major order; NaN marks missing points.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Grid2D {
    /// Create a grid, checking that `data` holds `width * height` values.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(ForecastError::grid_mismatch(
                (height, width),
                (data.len() / width.max(1), width),
                "grid data length",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Apply `f` to every value.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Elementwise `self - other`.
    pub fn difference(&self, other: &Grid2D) -> Result<Grid2D> {
        if self.shape() != other.shape() {
            return Err(ForecastError::grid_mismatch(
                self.shape(),
                other.shape(),
                "period difference",
            ));
        }
        Ok(Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }

    /// Min/max/mean over the non-NaN values.
    pub fn stats(&self) -> FieldStats {
        let mut stats = FieldStats::default();
        let mut sum = 0.0f64;
        for &v in &self.data {
            if v.is_nan() {
                stats.missing += 1;
                continue;
            }
            stats.min = Some(stats.min.map_or(v, |m: f32| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m: f32| m.max(v)));
            sum += v as f64;
            stats.valid += 1;
        }
        if stats.valid > 0 {
            stats.mean = Some((sum / stats.valid as f64) as f32);
        }
        stats
    }
}

/// Summary statistics of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldStats {
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f32>,
    pub valid: usize,
    pub missing: usize,
}

/// One forecast interval (a day or a night) of one parameter.
#[derive(Debug, Clone)]
pub struct ForecastPeriod {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// GRIB2 parameter short name, e.g. "TMAX".
    pub parameter: String,
    pub field: Grid2D,
    pub coords: Arc<GridCoords>,
}

impl ForecastPeriod {
    /// Create a period, checking `start < end` and that field and
    /// coordinates share a shape.
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        parameter: impl Into<String>,
        field: Grid2D,
        coords: Arc<GridCoords>,
    ) -> Result<Self> {
        let parameter = parameter.into();
        if start >= end {
            return Err(ForecastError::decode(
                parameter,
                format!("period start {} is not before end {}", start, end),
            ));
        }
        if field.shape() != coords.shape() {
            return Err(ForecastError::grid_mismatch(
                coords.shape(),
                field.shape(),
                format!("{} field vs coordinates", parameter),
            ));
        }
        Ok(Self {
            start,
            end,
            parameter,
            field,
            coords,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Which of the two cadence series a period comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Short,
    Extended,
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

/// Periods of one cadence, strictly increasing by start.
#[derive(Debug, Clone)]
pub struct Series {
    pub kind: SeriesKind,
    pub parameter: String,
    pub periods: Vec<ForecastPeriod>,
}

impl Series {
    pub fn new(kind: SeriesKind, parameter: impl Into<String>, periods: Vec<ForecastPeriod>) -> Self {
        Self {
            kind,
            parameter: parameter.into(),
            periods,
        }
    }

    pub fn empty(kind: SeriesKind, parameter: impl Into<String>) -> Self {
        Self::new(kind, parameter, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<&ForecastPeriod> {
        self.periods.get(offset)
    }

    /// Most common spacing between consecutive starts (ties go to the
    /// shorter spacing). A single period reports its own duration.
    pub fn modal_spacing(&self) -> Option<Duration> {
        match self.periods.len() {
            0 => None,
            1 => Some(self.periods[0].duration()),
            _ => {
                let mut counts: Vec<(Duration, usize)> = Vec::new();
                for pair in self.periods.windows(2) {
                    let spacing = pair[1].start - pair[0].start;
                    match counts.iter_mut().find(|(s, _)| *s == spacing) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((spacing, 1)),
                    }
                }
                counts
                    .into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                    .map(|(spacing, _)| spacing)
            }
        }
    }
}

/// A decoded product split into its two cadence series.
#[derive(Debug, Clone)]
pub struct SplitSeries {
    pub short: Series,
    pub extended: Series,
    /// Periods dropped because they had already ended.
    pub discarded: usize,
}

impl SplitSeries {
    pub fn short_count(&self) -> usize {
        self.short.len()
    }

    pub fn extended_count(&self) -> usize {
        self.extended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short.is_empty() && self.extended.is_empty()
    }

    /// Parameter of the series, empty when nothing was decoded.
    pub fn parameter(&self) -> &str {
        if !self.short.parameter.is_empty() {
            &self.short.parameter
        } else {
            &self.extended.parameter
        }
    }

    pub fn series(&self, kind: SeriesKind) -> &Series {
        match kind {
            SeriesKind::Short => &self.short,
            SeriesKind::Extended => &self.extended,
        }
    }
}

/// Where one logical forecast period comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodSlot {
    /// 1-based logical period number.
    pub period: usize,
    pub source: SeriesKind,
    /// Index into the source series.
    pub offset: usize,
}

/// Ordered map from logical period number to its source.
///
/// Holds up to seven slots, numbered from 1 without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodIndex {
    slots: Vec<PeriodSlot>,
}

impl PeriodIndex {
    pub fn new(slots: Vec<PeriodSlot>) -> Self {
        Self { slots }
    }

    pub fn get(&self, period: usize) -> Option<&PeriodSlot> {
        self.slots.iter().find(|slot| slot.period == period)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodSlot> {
        self.slots.iter()
    }
}

/// Result of step alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCount {
    /// Logical periods obtainable, at most 7. A complete forecast has 6 or
    /// 7; fewer means the products are incomplete.
    pub total_steps: usize,
    pub short_steps: usize,
    pub extended_steps: usize,
    /// Which half of a paired extended record is used, when paired.
    pub time_index: Option<usize>,
    pub index: PeriodIndex,
}

impl StepCount {
    pub fn empty() -> Self {
        Self {
            total_steps: 0,
            short_steps: 0,
            extended_steps: 0,
            time_index: None,
            index: PeriodIndex::default(),
        }
    }

    pub fn has_period_7(&self) -> bool {
        self.total_steps >= 7
    }
}

/// Boolean grid marking where every hazard condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardMask {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<bool>,
}

impl HazardMask {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Number of cells flagged.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn all(&self) -> bool {
        self.cells.iter().all(|&c| c)
    }

    pub fn none(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }
}
