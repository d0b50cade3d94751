//! PeriodExtractor: one field per logical forecast period.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use projection::GridCoords;

use crate::align::MAX_PERIODS;
use crate::error::{ForecastError, Result};
use crate::types::{ForecastPeriod, Grid2D, SeriesKind, SplitSeries, StepCount};

/// The field of one logical period.
///
/// Raw fields borrow the decoded grid; difference fields are owned.
#[derive(Debug, Clone)]
pub struct PeriodField<'a> {
    /// 1-based logical period number.
    pub period: usize,
    pub source: SeriesKind,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub field: Cow<'a, Grid2D>,
    pub coords: Arc<GridCoords>,
}

/// Up to seven period fields; unavailable periods are `None`.
#[derive(Debug, Clone)]
pub struct PeriodFields<'a> {
    pub field_name: String,
    pub diff: bool,
    slots: [Option<PeriodField<'a>>; MAX_PERIODS],
}

impl<'a> PeriodFields<'a> {
    fn empty(field_name: &str, diff: bool) -> Self {
        Self {
            field_name: field_name.to_string(),
            diff,
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Field of a 1-based period.
    pub fn get(&self, period: usize) -> Option<&PeriodField<'a>> {
        period
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// Periods with a field, in order.
    pub fn available(&self) -> impl Iterator<Item = &PeriodField<'a>> {
        self.slots.iter().flatten()
    }

    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    pub fn period_7(&self) -> Option<&PeriodField<'a>> {
        self.get(MAX_PERIODS)
    }
}

/// Resolve the decoded period behind a logical period number.
pub fn period_source<'a>(
    series: &'a SplitSeries,
    steps: &StepCount,
    period: usize,
) -> Option<&'a ForecastPeriod> {
    if period > steps.total_steps {
        return None;
    }
    let slot = steps.index.get(period)?;
    series.series(slot.source).get(slot.offset)
}

/// Fields of every available period of `field_name`.
///
/// With `diff` each slot n >= 2 holds `field(n) - field(n-1)` and slot 1
/// is empty. Values stay in native units.
pub fn find_ds_vals<'a>(
    series: &'a SplitSeries,
    steps: &StepCount,
    field_name: &str,
    diff: bool,
) -> Result<PeriodFields<'a>> {
    let mut fields = PeriodFields::empty(field_name, diff);
    if steps.total_steps == 0 || series.is_empty() {
        return Ok(fields);
    }

    if !series.parameter().eq_ignore_ascii_case(field_name) {
        return Err(ForecastError::UnknownField {
            requested: field_name.to_string(),
            available: series.parameter().to_string(),
        });
    }

    for period in 1..=steps.total_steps.min(MAX_PERIODS) {
        let Some(current) = period_source(series, steps, period) else {
            if period == MAX_PERIODS {
                break;
            }
            return Err(ForecastError::InsufficientPeriods {
                available: period - 1,
            });
        };
        let source = steps
            .index
            .get(period)
            .map(|slot| slot.source)
            .unwrap_or(SeriesKind::Short);

        let field = if diff {
            if period == 1 {
                continue;
            }
            let Some(previous) = period_source(series, steps, period - 1) else {
                continue;
            };
            if previous.field.shape() != current.field.shape() {
                return Err(ForecastError::grid_mismatch(
                    previous.field.shape(),
                    current.field.shape(),
                    format!("{} period {} vs {}", field_name, period, period - 1),
                ));
            }
            Cow::Owned(current.field.difference(&previous.field)?)
        } else {
            Cow::Borrowed(&current.field)
        };

        fields.slots[period - 1] = Some(PeriodField {
            period,
            source,
            start: current.start,
            end: current.end,
            field,
            coords: current.coords.clone(),
        });
    }

    Ok(fields)
}
