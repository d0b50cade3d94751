//! StepAligner: how many periods come from each series, and which ones.
//!
//! A full forecast has seven logical periods, one per forecast day (six
//! when the last day is not yet published). Each series is reduced to one
//! entry per forecast day in the product's day half:
//!
//! - daily series map 1:1;
//! - 12-hourly day/night pairs keep every second entry, starting at
//!   `time_index`;
//! - shorter cadences (3 or 6 hourly) keep, per forecast day, the entry in
//!   the wanted half that starts closest to its middle.
//!
//! Extended entries for a day the short series already covers are dropped.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::time::DayHalf;
use crate::types::{PeriodIndex, PeriodSlot, Series, SeriesKind, StepCount};

/// Number of logical periods in a complete forecast.
pub const MAX_PERIODS: usize = 7;
/// Fewest periods a complete forecast has.
pub const MIN_PERIODS: usize = 6;

#[derive(Debug, Clone)]
pub struct StepAligner {
    half: DayHalf,
    now: Option<DateTime<FixedOffset>>,
}

impl StepAligner {
    /// Aligner for a product reporting `half` periods.
    pub fn new(half: DayHalf) -> Self {
        Self { half, now: None }
    }

    /// Reference time for breaking ties on an irregular first extended entry.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    /// Count steps and build the period index.
    ///
    /// Fewer than six periods is not an error: the index simply holds what
    /// is available.
    #[instrument(skip_all, fields(short = short.len(), extended = extended.len()))]
    pub fn ndfd_step_count(&self, short: &Series, extended: &Series) -> Result<StepCount> {
        if short.is_empty() && extended.is_empty() {
            return Ok(StepCount::empty());
        }

        let (mut short_offsets, _) = self.logical_offsets(short);
        short_offsets.truncate(MAX_PERIODS);
        let short_steps = short_offsets.len();

        let (mut extended_offsets, time_index) = self.logical_offsets(extended);
        let last_short_day = short_offsets
            .last()
            .and_then(|&offset| short.get(offset))
            .map(|p| DayHalf::forecast_day(&p.start));
        if let Some(last) = last_short_day {
            extended_offsets.retain(|&offset| {
                extended
                    .get(offset)
                    .is_some_and(|p| DayHalf::forecast_day(&p.start) > last)
            });
        }
        extended_offsets.truncate(MAX_PERIODS - short_steps);
        let extended_steps = extended_offsets.len();

        let total_steps = short_steps + extended_steps;
        if total_steps < MIN_PERIODS {
            warn!(total_steps, "incomplete forecast, aligning the available periods");
        }

        let slots = short_offsets
            .into_iter()
            .map(|offset| (SeriesKind::Short, offset))
            .chain(
                extended_offsets
                    .into_iter()
                    .map(|offset| (SeriesKind::Extended, offset)),
            )
            .enumerate()
            .map(|(i, (source, offset))| PeriodSlot {
                period: i + 1,
                source,
                offset,
            })
            .collect();

        debug!(total_steps, short_steps, extended_steps, ?time_index, "aligned steps");

        Ok(StepCount {
            total_steps,
            short_steps,
            extended_steps,
            time_index,
            index: PeriodIndex::new(slots),
        })
    }

    /// Offsets of the entries that stand for one forecast day each, plus the
    /// starting offset when the series is 12-hourly pairs.
    fn logical_offsets(&self, series: &Series) -> (Vec<usize>, Option<usize>) {
        let Some(spacing) = series.modal_spacing() else {
            return (Vec::new(), None);
        };

        if spacing == Duration::hours(12) {
            let first = self.time_index(series);
            ((first..series.len()).step_by(2).collect(), Some(first))
        } else if spacing < Duration::hours(12) {
            (self.one_per_day(series), None)
        } else {
            ((0..series.len()).collect(), None)
        }
    }

    /// Per forecast day, the entry in this half starting nearest its middle.
    fn one_per_day(&self, series: &Series) -> Vec<usize> {
        let mut chosen: Vec<(NaiveDate, usize, u32)> = Vec::new();
        for (offset, period) in series.periods.iter().enumerate() {
            if !self.half.contains(&period.start) {
                continue;
            }
            let day = DayHalf::forecast_day(&period.start);
            let distance = self.half.minutes_from_middle(&period.start);
            match chosen.last_mut() {
                Some(last) if last.0 == day => {
                    if distance < last.2 {
                        *last = (day, offset, distance);
                    }
                }
                _ => chosen.push((day, offset, distance)),
            }
        }
        chosen.into_iter().map(|(_, offset, _)| offset).collect()
    }

    /// Offset (0 or 1) of the first paired entry in this aligner's half.
    fn time_index(&self, series: &Series) -> usize {
        let first = &series.periods[0];
        let parity = if self.half.contains(&first.start) { 0 } else { 1 };

        if !first_is_irregular(series) {
            return parity;
        }
        let Some(now) = self.now else {
            return parity;
        };

        // Nearest start that is not before now
        series
            .periods
            .iter()
            .take(2)
            .enumerate()
            .filter(|(_, p)| p.start >= now)
            .min_by_key(|(_, p)| p.start - now)
            .map(|(i, _)| i)
            .unwrap_or(parity)
    }
}

fn first_is_irregular(series: &Series) -> bool {
    let Some(modal) = series.modal_spacing() else {
        return false;
    };
    let first = &series.periods[0];
    if first.duration() != modal {
        return true;
    }
    series
        .periods
        .get(1)
        .is_some_and(|second| second.start - first.start != modal)
}
