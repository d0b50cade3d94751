//! CadenceSplitter: short-range vs extended-range series.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ForecastPeriod, Series, SeriesKind, SplitSeries};

/// Where the short-range series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Periods starting within this many hours of the first start are short-range.
    AfterHours(i64),
    /// Cut at the first widening of the start spacing.
    CadenceChange,
}

impl Default for SplitRule {
    fn default() -> Self {
        Self::AfterHours(DEFAULT_SPLIT_HOURS)
    }
}

/// Days 1-3.
pub const DEFAULT_SPLIT_HOURS: i64 = 72;

#[derive(Debug, Clone, Default)]
pub struct CadenceSplitter {
    rule: SplitRule,
    now: Option<DateTime<FixedOffset>>,
}

impl CadenceSplitter {
    pub fn new(rule: SplitRule) -> Self {
        Self { rule, now: None }
    }

    /// Discard periods that have already ended at `now`.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    /// Split an ordered period list. Never fails; empty input gives two
    /// empty series.
    pub fn split(&self, periods: Vec<ForecastPeriod>) -> SplitSeries {
        let parameter = periods
            .first()
            .map(|p| p.parameter.clone())
            .unwrap_or_default();

        let before = periods.len();
        let periods: Vec<ForecastPeriod> = match self.now {
            Some(now) => periods.into_iter().filter(|p| p.end > now).collect(),
            None => periods,
        };
        let discarded = before - periods.len();

        let cut = self.cut_index(&periods);
        let mut short = periods;
        let extended = short.split_off(cut);

        debug!(
            parameter = %parameter,
            short = short.len(),
            extended = extended.len(),
            discarded,
            "split series"
        );

        SplitSeries {
            short: Series::new(SeriesKind::Short, parameter.clone(), short),
            extended: Series::new(SeriesKind::Extended, parameter, extended),
            discarded,
        }
    }

    /// Index of the first extended-range period.
    fn cut_index(&self, periods: &[ForecastPeriod]) -> usize {
        match self.rule {
            SplitRule::AfterHours(hours) => horizon_cut(periods, hours),
            SplitRule::CadenceChange => cadence_cut(periods)
                .unwrap_or_else(|| horizon_cut(periods, DEFAULT_SPLIT_HOURS)),
        }
    }
}

fn horizon_cut(periods: &[ForecastPeriod], hours: i64) -> usize {
    let Some(first) = periods.first() else {
        return 0;
    };
    let limit = first.start + Duration::hours(hours);
    periods
        .iter()
        .position(|p| p.start >= limit)
        .unwrap_or(periods.len())
}

fn cadence_cut(periods: &[ForecastPeriod]) -> Option<usize> {
    let spacings: Vec<Duration> = periods
        .windows(2)
        .map(|pair| pair[1].start - pair[0].start)
        .collect();
    if spacings.is_empty() {
        return None;
    }

    // A short first gap comes from a cycle starting mid-period
    let (base, from) = if spacings.len() >= 2 && spacings[0] < spacings[1] {
        (spacings[1], 1)
    } else {
        (spacings[0], 0)
    };

    spacings
        .iter()
        .enumerate()
        .skip(from + 1)
        .find(|(_, spacing)| **spacing > base)
        .map(|(k, _)| k + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Grid2D;
    use chrono::TimeZone;
    use projection::GridCoords;
    use std::sync::Arc;

    fn base() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 6, 0, 0)
            .unwrap()
    }

    fn periods(starts: &[i64], length: i64) -> Vec<ForecastPeriod> {
        let coords = Arc::new(GridCoords {
            width: 1,
            height: 1,
            lat: vec![60.0],
            lon: vec![-150.0],
        });
        starts
            .iter()
            .map(|&h| {
                let start = base() + Duration::hours(h);
                ForecastPeriod::new(
                    start,
                    start + Duration::hours(length),
                    "TMAX",
                    Grid2D::filled(1, 1, h as f32),
                    coords.clone(),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_split_after_72_hours() {
        let split = CadenceSplitter::default().split(periods(&[0, 24, 48, 72, 96, 120, 144], 12));
        assert_eq!(split.short_count(), 3);
        assert_eq!(split.extended_count(), 4);
        assert_eq!(split.discarded, 0);
        assert_eq!(split.parameter(), "TMAX");
    }

    #[test]
    fn test_empty_input() {
        let split = CadenceSplitter::default().split(Vec::new());
        assert!(split.is_empty());
        assert_eq!(split.short_count(), 0);
        assert_eq!(split.extended_count(), 0);
    }

    #[test]
    fn test_cadence_change() {
        let starts = [0, 3, 6, 9, 12, 24, 36];
        let split = CadenceSplitter::new(SplitRule::CadenceChange).split(periods(&starts, 3));
        assert_eq!(split.short_count(), 5);
        assert_eq!(split.extended_count(), 2);
    }

    #[test]
    fn test_cadence_change_ignores_short_first_gap() {
        let starts = [0, 1, 4, 7, 19, 31];
        let split = CadenceSplitter::new(SplitRule::CadenceChange).split(periods(&starts, 3));
        assert_eq!(split.short_count(), 4);
    }

    #[test]
    fn test_cadence_change_falls_back_to_horizon() {
        let starts = [0, 24, 48, 72, 96];
        let split = CadenceSplitter::new(SplitRule::CadenceChange).split(periods(&starts, 12));
        assert_eq!(split.short_count(), 3);
        assert_eq!(split.extended_count(), 2);
    }

    #[test]
    fn test_stale_periods_discarded() {
        let now = base() + Duration::hours(13);
        let split = CadenceSplitter::default()
            .with_now(now)
            .split(periods(&[0, 24, 48, 72], 12));
        assert_eq!(split.discarded, 1);
        assert_eq!(split.short.periods[0].field.data[0], 24.0);
        // Horizon counts from the first remaining period
        assert_eq!(split.short_count(), 3);
    }
}
