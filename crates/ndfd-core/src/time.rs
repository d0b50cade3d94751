//! Local-time handling.
//!
//! Valid times are converted from UTC exactly once, in the decoder. Every
//! other component works with the resulting `DateTime<FixedOffset>` values.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Zone used to convert embedded UTC valid times to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// Whatever zone the host is configured with.
    #[default]
    Host,
    Named(Tz),
}

impl LocalZone {
    /// Parse "host"/"local" or an IANA zone name such as "America/Anchorage".
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "" | "host" | "local" => Ok(Self::Host),
            _ => name
                .trim()
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|e| ForecastError::config(format!("unknown timezone '{}': {}", name, e))),
        }
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Host => fix(utc.with_timezone(&Local)),
            Self::Named(tz) => fix(utc.with_timezone(tz)),
        }
    }

    /// Current time in this zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.to_local(Utc::now())
    }
}

impl std::fmt::Display for LocalZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

fn fix<Z: TimeZone>(dt: DateTime<Z>) -> DateTime<FixedOffset> {
    let offset = dt.offset().fix();
    dt.with_timezone(&offset)
}

/// Day ([06, 18) local) or night half of a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayHalf {
    Day,
    Night,
}

impl DayHalf {
    pub const DAY_START_HOUR: u32 = 6;
    pub const NIGHT_START_HOUR: u32 = 18;

    /// Half of the day a local time falls in.
    pub fn of<Z: TimeZone>(time: &DateTime<Z>) -> Self {
        let hour = time.hour();
        if (Self::DAY_START_HOUR..Self::NIGHT_START_HOUR).contains(&hour) {
            Self::Day
        } else {
            Self::Night
        }
    }

    pub fn contains<Z: TimeZone>(self, time: &DateTime<Z>) -> bool {
        Self::of(time) == self
    }

    /// Local date of the forecast day a time belongs to. A forecast day
    /// runs from 06:00 to 06:00 the next morning, so its night half spans
    /// midnight.
    pub fn forecast_day<Z: TimeZone>(time: &DateTime<Z>) -> NaiveDate {
        (time.naive_local() - Duration::hours(i64::from(Self::DAY_START_HOUR))).date()
    }

    /// Minutes between a local time of day and the middle of this half
    /// (noon for the day, midnight for the night).
    pub fn minutes_from_middle<Z: TimeZone>(self, time: &DateTime<Z>) -> u32 {
        let minutes = time.hour() * 60 + time.minute();
        match self {
            Self::Day => minutes.abs_diff(12 * 60),
            Self::Night => minutes.min(24 * 60 - minutes),
        }
    }
}

/// Human-readable local start/end strings for titling a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTitle {
    pub start: String,
    pub end: String,
}

impl PeriodTitle {
    const FORMAT: &'static str = "%a %b %-d, %Y %-I:%M %p";

    pub fn new(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> Self {
        Self {
            start: start.format(Self::FORMAT).to_string(),
            end: end.format(Self::FORMAT).to_string(),
        }
    }
}

impl std::fmt::Display for PeriodTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Start: {}\nEnd: {}", self.start, self.end)
    }
}
