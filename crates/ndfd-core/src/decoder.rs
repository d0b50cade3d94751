//! GridDecoder: raw product bytes to an ordered list of forecast periods.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use grib2_parser::{Grib2Message, Grib2Reader, Grib2Tables, GridDefinition, GridGeometry};
use projection::{grid_coordinates, GridKind, GridSpec, ProjectionError};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::error::{ForecastError, Result};
use crate::products::RawProduct;
use crate::time::LocalZone;
use crate::types::{ForecastPeriod, Grid2D};

/// Decodes NDFD GRIB2 files into [`ForecastPeriod`]s in local time.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    tables: Arc<Grib2Tables>,
    zone: LocalZone,
}

/// A message with its UTC validity window resolved.
struct Timed {
    message: Grib2Message,
    start: DateTime<Utc>,
    interval_end: Option<DateTime<Utc>>,
}

impl GridDecoder {
    pub fn new(tables: Arc<Grib2Tables>, zone: LocalZone) -> Self {
        Self { tables, zone }
    }

    /// Decoder with the NDFD parameter tables.
    pub fn ndfd(zone: LocalZone) -> Self {
        Self::new(Arc::new(Grib2Tables::ndfd()), zone)
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Decode every period of the product's parameter, ordered by start.
    ///
    /// Messages that fail to parse or unpack are logged and skipped; only a
    /// product with no decodable period at all is an error.
    #[instrument(skip(self, raw), fields(product = %raw.code, horizon = ?raw.horizon, bytes = raw.bytes.len()))]
    pub fn decode(&self, raw: &RawProduct) -> Result<Vec<ForecastPeriod>> {
        let parameter = raw.code.parameter();
        let mut reader = Grib2Reader::new(raw.bytes.clone(), self.tables.clone());

        let mut messages = Vec::new();
        let mut last_error = None;
        loop {
            match reader.next_message() {
                Ok(Some(message)) if message.parameter() == parameter => messages.push(message),
                Ok(Some(message)) => {
                    debug!(found = %message.parameter(), "skipping message for another parameter");
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, decoded = messages.len(), "dropping unreadable GRIB2 message");
                    last_error = Some(e.to_string());
                }
            }
        }

        let timed = order_messages(messages);
        let timed = keep_common_grid(timed);
        let Some(first) = timed.first() else {
            return Err(ForecastError::decode(
                raw.code.to_string(),
                last_error.unwrap_or_else(|| format!("no {} messages found", parameter)),
            ));
        };

        let coords = Arc::new(grid_coordinates(&grid_spec(&first.message.grid_definition)?)?);
        let windows = validity_windows(&timed);

        let unpacked: Vec<_> = timed
            .par_iter()
            .map(|t| t.message.unpack_data())
            .collect();

        let mut periods = Vec::with_capacity(timed.len());
        for ((t, (start, end)), values) in timed.iter().zip(windows).zip(unpacked) {
            let values = match values {
                Ok(values) => values,
                Err(e) => {
                    warn!(start = %start, error = %e, "dropping message that failed to unpack");
                    continue;
                }
            };
            let (rows, cols) = t.message.grid_dims();
            let period = Grid2D::new(cols, rows, values).and_then(|field| {
                ForecastPeriod::new(
                    self.zone.to_local(start),
                    self.zone.to_local(end),
                    parameter,
                    field,
                    coords.clone(),
                )
            });
            match period {
                Ok(period) => periods.push(period),
                Err(e) => warn!(start = %start, error = %e, "dropping invalid period"),
            }
        }

        if periods.is_empty() {
            return Err(ForecastError::decode(
                raw.code.to_string(),
                "no message could be unpacked",
            ));
        }

        info!(
            periods = periods.len(),
            first = %periods[0].start,
            last = %periods[periods.len() - 1].start,
            "decoded product"
        );
        Ok(periods)
    }

    /// Decode several files of one product (e.g. both horizons) into one
    /// ordered list. Files that fail to decode are skipped while at least
    /// one succeeds.
    pub fn decode_all(&self, raws: &[RawProduct]) -> Result<Vec<ForecastPeriod>> {
        let mut periods: Vec<ForecastPeriod> = Vec::new();
        let mut first_error = None;

        for raw in raws {
            match self.decode(raw) {
                Ok(decoded) => periods.extend(decoded),
                Err(e) => {
                    warn!(product = %raw.code, horizon = ?raw.horizon, error = %e, "skipping undecodable file");
                    first_error.get_or_insert(e);
                }
            }
        }

        if periods.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                ForecastError::decode("products", "no raw products supplied")
            }));
        }

        periods.sort_by_key(|p| p.start);
        periods.dedup_by_key(|p| p.start);

        // Share one coordinate grid across files
        let shared = periods[0].coords.clone();
        periods.retain_mut(|p| {
            if Arc::ptr_eq(&p.coords, &shared) {
                return true;
            }
            if *p.coords == *shared {
                p.coords = shared.clone();
                true
            } else {
                warn!(start = %p.start, "dropping period on a different grid");
                false
            }
        });

        Ok(periods)
    }
}

/// Resolve start times, sort, and keep the first message of each start.
fn order_messages(messages: Vec<Grib2Message>) -> Vec<Timed> {
    let mut timed: Vec<Timed> = messages
        .into_iter()
        .filter_map(|message| match message.valid_start() {
            Some(start) => Some(Timed {
                interval_end: message.valid_end(),
                start,
                message,
            }),
            None => {
                warn!(
                    time_unit = message.product_definition.time_unit,
                    "dropping message with an unknown forecast time unit"
                );
                None
            }
        })
        .collect();

    timed.sort_by_key(|t| t.start);
    timed.dedup_by_key(|t| t.start);
    timed
}

/// Drop messages whose grid shape differs from the first one.
fn keep_common_grid(timed: Vec<Timed>) -> Vec<Timed> {
    let Some(dims) = timed.first().map(|t| t.message.grid_dims()) else {
        return timed;
    };
    timed
        .into_iter()
        .filter(|t| {
            let keep = t.message.grid_dims() == dims;
            if !keep {
                warn!(
                    expected = ?dims,
                    actual = ?t.message.grid_dims(),
                    start = %t.start,
                    "dropping message on a different grid"
                );
            }
            keep
        })
        .collect()
}

/// Start and end of each message's validity.
///
/// Statistically processed products carry their own interval end. Others
/// end where the next message starts; the last reuses the previous spacing
/// and a lone message is valid for one hour.
fn validity_windows(timed: &[Timed]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let fallback_spacing = |i: usize| -> Duration {
        if i > 0 {
            timed[i].start - timed[i - 1].start
        } else {
            Duration::hours(1)
        }
    };

    (0..timed.len())
        .map(|i| {
            let start = timed[i].start;
            let end = match timed[i].interval_end {
                Some(end) if end > start => end,
                _ => match timed.get(i + 1) {
                    Some(next) => next.start,
                    None => start + fallback_spacing(i),
                },
            };
            (start, end)
        })
        .collect()
}

/// Grid geometry in the form the projection crate expects.
fn grid_spec(grid: &GridDefinition) -> std::result::Result<GridSpec, ProjectionError> {
    let kind = match grid.geometry {
        GridGeometry::LatLon {
            la1, lo1, di, dj, ..
        } => GridKind::LatLon { la1, lo1, di, dj },
        GridGeometry::PolarStereographic {
            la1,
            lo1,
            lad,
            lov,
            dx_m,
            dy_m,
            south_pole,
        } => GridKind::PolarStereographic {
            la1,
            lo1,
            lad,
            lov,
            dx_m,
            dy_m,
            earth_radius_m: grid.earth_radius_m,
            south_pole,
        },
        GridGeometry::Unsupported { template } => {
            return Err(ProjectionError::Unsupported(format!(
                "grid definition template 3.{}",
                template
            )))
        }
    };

    Ok(GridSpec {
        nx: grid.nx as usize,
        ny: grid.ny as usize,
        scanning_mode: grid.scanning_mode,
        kind,
    })
}
