//! Message-by-message reader over a GRIB2 buffer.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::sections::{
    self, Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition,
};
use crate::tables::Grib2Tables;
use crate::unpacking::unpack_simple;
use crate::{Grib2Error, Result};

/// One decoded GRIB2 message (a single field on a single grid).
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
    /// Complete message bytes, kept for codecs we delegate to `grib`.
    pub raw: Bytes,
}

impl Grib2Message {
    /// Parameter short name (e.g. "TMAX").
    pub fn parameter(&self) -> &str {
        &self.product_definition.parameter_short_name
    }

    /// Grid dimensions as (rows, columns).
    pub fn grid_dims(&self) -> (usize, usize) {
        self.grid_definition.dims()
    }

    /// Start of the valid period: reference time plus forecast offset.
    pub fn valid_start(&self) -> Option<DateTime<Utc>> {
        self.product_definition
            .forecast_offset()
            .map(|offset| self.identification.reference_time + offset)
    }

    /// End of the statistical interval, for template 4.8 products.
    pub fn valid_end(&self) -> Option<DateTime<Utc>> {
        self.product_definition
            .interval
            .as_ref()
            .map(|interval| interval.end)
    }

    /// Unpack the field into row-major values; missing points are NaN.
    pub fn unpack_data(&self) -> Result<Vec<f32>> {
        let (rows, cols) = self.grid_dims();
        let expected = rows * cols;

        let values = match self.data_representation.template {
            0 => unpack_simple(
                &self.data_section.data,
                expected as u32,
                self.data_representation.bits_per_value,
                self.data_representation.reference_value,
                self.data_representation.binary_scale_factor,
                self.data_representation.decimal_scale_factor,
                self.bitmap.as_ref().map(|bm| bm.data.as_ref()),
            )?
            .into_iter()
            .map(|v| v.unwrap_or(f32::NAN))
            .collect(),
            template => {
                trace!(template, "delegating unpacking to the grib crate");
                unpack_with_grib_crate(&self.raw)?
            }
        };

        if values.len() != expected {
            return Err(Grib2Error::UnpackingError(format!(
                "expected {} values for a {}x{} grid, got {}",
                expected,
                cols,
                rows,
                values.len()
            )));
        }

        Ok(values)
    }
}

fn unpack_with_grib_crate(raw: &Bytes) -> Result<Vec<f32>> {
    let grib2 = grib::from_reader(Cursor::new(raw.clone())).map_err(|e| {
        Grib2Error::UnpackingError(format!("grib crate could not read message: {}", e))
    })?;

    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| Grib2Error::UnpackingError("message has no submessages".to_string()))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("failed to create decoder: {}", e)))?;
    let values = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("failed to decode values: {}", e)))?;

    Ok(values.collect())
}

/// Sequential reader over the messages of a GRIB2 buffer.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
    tables: Arc<Grib2Tables>,
}

impl Grib2Reader {
    pub fn new(data: Bytes, tables: Arc<Grib2Tables>) -> Self {
        Self {
            data,
            offset: 0,
            tables,
        }
    }

    /// Total size of the underlying buffer in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Parse the next message.
    ///
    /// Returns `Ok(None)` once no further "GRIB" marker exists. A truncated
    /// message is an error and ends the iteration.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        let Some(start) = find_magic(&self.data, self.offset) else {
            self.offset = self.data.len();
            return Ok(None);
        };

        let indicator = match sections::parse_indicator(&self.data[start..]) {
            Ok(indicator) => indicator,
            Err(e) => {
                // Skip past this marker so the next call can resync
                self.offset = start + 4;
                return Err(e);
            }
        };

        let length = indicator.message_length as usize;
        let available = self.data.len() - start;
        if length < 16 || length > available {
            self.offset = self.data.len();
            return Err(Grib2Error::Truncated {
                offset: start,
                needed: length,
                available,
            });
        }

        let raw = self.data.slice(start..start + length);
        self.offset = start + length;

        let message = parse_message(indicator, raw, &self.tables)?;
        debug!(
            offset = start,
            parameter = %message.parameter(),
            forecast_time = message.product_definition.forecast_time,
            "parsed GRIB2 message"
        );
        Ok(Some(message))
    }

    /// Drain every remaining message, stopping at the first error.
    ///
    /// The messages read before the error are returned alongside it.
    pub fn read_all(&mut self) -> (Vec<Grib2Message>, Option<Grib2Error>) {
        let mut messages = Vec::new();
        loop {
            match self.next_message() {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return (messages, None),
                Err(e) => return (messages, Some(e)),
            }
        }
    }
}

fn parse_message(indicator: Indicator, raw: Bytes, tables: &Grib2Tables) -> Result<Grib2Message> {
    let identification = sections::parse_identification(&raw)?;
    let grid_definition = sections::parse_grid_definition(&raw)?;
    let product_definition =
        sections::parse_product_definition(&raw, indicator.discipline, tables)?;
    let data_representation = sections::parse_data_representation(&raw)?;
    let bitmap = sections::parse_bitmap(&raw)?;
    let data_section = sections::parse_data_section(&raw)?;

    Ok(Grib2Message {
        indicator,
        identification,
        grid_definition,
        product_definition,
        data_representation,
        bitmap,
        data_section,
        raw,
    })
}

fn find_magic(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(4)
        .position(|window| window == b"GRIB")
        .map(|pos| from + pos)
}
