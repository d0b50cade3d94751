//! GRIB2 section parsing.
//!
//! Each function takes the bytes of a single message (starting at the
//! "GRIB" magic) and returns the decoded section. Offsets in comments are
//! zero-based indices into the section, octet numbers in the WMO manual are
//! one-based.

use crate::tables::Grib2Tables;
use crate::{Grib2Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Mean earth radius used by NCEP when the message does not say otherwise.
const DEFAULT_EARTH_RADIUS_M: f64 = 6_371_229.0;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub magic: [u8; 4],
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Projection-specific part of the grid definition.
#[derive(Debug, Clone, PartialEq)]
pub enum GridGeometry {
    /// Template 3.0: regular latitude/longitude grid. Degrees.
    LatLon {
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        di: f64,
        dj: f64,
    },
    /// Template 3.20: polar stereographic grid (NDFD Alaska).
    PolarStereographic {
        la1: f64,
        lo1: f64,
        /// Latitude where the grid spacing is true.
        lad: f64,
        /// Orientation longitude.
        lov: f64,
        dx_m: f64,
        dy_m: f64,
        south_pole: bool,
    },
    /// Any other template; dimensions are still known.
    Unsupported { template: u16 },
}

/// Section 3: Grid Definition Section
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub num_data_points: u32,
    /// Points along a parallel / the x axis (Ni or Nx).
    pub nx: u32,
    /// Points along a meridian / the y axis (Nj or Ny).
    pub ny: u32,
    pub earth_shape: u8,
    pub earth_radius_m: f64,
    pub scanning_mode: u8,
    pub geometry: GridGeometry,
}

impl GridDefinition {
    /// Grid dimensions as (rows, columns).
    pub fn dims(&self) -> (usize, usize) {
        (self.ny as usize, self.nx as usize)
    }
}

/// End of the statistical-processing interval (product template 4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalInterval {
    pub end: DateTime<Utc>,
    /// Code table 4.10 (0 = average, 2 = maximum, 3 = minimum, ...).
    pub process: u8,
    pub length_unit: u8,
    pub length: u32,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub generating_process: u8,
    /// Code table 4.4 unit of `forecast_time`.
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_value: u32,
    pub level_description: String,
    pub interval: Option<StatisticalInterval>,
}

impl ProductDefinition {
    /// Offset of the forecast (or interval start) from the reference time.
    pub fn forecast_offset(&self) -> Option<Duration> {
        time_unit_duration(self.time_unit, self.forecast_time)
    }
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octet 7: discipline, octet 8: edition, octets 9-16: total length
    let discipline = data[6];
    let edition = data[7];

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    Ok(Indicator {
        magic: [data[0], data[1], data[2], data[3]],
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification), located right after Section 0.
pub fn parse_identification(data: &[u8]) -> Result<Identification> {
    const OFFSET: usize = 16;

    if data.len() < OFFSET + 21 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "Not enough data".to_string(),
        });
    }

    if data[OFFSET + 4] != 1 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: format!("expected section 1, found {}", data[OFFSET + 4]),
        });
    }

    // Skip section length (4 bytes) and section number (1 byte)
    let sec = &data[OFFSET + 5..];

    let center = u16::from_be_bytes([sec[0], sec[1]]);
    let sub_center = u16::from_be_bytes([sec[2], sec[3]]);
    let table_version = sec[4];
    let local_table_version = sec[5];
    let significance_of_reference_time = sec[6];
    let reference_time = read_datetime(&sec[7..14], 1)?;
    let production_status = sec[14];
    let data_type = sec[15];

    Ok(Identification {
        center,
        sub_center,
        table_version,
        local_table_version,
        significance_of_reference_time,
        reference_time,
        production_status,
        data_type,
    })
}

/// Parse Section 3 (Grid Definition)
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition> {
    let section_offset = find_section(data, 3)?;
    let sec = declared_section(data, section_offset);

    if sec.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("section length {} is below 14", sec.len()),
        });
    }

    // 0-3 length, 4 number, 5 source, 6-9 number of points,
    // 10-11 optional list, 12-13 template number, 14+ template data
    let num_data_points = u32::from_be_bytes([sec[6], sec[7], sec[8], sec[9]]);
    let template = u16::from_be_bytes([sec[12], sec[13]]);
    let gd = &sec[14..];

    if gd.len() < 24 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("template data too short ({} bytes)", gd.len()),
        });
    }

    // Octets 15-30 describe the shape of the earth for every template we read
    let earth_shape = gd[0];
    let earth_radius_m = earth_radius(earth_shape, gd[1], read_u32(&gd[2..6]));
    let nx = read_u32(&gd[16..20]);
    let ny = read_u32(&gd[20..24]);

    let (geometry, scanning_mode) = match template {
        0 => {
            // 24-27 basic angle, 28-31 subdivisions, 32-35 La1, 36-39 Lo1,
            // 40 flags, 41-44 La2, 45-48 Lo2, 49-52 Di, 53-56 Dj, 57 scanning
            require_len(gd, 58, 3, template)?;
            let geometry = GridGeometry::LatLon {
                la1: micro_degrees(decode_grib2_signed(&gd[32..36])),
                lo1: micro_degrees(decode_grib2_signed(&gd[36..40])),
                la2: micro_degrees(decode_grib2_signed(&gd[41..45])),
                lo2: micro_degrees(decode_grib2_signed(&gd[45..49])),
                di: micro_degrees(read_u32(&gd[49..53]) as i32),
                dj: micro_degrees(read_u32(&gd[53..57]) as i32),
            };
            (geometry, gd[57])
        }
        20 => {
            // 24-27 La1, 28-31 Lo1, 32 flags, 33-36 LaD, 37-40 LoV,
            // 41-44 Dx (mm), 45-48 Dy (mm), 49 projection centre, 50 scanning
            require_len(gd, 51, 3, template)?;
            let geometry = GridGeometry::PolarStereographic {
                la1: micro_degrees(decode_grib2_signed(&gd[24..28])),
                lo1: micro_degrees(decode_grib2_signed(&gd[28..32])),
                lad: micro_degrees(decode_grib2_signed(&gd[33..37])),
                lov: micro_degrees(decode_grib2_signed(&gd[37..41])),
                dx_m: read_u32(&gd[41..45]) as f64 / 1000.0,
                dy_m: read_u32(&gd[45..49]) as f64 / 1000.0,
                south_pole: gd[49] & 0x80 != 0,
            };
            (geometry, gd[50])
        }
        other => (GridGeometry::Unsupported { template: other }, 0),
    };

    Ok(GridDefinition {
        template,
        num_data_points,
        nx,
        ny,
        earth_shape,
        earth_radius_m,
        scanning_mode,
        geometry,
    })
}

/// Parse Section 4 (Product Definition)
pub fn parse_product_definition(
    data: &[u8],
    discipline: u8,
    tables: &Grib2Tables,
) -> Result<ProductDefinition> {
    let section_offset = find_section(data, 4)?;
    let sec = declared_section(data, section_offset);

    if sec.len() < 34 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "Not enough data".to_string(),
        });
    }

    // 5-6 coordinate values, 7-8 template, 9 category, 10 number,
    // 11 generating process, 17 time unit, 18-21 forecast time,
    // 22 first surface type, 23 scale factor, 24-27 scaled value
    let template = u16::from_be_bytes([sec[7], sec[8]]);
    if template != 0 && template != 8 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 4,
            template,
        });
    }

    let parameter_category = sec[9];
    let parameter_number = sec[10];
    let generating_process = sec[11];
    let time_unit = sec[17];
    let forecast_time = read_u32(&sec[18..22]);
    let level_type = sec[22];
    let level_value = read_u32(&sec[24..28]);

    let interval = if template == 8 {
        // 34-40 end of overall interval, 41 number of ranges,
        // 42-45 missing values, 46 process, 47 increment type,
        // 48 range unit, 49-52 range length
        if sec.len() < 53 {
            return Err(Grib2Error::InvalidSection {
                section: 4,
                reason: format!("template 4.8 needs 53 bytes, got {}", sec.len()),
            });
        }
        Some(StatisticalInterval {
            end: read_datetime(&sec[34..41], 4)?,
            process: sec[46],
            length_unit: sec[48],
            length: read_u32(&sec[49..53]),
        })
    } else {
        None
    };

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        parameter_short_name: tables.get_parameter_name(
            discipline,
            parameter_category,
            parameter_number,
        ),
        generating_process,
        time_unit,
        forecast_time,
        level_type,
        level_value,
        level_description: tables.get_level_description(level_type, level_value),
        interval,
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation> {
    let section_offset = find_section(data, 5)?;
    let sec = declared_section(data, section_offset);

    if sec.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "Not enough data".to_string(),
        });
    }

    // 5-8 number of points, 9-10 template, then the template 5.0 header
    // shared by simple and complex packing: 11-14 R, 15-16 E, 17-18 D,
    // 19 bits per value, 20 original type
    Ok(DataRepresentation {
        num_data_points: read_u32(&sec[5..9]),
        template: u16::from_be_bytes([sec[9], sec[10]]),
        reference_value: f32::from_be_bytes([sec[11], sec[12], sec[13], sec[14]]),
        binary_scale_factor: decode_grib2_signed_i16(&sec[15..17]),
        decimal_scale_factor: decode_grib2_signed_i16(&sec[17..19]),
        bits_per_value: sec[19],
        original_data_type: sec[20],
    })
}

/// Parse Section 6 (Bitmap). `None` means every point carries a value.
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bitmap>> {
    let section_offset = find_section(data, 6)?;
    let sec = declared_section(data, section_offset);

    if sec.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("section length {} is below 6", sec.len()),
        });
    }

    match sec[5] {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            indicator: 0,
            data: Bytes::copy_from_slice(&sec[6..]),
        })),
        other => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("predefined bitmap {} is not supported", other),
        }),
    }
}

/// Parse Section 7 (Data)
pub fn parse_data_section(data: &[u8]) -> Result<DataSection> {
    let section_offset = find_section(data, 7)?;
    let sec = &data[section_offset..];

    if sec.len() < 5 {
        return Err(Grib2Error::InvalidSection {
            section: 7,
            reason: "Not enough data".to_string(),
        });
    }

    let length = section_length(sec);
    Ok(DataSection {
        data: Bytes::copy_from_slice(&sec[5..length]),
    })
}

// ===== Helper Functions =====

/// Decode a 4-byte GRIB2 sign-magnitude integer.
///
/// GRIB2 stores negative numbers with the high bit as sign flag, not in
/// two's complement. Any other length decodes to 0.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    if bytes.len() != 4 {
        return 0;
    }
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 2-byte GRIB2 sign-magnitude integer (scale factors).
pub fn decode_grib2_signed_i16(bytes: &[u8]) -> i16 {
    if bytes.len() != 2 {
        return 0;
    }
    let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Convert a value in code table 4.4 units into a duration.
pub fn time_unit_duration(unit: u8, value: u32) -> Option<Duration> {
    let value = value as i64;
    match unit {
        0 => Some(Duration::minutes(value)),
        1 => Some(Duration::hours(value)),
        2 => Some(Duration::days(value)),
        10 => Some(Duration::hours(3 * value)),
        11 => Some(Duration::hours(6 * value)),
        12 => Some(Duration::hours(12 * value)),
        13 => Some(Duration::seconds(value)),
        _ => None,
    }
}

/// Find a section by number within a message
fn find_section(data: &[u8], section_num: u8) -> Result<usize> {
    let mut offset = 16; // After Section 0

    loop {
        if offset + 5 > data.len() || &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }

        let length = read_u32(&data[offset..offset + 4]) as usize;
        if length < 5 || offset + length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += length;
    }
}

/// The section at `offset`, cut to its declared length.
fn declared_section(data: &[u8], offset: usize) -> &[u8] {
    let sec = &data[offset..];
    &sec[..section_length(sec)]
}

/// Declared length of the section starting at `sec`, clamped to the slice.
fn section_length(sec: &[u8]) -> usize {
    if sec.len() < 4 {
        return sec.len();
    }
    (read_u32(&sec[0..4]) as usize).min(sec.len())
}

fn require_len(gd: &[u8], needed: usize, section: u8, template: u16) -> Result<()> {
    if gd.len() < needed {
        return Err(Grib2Error::InvalidSection {
            section,
            reason: format!(
                "template {} needs at least {} bytes, got {}",
                template,
                needed,
                gd.len()
            ),
        });
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a year(2)/month/day/hour/minute/second block.
fn read_datetime(bytes: &[u8], section: u8) -> Result<DateTime<Utc>> {
    let year = u16::from_be_bytes([bytes[0], bytes[1]]);
    let (month, day, hour, minute, second) = (bytes[2], bytes[3], bytes[4], bytes[5], bytes[6]);

    let naive = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

fn micro_degrees(value: i32) -> f64 {
    value as f64 / 1_000_000.0
}

/// Earth radius in metres for code table 3.2; ellipsoids use the sphere.
fn earth_radius(shape: u8, scale_factor: u8, scaled_value: u32) -> f64 {
    match shape {
        0 => 6_367_470.0,
        1 if scaled_value > 0 => scaled_value as f64 / 10f64.powi(scale_factor as i32),
        6 => DEFAULT_EARTH_RADIUS_M,
        8 => 6_371_200.0,
        _ => DEFAULT_EARTH_RADIUS_M,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_duration() {
        assert_eq!(time_unit_duration(1, 6), Some(Duration::hours(6)));
        assert_eq!(time_unit_duration(0, 90), Some(Duration::minutes(90)));
        assert_eq!(time_unit_duration(2, 1), Some(Duration::days(1)));
        assert_eq!(time_unit_duration(12, 2), Some(Duration::hours(24)));
        assert_eq!(time_unit_duration(99, 1), None);
    }

    #[test]
    fn test_signed_i16() {
        assert_eq!(decode_grib2_signed_i16(&[0x00, 0x05]), 5);
        assert_eq!(decode_grib2_signed_i16(&[0x80, 0x05]), -5);
        assert_eq!(decode_grib2_signed_i16(&[0x80]), 0);
    }

    #[test]
    fn test_earth_radius() {
        assert_eq!(earth_radius(1, 0, 6_371_200), 6_371_200.0);
        assert_eq!(earth_radius(1, 1, 63_712_000), 6_371_200.0);
        assert_eq!(earth_radius(6, 0, 0), DEFAULT_EARTH_RADIUS_M);
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(b"GRIB");
        data[7] = 1;
        assert!(parse_indicator(&data).is_err());
    }
}
