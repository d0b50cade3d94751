//! Synthetic NDFD GRIB2 messages.
//!
//! [`NdfdMessageBuilder`] writes the same section layout as the operational
//! Alaska files: polar stereographic grid (template 3.20), statistically
//! processed product (template 4.8) and simple packing with an optional
//! bitmap for missing points. The defaults describe a tiny 4x3 grid so
//! tests stay fast; [`NdfdMessageBuilder::alaska_grid`] switches to the
//! full-size geometry.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::fixtures::{alaska, time};

/// Builder for one GRIB2 message.
#[derive(Debug, Clone)]
pub struct NdfdMessageBuilder {
    center: u16,
    reference: NaiveDateTime,
    nx: u32,
    ny: u32,
    projection: Projection,
    scanning_mode: u8,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    /// Length of the statistical interval; `None` writes template 4.0.
    interval_hours: Option<u32>,
    /// Code table 4.10 statistical process.
    process: u8,
    decimal_scale: i16,
    data_values: Vec<f32>,
}

#[derive(Debug, Clone)]
enum Projection {
    PolarStereographic {
        la1: f64,
        lo1: f64,
        lad: f64,
        lov: f64,
        dx_m: f64,
    },
    LatLon {
        la1: f64,
        lo1: f64,
        la2: f64,
        lo2: f64,
        di: f64,
        dj: f64,
    },
}

impl NdfdMessageBuilder {
    /// Daytime maximum temperature (TMAX, 12 hour maximum) on a 4x3 grid.
    pub fn new_tmax() -> Self {
        let (nx, ny) = (4, 3);
        let (year, month, day, hour) = time::REFERENCE;
        let reference = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            .and_then(|d| d.and_hms_opt(hour as u32, 0, 0))
            .unwrap_or_default();
        Self {
            center: 8, // NWS telecommunications gateway
            reference,
            nx,
            ny,
            projection: Projection::PolarStereographic {
                la1: alaska::LA1,
                lo1: alaska::LO1,
                lad: alaska::LAD,
                lov: alaska::LOV,
                dx_m: alaska::DX_M,
            },
            scanning_mode: 0b0100_0000, // +i, +j, i consecutive
            param_category: 0,
            param_number: 4,
            level_type: 1,
            level_value: 0,
            forecast_hour: 0,
            interval_hours: Some(12),
            process: 2,
            decimal_scale: 1,
            data_values: vec![290.0; (nx * ny) as usize],
        }
    }

    /// Relative humidity (RH) at 2 m, instantaneous, on a 4x3 grid.
    pub fn new_rh() -> Self {
        Self::new_tmax()
            .with_parameter(1, 1)
            .with_level(103, 2)
            .instantaneous()
            .with_constant_value(50.0)
    }

    /// Wind speed (WIND) at 10 m, instantaneous, on a 4x3 grid.
    pub fn new_wind() -> Self {
        Self::new_tmax()
            .with_parameter(2, 1)
            .with_level(103, 10)
            .instantaneous()
            .with_constant_value(5.0)
    }

    /// Full 1649x1105 Alaska grid filled with a constant.
    pub fn alaska_grid(self) -> Self {
        let value = self.data_values.first().copied().unwrap_or(0.0);
        self.with_grid(alaska::NX, alaska::NY).with_constant_value(value)
    }

    pub fn with_reference_time(mut self, year: i32, month: u32, day: u32, hour: u32) -> Self {
        if let Some(reference) =
            NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, 0, 0))
        {
            self.reference = reference;
        }
        self
    }

    pub fn with_grid(mut self, nx: u32, ny: u32) -> Self {
        self.nx = nx;
        self.ny = ny;
        self.data_values = vec![0.0; (nx * ny) as usize];
        self
    }

    /// Switch to a regular lat/lon grid (template 3.0). Degrees.
    pub fn with_latlon_grid(mut self, la1: f64, lo1: f64, di: f64, dj: f64) -> Self {
        self.projection = Projection::LatLon {
            la1,
            lo1,
            la2: la1 - dj * (self.ny.saturating_sub(1)) as f64,
            lo2: lo1 + di * (self.nx.saturating_sub(1)) as f64,
            di,
            dj,
        };
        self.scanning_mode = 0;
        self
    }

    pub fn with_scanning_mode(mut self, mode: u8) -> Self {
        self.scanning_mode = mode;
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    /// Forecast hour of the period start.
    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_interval(mut self, hours: u32, process: u8) -> Self {
        self.interval_hours = Some(hours);
        self.process = process;
        self
    }

    /// Write product template 4.0 instead of 4.8.
    pub fn instantaneous(mut self) -> Self {
        self.interval_hours = None;
        self
    }

    pub fn with_decimal_scale(mut self, scale: i16) -> Self {
        self.decimal_scale = scale;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.nx * self.ny) as usize];
        self
    }

    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Build the complete message bytes.
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];

        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(0); // Meteorological discipline
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn present_values(&self) -> Vec<f32> {
        self.data_values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect()
    }

    fn has_missing(&self) -> bool {
        self.data_values.iter().any(|v| v.is_nan())
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Reference time is start of forecast
        push_datetime(&mut section, self.reference);
        section.push(0); // Operational
        section.push(1); // Forecast
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let (template, template_len): (u16, u32) = match self.projection {
            Projection::PolarStereographic { .. } => (20, 51),
            Projection::LatLon { .. } => (0, 58),
        };

        let mut section = Vec::new();
        section.extend_from_slice(&(14 + template_len).to_be_bytes());
        section.push(3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&(self.nx * self.ny).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&template.to_be_bytes());

        // Spherical earth with radius 6371200 m
        section.push(1);
        section.push(0);
        section.extend_from_slice(&(alaska::EARTH_RADIUS_M as u32).to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.nx.to_be_bytes());
        section.extend_from_slice(&self.ny.to_be_bytes());

        match self.projection {
            Projection::PolarStereographic {
                la1,
                lo1,
                lad,
                lov,
                dx_m,
            } => {
                section.extend_from_slice(&signed_micro(la1));
                section.extend_from_slice(&signed_micro(lo1));
                section.push(0b0000_1000); // Resolution and component flags
                section.extend_from_slice(&signed_micro(lad));
                section.extend_from_slice(&signed_micro(lov));
                let dx_mm = (dx_m * 1000.0).round() as u32;
                section.extend_from_slice(&dx_mm.to_be_bytes());
                section.extend_from_slice(&dx_mm.to_be_bytes());
                section.push(0); // North pole on projection plane
                section.push(self.scanning_mode);
            }
            Projection::LatLon {
                la1,
                lo1,
                la2,
                lo2,
                di,
                dj,
            } => {
                section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
                section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
                section.extend_from_slice(&signed_micro(la1));
                section.extend_from_slice(&signed_micro(lo1));
                section.push(48);
                section.extend_from_slice(&signed_micro(la2));
                section.extend_from_slice(&signed_micro(lo2));
                section.extend_from_slice(&((di * 1e6).round() as u32).to_be_bytes());
                section.extend_from_slice(&((dj * 1e6).round() as u32).to_be_bytes());
                section.push(self.scanning_mode);
            }
        }

        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let (template, length): (u16, u32) = match self.interval_hours {
            Some(_) => (8, 58),
            None => (0, 34),
        };

        let mut section = Vec::with_capacity(length as usize);
        section.extend_from_slice(&length.to_be_bytes());
        section.push(4);
        section.extend_from_slice(&0u16.to_be_bytes()); // Coordinate values
        section.extend_from_slice(&template.to_be_bytes());
        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // Forecast
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(1); // Hours
        section.extend_from_slice(&self.forecast_hour.to_be_bytes());
        section.push(self.level_type);
        section.push(0);
        section.extend_from_slice(&self.level_value.to_be_bytes());
        section.push(255);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        if let Some(hours) = self.interval_hours {
            let end = self.reference
                + Duration::hours(self.forecast_hour as i64)
                + Duration::hours(hours as i64);
            push_datetime(&mut section, end);
            section.push(1); // One time range
            section.extend_from_slice(&0u32.to_be_bytes()); // Missing values
            section.push(self.process);
            section.push(2); // Successive times, same reference
            section.push(1); // Hours
            section.extend_from_slice(&hours.to_be_bytes());
            section.push(1);
            section.extend_from_slice(&0u32.to_be_bytes());
        }

        section
    }

    fn packing(&self) -> (f32, i16, u8) {
        let present = self.present_values();
        let factor = 10f32.powi(self.decimal_scale as i32);
        let (min_val, max_val) = present.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &v| (min.min(v * factor), max.max(v * factor)),
        );
        if present.is_empty() {
            return (0.0, 0, 0);
        }

        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, 0, 0);
        }
        // value * 10^D = R + packed * 2^E with packed < 2^16
        let binary_scale = (range / 65535.0).log2().ceil() as i16;
        (min_val, binary_scale, 16)
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference_value, binary_scale, bits) = self.packing();
        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);
        section.extend_from_slice(&(self.present_values().len() as u32).to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Simple packing
        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&signed_i16(binary_scale));
        section.extend_from_slice(&signed_i16(self.decimal_scale));
        section.push(bits);
        section.push(0); // Floating point
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        if !self.has_missing() {
            let mut section = Vec::with_capacity(6);
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(255);
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, value) in self.data_values.iter().enumerate() {
            if !value.is_nan() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let mut section = Vec::with_capacity(6 + bitmap.len());
        section.extend_from_slice(&(6 + bitmap.len() as u32).to_be_bytes());
        section.push(6);
        section.push(0);
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let (reference_value, binary_scale, bits) = self.packing();
        let mut packed = Vec::new();
        if bits > 0 {
            let factor = 10f32.powi(self.decimal_scale as i32);
            let scale = 2f32.powi(binary_scale as i32);
            for value in self.present_values() {
                let p = ((value * factor - reference_value) / scale).round();
                packed.extend_from_slice(&(p.clamp(0.0, 65535.0) as u16).to_be_bytes());
            }
        }

        let mut section = Vec::with_capacity(5 + packed.len());
        section.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
        section.push(7);
        section.extend_from_slice(&packed);
        section
    }
}

/// Concatenate messages into one file body, the way NDFD bins are served.
pub fn concat_messages(messages: &[Vec<u8>]) -> Vec<u8> {
    messages.iter().flatten().copied().collect()
}

fn push_datetime(buf: &mut Vec<u8>, dt: NaiveDateTime) {
    use chrono::{Datelike, Timelike};
    buf.extend_from_slice(&(dt.year() as u16).to_be_bytes());
    buf.push(dt.month() as u8);
    buf.push(dt.day() as u8);
    buf.push(dt.hour() as u8);
    buf.push(dt.minute() as u8);
    buf.push(dt.second() as u8);
}

/// Degrees to a sign-magnitude micro-degree integer.
fn signed_micro(degrees: f64) -> [u8; 4] {
    let micro = (degrees * 1e6).round() as i64;
    let mut raw = micro.unsigned_abs() as u32 & 0x7FFF_FFFF;
    if micro < 0 {
        raw |= 0x8000_0000;
    }
    raw.to_be_bytes()
}

fn signed_i16(value: i16) -> [u8; 2] {
    let mut raw = value.unsigned_abs() & 0x7FFF;
    if value < 0 {
        raw |= 0x8000;
    }
    raw.to_be_bytes()
}
