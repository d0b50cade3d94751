//! Native-to-display unit conversion.
//!
//! NDFD grids arrive in SI units (Kelvin, m/s) and percent; maps and hazard
//! thresholds use °F, mph and percent. Conversions are stateless and never
//! applied implicitly by the extractor.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::types::Grid2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kelvin,
    Celsius,
    Fahrenheit,
    /// Relative humidity as 0-1.
    Fraction,
    Percent,
    MetersPerSecond,
    Mph,
    Knots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Temperature,
    Humidity,
    Speed,
}

impl Unit {
    fn dimension(self) -> Dimension {
        match self {
            Unit::Kelvin | Unit::Celsius | Unit::Fahrenheit => Dimension::Temperature,
            Unit::Fraction | Unit::Percent => Dimension::Humidity,
            Unit::MetersPerSecond | Unit::Mph | Unit::Knots => Dimension::Speed,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kelvin => "K",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Fraction => "1",
            Unit::Percent => "%",
            Unit::MetersPerSecond => "m/s",
            Unit::Mph => "mph",
            Unit::Knots => "kt",
        }
    }

    /// Convert one value to `to`; NaN stays NaN.
    ///
    /// Returns `None` when the units measure different quantities.
    pub fn convert(self, to: Unit, value: f32) -> Option<f32> {
        if self.dimension() != to.dimension() {
            return None;
        }
        if self == to {
            return Some(value);
        }
        let base = self.to_base(value);
        Some(to.from_base(base))
    }

    // Base units: Kelvin, percent, m/s
    fn to_base(self, v: f32) -> f32 {
        match self {
            Unit::Kelvin | Unit::Percent | Unit::MetersPerSecond => v,
            Unit::Celsius => v + 273.15,
            Unit::Fahrenheit => (v - 32.0) * 5.0 / 9.0 + 273.15,
            Unit::Fraction => v * 100.0,
            Unit::Mph => v / MPH_PER_MS,
            Unit::Knots => v / KNOTS_PER_MS,
        }
    }

    fn from_base(self, v: f32) -> f32 {
        match self {
            Unit::Kelvin | Unit::Percent | Unit::MetersPerSecond => v,
            Unit::Celsius => v - 273.15,
            Unit::Fahrenheit => (v - 273.15) * 9.0 / 5.0 + 32.0,
            Unit::Fraction => v / 100.0,
            Unit::Mph => v * MPH_PER_MS,
            Unit::Knots => v * KNOTS_PER_MS,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

const MPH_PER_MS: f32 = 2.236_936;
const KNOTS_PER_MS: f32 = 1.943_844;

/// A native -> display unit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: Unit,
    pub to: Unit,
}

impl Conversion {
    pub fn new(from: Unit, to: Unit) -> Result<Self> {
        if from.convert(to, 0.0).is_none() {
            return Err(ForecastError::config(format!(
                "cannot convert {} to {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn apply(&self, value: f32) -> f32 {
        self.from.convert(self.to, value).unwrap_or(value)
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

/// Convert a whole grid, returning a new one.
pub fn convert_grid(grid: &Grid2D, conversion: Conversion) -> Grid2D {
    if conversion.is_identity() {
        return grid.clone();
    }
    grid.map(|v| conversion.apply(v))
}
