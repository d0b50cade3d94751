//! NDFD product catalogue.
//!
//! Each product is one `ds.*.bin` file per forecast horizon on the NWS
//! telecommunications gateway, e.g.
//! `https://tgftp.nws.noaa.gov/SL.us008001/ST.opnl/DF.gr2/DC.ndfd/AR.alaska/VP.001-003/ds.maxt.bin`.

use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::time::DayHalf;
use crate::units::Unit;

/// Base URL of the NDFD Alaska sector.
pub const NDFD_ALASKA_BASE_URL: &str =
    "https://tgftp.nws.noaa.gov/SL.us008001/ST.opnl/DF.gr2/DC.ndfd/AR.alaska";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCode {
    MaxTemperature,
    MinTemperature,
    Temperature,
    MaxRelativeHumidity,
    MinRelativeHumidity,
    RelativeHumidity,
    WindSpeed,
    WindGust,
}

impl ProductCode {
    pub const ALL: [ProductCode; 8] = [
        ProductCode::MaxTemperature,
        ProductCode::MinTemperature,
        ProductCode::Temperature,
        ProductCode::MaxRelativeHumidity,
        ProductCode::MinRelativeHumidity,
        ProductCode::RelativeHumidity,
        ProductCode::WindSpeed,
        ProductCode::WindGust,
    ];

    /// File name on the NDFD server.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::MaxTemperature => "ds.maxt.bin",
            Self::MinTemperature => "ds.mint.bin",
            Self::Temperature => "ds.temp.bin",
            Self::MaxRelativeHumidity => "ds.maxrh.bin",
            Self::MinRelativeHumidity => "ds.minrh.bin",
            Self::RelativeHumidity => "ds.rhm.bin",
            Self::WindSpeed => "ds.wspd.bin",
            Self::WindGust => "ds.wgust.bin",
        }
    }

    /// GRIB2 parameter short name the product's messages carry.
    pub fn parameter(self) -> &'static str {
        match self {
            Self::MaxTemperature => "TMAX",
            Self::MinTemperature => "TMIN",
            Self::Temperature => "TMP",
            Self::MaxRelativeHumidity => "MAXRH",
            Self::MinRelativeHumidity => "MINRH",
            Self::RelativeHumidity => "RH",
            Self::WindSpeed => "WIND",
            Self::WindGust => "GUST",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MaxTemperature => "max temperature",
            Self::MinTemperature => "min temperature",
            Self::Temperature => "temperature",
            Self::MaxRelativeHumidity => "max relative humidity",
            Self::MinRelativeHumidity => "min relative humidity",
            Self::RelativeHumidity => "relative humidity",
            Self::WindSpeed => "sustained wind",
            Self::WindGust => "wind gust",
        }
    }

    pub fn native_unit(self) -> Unit {
        match self {
            Self::MaxTemperature | Self::MinTemperature | Self::Temperature => Unit::Kelvin,
            Self::MaxRelativeHumidity | Self::MinRelativeHumidity | Self::RelativeHumidity => {
                Unit::Percent
            }
            Self::WindSpeed | Self::WindGust => Unit::MetersPerSecond,
        }
    }

    pub fn display_unit(self) -> Unit {
        match self.native_unit() {
            Unit::Kelvin | Unit::Celsius | Unit::Fahrenheit => Unit::Fahrenheit,
            Unit::Fraction | Unit::Percent => Unit::Percent,
            Unit::MetersPerSecond | Unit::Mph | Unit::Knots => Unit::Mph,
        }
    }

    /// Half of the day whose periods the product reports: maxima of
    /// temperature and minima of humidity are daytime values.
    pub fn preferred_half(self) -> DayHalf {
        match self {
            Self::MinTemperature | Self::MaxRelativeHumidity => DayHalf::Night,
            _ => DayHalf::Day,
        }
    }

    /// Look up a product by its GRIB2 parameter short name.
    pub fn from_parameter(parameter: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.parameter().eq_ignore_ascii_case(parameter))
    }

    /// URL of the product file for a horizon under `base_url`.
    pub fn url(self, base_url: &str, horizon: Horizon) -> Option<String> {
        horizon.directory().map(|dir| {
            format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                dir,
                self.file_name()
            )
        })
    }
}

impl std::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ProductCode {
    type Err = ForecastError;

    /// Accepts the label ("max temperature"), the parameter ("TMAX"), the
    /// file stem ("maxt") or the snake_case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|code| {
                let stem = code
                    .file_name()
                    .trim_start_matches("ds.")
                    .trim_end_matches(".bin");
                needle == code.label()
                    || needle == code.parameter().to_lowercase()
                    || needle == stem
                    || needle == code.label().replace(' ', "_")
                    || needle == snake_name(*code)
            })
            .ok_or_else(|| ForecastError::config(format!("unknown product '{}'", s)))
    }
}

fn snake_name(code: ProductCode) -> &'static str {
    match code {
        ProductCode::MaxTemperature => "max_temperature",
        ProductCode::MinTemperature => "min_temperature",
        ProductCode::Temperature => "temperature",
        ProductCode::MaxRelativeHumidity => "max_relative_humidity",
        ProductCode::MinRelativeHumidity => "min_relative_humidity",
        ProductCode::RelativeHumidity => "relative_humidity",
        ProductCode::WindSpeed => "wind_speed",
        ProductCode::WindGust => "wind_gust",
    }
}

/// Forecast horizon directory a file was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    /// Days 1-3 (`VP.001-003`).
    Short,
    /// Days 4-7 (`VP.004-007`).
    Extended,
    Unknown,
}

impl Horizon {
    pub fn directory(self) -> Option<&'static str> {
        match self {
            Self::Short => Some("VP.001-003"),
            Self::Extended => Some("VP.004-007"),
            Self::Unknown => None,
        }
    }
}

/// Raw bytes of one downloaded product file.
#[derive(Debug, Clone)]
pub struct RawProduct {
    pub code: ProductCode,
    pub horizon: Horizon,
    pub bytes: Bytes,
}

impl RawProduct {
    pub fn new(code: ProductCode, horizon: Horizon, bytes: impl Into<Bytes>) -> Self {
        Self {
            code,
            horizon,
            bytes: bytes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_url() {
        assert_eq!(
            ProductCode::MaxTemperature
                .url(NDFD_ALASKA_BASE_URL, Horizon::Short)
                .unwrap(),
            "https://tgftp.nws.noaa.gov/SL.us008001/ST.opnl/DF.gr2/DC.ndfd/AR.alaska/VP.001-003/ds.maxt.bin"
        );
        assert!(ProductCode::WindGust
            .url("http://x/", Horizon::Extended)
            .unwrap()
            .ends_with("x/VP.004-007/ds.wgust.bin"));
        assert_eq!(ProductCode::WindGust.url("http://x", Horizon::Unknown), None);
    }

    #[test]
    fn test_product_from_str() {
        assert_eq!("maxt".parse::<ProductCode>().unwrap(), ProductCode::MaxTemperature);
        assert_eq!("TMIN".parse::<ProductCode>().unwrap(), ProductCode::MinTemperature);
        assert_eq!(
            "min relative humidity".parse::<ProductCode>().unwrap(),
            ProductCode::MinRelativeHumidity
        );
        assert_eq!("wind_speed".parse::<ProductCode>().unwrap(), ProductCode::WindSpeed);
        assert_eq!("wgust".parse::<ProductCode>().unwrap(), ProductCode::WindGust);
        assert!("snowfall".parse::<ProductCode>().is_err());
    }

    #[test]
    fn test_from_parameter() {
        assert_eq!(ProductCode::from_parameter("MINRH"), Some(ProductCode::MinRelativeHumidity));
        assert_eq!(ProductCode::from_parameter("APCP"), None);
    }

    #[test]
    fn test_units_and_halves() {
        assert_eq!(ProductCode::MaxTemperature.display_unit(), Unit::Fahrenheit);
        assert_eq!(ProductCode::WindGust.display_unit(), Unit::Mph);
        assert_eq!(ProductCode::MinTemperature.preferred_half(), DayHalf::Night);
        assert_eq!(ProductCode::MinRelativeHumidity.preferred_half(), DayHalf::Day);
    }
}
