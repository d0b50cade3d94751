//! HazardMaskBuilder: the hot-dry-windy composite.
//!
//! A cell is hazardous when it is hot, dry and windy at once:
//! `wind >= wind_mph && rh <= rh_pct && temp >= temp_f`.
//! Thresholds are in display units (°F, %, mph).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::types::{Grid2D, HazardMask};
use crate::units::{convert_grid, Conversion, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardThresholds {
    pub temp_f: f32,
    pub rh_pct: f32,
    pub wind_mph: f32,
}

/// Fuel state a threshold set applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardProfile {
    PreGreenup,
    PostGreenup,
}

impl HazardProfile {
    pub const ALL: [HazardProfile; 2] = [HazardProfile::PreGreenup, HazardProfile::PostGreenup];

    pub fn default_thresholds(self) -> HazardThresholds {
        match self {
            Self::PreGreenup => HazardThresholds {
                temp_f: 60.0,
                rh_pct: 25.0,
                wind_mph: 15.0,
            },
            Self::PostGreenup => HazardThresholds {
                temp_f: 75.0,
                rh_pct: 25.0,
                wind_mph: 15.0,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PreGreenup => "pre_greenup",
            Self::PostGreenup => "post_greenup",
        }
    }
}

/// Mask of one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMask {
    pub profile: HazardProfile,
    pub thresholds: HazardThresholds,
    pub mask: HazardMask,
}

/// Combine three co-registered grids already in display units.
pub fn build_mask(
    temp: &Grid2D,
    rh: &Grid2D,
    wind: &Grid2D,
    thresholds: &HazardThresholds,
) -> Result<HazardMask> {
    check_shape(temp, rh, "relative humidity")?;
    check_shape(temp, wind, "wind")?;

    // NaN fails every comparison, so missing points are never flagged
    let cells = temp
        .data
        .iter()
        .zip(&rh.data)
        .zip(&wind.data)
        .map(|((&t, &h), &w)| {
            w >= thresholds.wind_mph && h <= thresholds.rh_pct && t >= thresholds.temp_f
        })
        .collect();

    Ok(HazardMask {
        width: temp.width,
        height: temp.height,
        cells,
    })
}

fn check_shape(temp: &Grid2D, other: &Grid2D, name: &str) -> Result<()> {
    if temp.shape() != other.shape() {
        return Err(ForecastError::grid_mismatch(
            temp.shape(),
            other.shape(),
            format!("hazard temperature vs {}", name),
        ));
    }
    Ok(())
}

/// Evaluate every profile against the same triple.
pub fn build_profile_masks(
    temp: &Grid2D,
    rh: &Grid2D,
    wind: &Grid2D,
    profiles: &[(HazardProfile, HazardThresholds)],
) -> Result<Vec<ProfileMask>> {
    profiles
        .iter()
        .map(|&(profile, thresholds)| {
            let mask = build_mask(temp, rh, wind, &thresholds)?;
            debug!(profile = profile.name(), flagged = mask.count(), "hazard mask");
            Ok(ProfileMask {
                profile,
                thresholds,
                mask,
            })
        })
        .collect()
}

/// Native-unit fields of the three hazard inputs.
#[derive(Debug, Clone, Copy)]
pub struct NativeInputs<'a> {
    pub temp: (&'a Grid2D, Unit),
    pub rh: (&'a Grid2D, Unit),
    pub wind: (&'a Grid2D, Unit),
}

/// Convert each input to display units, then evaluate every profile.
pub fn build_display_mask(
    inputs: NativeInputs<'_>,
    profiles: &[(HazardProfile, HazardThresholds)],
) -> Result<Vec<ProfileMask>> {
    let temp = to_display(inputs.temp, Unit::Fahrenheit)?;
    let rh = to_display(inputs.rh, Unit::Percent)?;
    let wind = to_display(inputs.wind, Unit::Mph)?;
    build_profile_masks(&temp, &rh, &wind, profiles)
}

fn to_display((grid, unit): (&Grid2D, Unit), display: Unit) -> Result<Grid2D> {
    let conversion = Conversion::new(unit, display)?;
    Ok(convert_grid(grid, conversion))
}
