//! Pipeline settings, resolved once.
//!
//! A [`PipelineConfig`] holds what a config file may say, [`Overrides`] what
//! a caller passed explicitly. [`ResolvedSettings::resolve`] combines them
//! with the built-in tables into a value every downstream stage reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cadence::SplitRule;
use crate::error::{ForecastError, Result};
use crate::hazard::{HazardProfile, HazardThresholds};
use crate::stations::SampleOptions;
use crate::time::LocalZone;

/// Boundary layers drawn under a map and their line widths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderSettings {
    pub states: bool,
    pub counties: bool,
    pub gacc: bool,
    pub psa: bool,
    pub cwa: bool,
    pub public_zones: bool,
    pub fire_zones: bool,
    pub state_linewidth: f32,
    pub county_linewidth: f32,
    pub gacc_linewidth: f32,
    pub psa_linewidth: f32,
    pub cwa_linewidth: f32,
    pub zone_linewidth: f32,
}

impl BorderSettings {
    const NONE: BorderSettings = BorderSettings {
        states: false,
        counties: false,
        gacc: false,
        psa: false,
        cwa: false,
        public_zones: false,
        fire_zones: false,
        state_linewidth: 1.0,
        county_linewidth: 0.25,
        gacc_linewidth: 1.0,
        psa_linewidth: 0.25,
        cwa_linewidth: 1.0,
        zone_linewidth: 0.25,
    };

    /// Names of the enabled layers.
    pub fn layers(&self) -> Vec<&'static str> {
        [
            (self.states, "states"),
            (self.counties, "counties"),
            (self.gacc, "gacc"),
            (self.psa, "psa"),
            (self.cwa, "cwa"),
            (self.public_zones, "public_zones"),
            (self.fire_zones, "fire_zones"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// Named boundary combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSystem {
    StatesOnly,
    StatesAndCounties,
    GaccOnly,
    GaccAndPsa,
    PsaOnly,
    CwaOnly,
    CwaAndPublicZones,
    CwaAndFireZones,
    CwaAndCounties,
}

/// Lookup table: reference system, display name, borders.
const REFERENCE_SYSTEMS: &[(ReferenceSystem, &str, BorderSettings)] = &[
    (
        ReferenceSystem::StatesOnly,
        "States Only",
        BorderSettings {
            states: true,
            state_linewidth: 1.5,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::StatesAndCounties,
        "States & Counties",
        BorderSettings {
            states: true,
            counties: true,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::GaccOnly,
        "GACC Only",
        BorderSettings {
            gacc: true,
            gacc_linewidth: 1.5,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::GaccAndPsa,
        "GACC & PSA",
        BorderSettings {
            gacc: true,
            psa: true,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::PsaOnly,
        "PSA Only",
        BorderSettings {
            psa: true,
            psa_linewidth: 0.5,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::CwaOnly,
        "CWA Only",
        BorderSettings {
            cwa: true,
            cwa_linewidth: 1.5,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::CwaAndPublicZones,
        "NWS CWAs & NWS Public Zones",
        BorderSettings {
            cwa: true,
            public_zones: true,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::CwaAndFireZones,
        "NWS CWAs & NWS Fire Weather Zones",
        BorderSettings {
            cwa: true,
            fire_zones: true,
            ..BorderSettings::NONE
        },
    ),
    (
        ReferenceSystem::CwaAndCounties,
        "NWS CWAs & Counties",
        BorderSettings {
            cwa: true,
            counties: true,
            ..BorderSettings::NONE
        },
    ),
];

impl ReferenceSystem {
    pub fn display_name(self) -> &'static str {
        REFERENCE_SYSTEMS
            .iter()
            .find(|(rs, _, _)| *rs == self)
            .map_or("", |(_, name, _)| *name)
    }

    pub fn borders(self) -> BorderSettings {
        REFERENCE_SYSTEMS
            .iter()
            .find(|(rs, _, _)| *rs == self)
            .map_or(BorderSettings::NONE, |(_, _, borders)| *borders)
    }

    /// Look up by display name ("States & Counties") or snake_case name.
    pub fn parse(name: &str) -> Result<Self> {
        let needle = name.trim();
        REFERENCE_SYSTEMS
            .iter()
            .find(|(rs, display, _)| {
                display.eq_ignore_ascii_case(needle) || snake_name(*rs) == needle
            })
            .map(|(rs, _, _)| *rs)
            .ok_or_else(|| ForecastError::config(format!("unknown reference system '{}'", name)))
    }
}

fn snake_name(rs: ReferenceSystem) -> &'static str {
    match rs {
        ReferenceSystem::StatesOnly => "states_only",
        ReferenceSystem::StatesAndCounties => "states_and_counties",
        ReferenceSystem::GaccOnly => "gacc_only",
        ReferenceSystem::GaccAndPsa => "gacc_and_psa",
        ReferenceSystem::PsaOnly => "psa_only",
        ReferenceSystem::CwaOnly => "cwa_only",
        ReferenceSystem::CwaAndPublicZones => "cwa_and_public_zones",
        ReferenceSystem::CwaAndFireZones => "cwa_and_fire_zones",
        ReferenceSystem::CwaAndCounties => "cwa_and_counties",
    }
}

/// Station sampling stride per map region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecimationTable(BTreeMap<String, usize>);

impl Default for DecimationTable {
    fn default() -> Self {
        Self(
            [("ak", 1600), ("regional", 800), ("southeast", 400)]
                .into_iter()
                .map(|(region, stride)| (region.to_string(), stride))
                .collect(),
        )
    }
}

impl DecimationTable {
    pub fn stride(&self, region: &str) -> Option<usize> {
        self.0.get(&region.to_lowercase()).copied()
    }

    /// Entries in `other` replace or extend this table.
    pub fn merged(mut self, other: &BTreeMap<String, usize>) -> Self {
        for (region, stride) in other {
            self.0.insert(region.to_lowercase(), *stride);
        }
        self
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// What a configuration file may set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// "host" or an IANA zone name.
    pub timezone: String,
    pub split: SplitRule,
    pub region: String,
    pub reference_system: String,
    /// Extra or replacement decimation strides per region.
    pub decimation: BTreeMap<String, usize>,
    /// Threshold overrides per hazard profile.
    pub hazard: BTreeMap<HazardProfile, HazardThresholds>,
    pub include_coords: bool,
    pub include_diff: bool,
    pub drop_missing: bool,
    /// Convert fields to display units before sampling.
    pub display_units: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: "host".to_string(),
            split: SplitRule::default(),
            region: "ak".to_string(),
            reference_system: ReferenceSystem::StatesAndCounties.display_name().to_string(),
            decimation: BTreeMap::new(),
            hazard: BTreeMap::new(),
            include_coords: true,
            include_diff: false,
            drop_missing: true,
            display_units: true,
        }
    }
}

/// Values given explicitly by the caller; `None` means "use the config".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub timezone: Option<String>,
    pub region: Option<String>,
    pub reference_system: Option<String>,
    pub stride: Option<usize>,
    pub split_hours: Option<i64>,
    pub include_diff: Option<bool>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub zone: LocalZone,
    pub split: SplitRule,
    pub region: String,
    pub reference_system: ReferenceSystem,
    pub borders: BorderSettings,
    pub sample: SampleOptions,
    pub display_units: bool,
    pub hazard_profiles: Vec<(HazardProfile, HazardThresholds)>,
}

impl ResolvedSettings {
    pub fn resolve(config: &PipelineConfig, overrides: &Overrides) -> Result<Self> {
        let zone = LocalZone::parse(overrides.timezone.as_deref().unwrap_or(&config.timezone))?;

        let split = match overrides.split_hours {
            Some(hours) if hours <= 0 => {
                return Err(ForecastError::config(format!(
                    "split hours must be positive, got {}",
                    hours
                )))
            }
            Some(hours) => SplitRule::AfterHours(hours),
            None => config.split,
        };

        let region = overrides
            .region
            .clone()
            .unwrap_or_else(|| config.region.clone())
            .to_lowercase();

        let reference_system = ReferenceSystem::parse(
            overrides
                .reference_system
                .as_deref()
                .unwrap_or(&config.reference_system),
        )?;

        let table = DecimationTable::default().merged(&config.decimation);
        let stride = match overrides.stride {
            Some(stride) => stride,
            None => table.stride(&region).ok_or_else(|| {
                ForecastError::config(format!(
                    "no decimation stride for region '{}' (known: {})",
                    region,
                    table.regions().collect::<Vec<_>>().join(", ")
                ))
            })?,
        };
        if stride == 0 {
            return Err(ForecastError::config("decimation stride must be at least 1"));
        }

        let hazard_profiles = HazardProfile::ALL
            .iter()
            .map(|&profile| {
                let thresholds = config
                    .hazard
                    .get(&profile)
                    .copied()
                    .unwrap_or_else(|| profile.default_thresholds());
                (profile, thresholds)
            })
            .collect();

        let settings = Self {
            zone,
            split,
            region,
            reference_system,
            borders: reference_system.borders(),
            sample: SampleOptions {
                stride,
                include_coords: config.include_coords,
                include_diff: overrides.include_diff.unwrap_or(config.include_diff),
                drop_missing: config.drop_missing,
                conversion: None,
            },
            display_units: config.display_units,
            hazard_profiles,
        };
        debug!(
            zone = %settings.zone,
            region = %settings.region,
            stride,
            reference_system = settings.reference_system.display_name(),
            "resolved settings"
        );
        Ok(settings)
    }

    pub fn thresholds(&self, profile: HazardProfile) -> Option<HazardThresholds> {
        self.hazard_profiles
            .iter()
            .find(|(p, _)| *p == profile)
            .map(|(_, t)| *t)
    }
}
