//! Parameter and level names for NDFD messages.
//!
//! GRIB2 identifies a weather element by (discipline, category, number) and a
//! level by its Table 4.5 type code. [`Grib2Tables::ndfd`] covers the
//! elements NDFD publishes for Alaska, including the local MINRH/MAXRH
//! codes. Other entries can be added with [`Grib2Tables::with_parameter`].

use std::collections::HashMap;

/// (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// NDFD weather elements, discipline 0 (meteorological products).
const NDFD_PARAMETERS: &[(ParamKey, &str)] = &[
    ((0, 0, 0), "TMP"),
    ((0, 0, 4), "TMAX"),
    ((0, 0, 5), "TMIN"),
    ((0, 0, 6), "DPT"),
    ((0, 0, 21), "APTMP"),
    ((0, 1, 1), "RH"),
    ((0, 1, 8), "APCP"),
    ((0, 1, 27), "MAXRH"),
    ((0, 1, 198), "MINRH"),
    ((0, 2, 0), "WDIR"),
    ((0, 2, 1), "WIND"),
    ((0, 2, 22), "GUST"),
    ((0, 6, 1), "TCDC"),
];

/// How a level type is written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelDescription {
    Static(String),
    /// `{value}` is replaced by the scaled level value.
    Template(String),
}

impl LevelDescription {
    pub fn format(&self, value: u32) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => t.replace("{value}", &value.to_string()),
        }
    }
}

/// Lookup tables shared (behind an `Arc`) by every reader of a run.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, String>,
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Empty tables; every lookup falls back to the numeric codes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables for the NDFD Alaska products.
    pub fn ndfd() -> Self {
        let tables = NDFD_PARAMETERS
            .iter()
            .fold(Self::new(), |tables, &(key, name)| tables.with_parameter(key, name));

        tables
            .with_level(1, LevelDescription::Static("surface".to_string()))
            .with_level(
                103,
                LevelDescription::Template("{value} m above ground".to_string()),
            )
    }

    pub fn with_parameter(mut self, key: ParamKey, name: impl Into<String>) -> Self {
        self.parameters.insert(key, name.into());
        self
    }

    pub fn with_level(mut self, level_type: u8, description: LevelDescription) -> Self {
        self.levels.insert(level_type, description);
        self
    }

    /// Short name such as "TMAX", or `P{discipline}_{category}_{number}`
    /// for codes the tables do not know.
    pub fn get_parameter_name(&self, discipline: u8, category: u8, number: u8) -> String {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(|| format!("P{}_{}_{}", discipline, category, number))
    }

    pub fn get_level_description(&self, level_type: u8, level_value: u32) -> String {
        match self.levels.get(&level_type) {
            Some(desc) => desc.format(level_value),
            None => format!("level {} ({})", level_type, level_value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndfd_elements() {
        let tables = Grib2Tables::ndfd();
        assert_eq!(tables.get_parameter_name(0, 0, 4), "TMAX");
        assert_eq!(tables.get_parameter_name(0, 0, 5), "TMIN");
        assert_eq!(tables.get_parameter_name(0, 1, 198), "MINRH");
        assert_eq!(tables.get_parameter_name(0, 1, 27), "MAXRH");
        assert_eq!(tables.get_parameter_name(0, 2, 1), "WIND");
        assert_eq!(tables.get_parameter_name(0, 2, 22), "GUST");
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        let tables = Grib2Tables::ndfd();
        assert_eq!(tables.get_parameter_name(10, 3, 0), "P10_3_0");
        assert_eq!(tables.get_level_description(100, 50000), "level 100 (50000)");
    }

    #[test]
    fn test_levels() {
        let tables = Grib2Tables::ndfd();
        assert_eq!(tables.get_level_description(1, 0), "surface");
        assert_eq!(tables.get_level_description(103, 10), "10 m above ground");
    }

    #[test]
    fn test_extra_entries_layer_on_top() {
        let tables = Grib2Tables::ndfd()
            .with_parameter((0, 19, 0), "VIS")
            .with_parameter((0, 0, 4), "MAXT");
        assert_eq!(tables.get_parameter_name(0, 19, 0), "VIS");
        assert_eq!(tables.get_parameter_name(0, 0, 4), "MAXT");
    }

    #[test]
    fn test_empty_tables() {
        let tables = Grib2Tables::new();
        assert!(tables.is_empty());
        assert!(!Grib2Tables::ndfd().is_empty());
        assert_eq!(tables.get_parameter_name(0, 0, 4), "P0_0_4");
    }
}
