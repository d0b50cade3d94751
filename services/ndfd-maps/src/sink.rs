//! JSON summary sink: one document per rendered frame.

use std::path::{Path, PathBuf};

use ndfd_core::{
    BorderSettings, FieldStats, ForecastError, HazardFrame, HazardProfile, HazardThresholds, PeriodFrame,
    PeriodTitle, RenderSink, StationTable,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct PeriodSummary<'a> {
    product: String,
    parameter: &'a str,
    period: usize,
    title: &'a PeriodTitle,
    unit: &'a str,
    width: usize,
    height: usize,
    stats: &'a FieldStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff_stats: Option<FieldStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stations: Option<&'a StationTable>,
    borders: Vec<&'static str>,
    border_settings: &'a BorderSettings,
}

#[derive(Debug, Serialize)]
struct HazardSummary<'a> {
    period: usize,
    title: &'a PeriodTitle,
    width: usize,
    height: usize,
    profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Serialize)]
struct ProfileSummary {
    profile: HazardProfile,
    thresholds: HazardThresholds,
    flagged: usize,
}

/// Writes `<product>_p<n>.json` and `hot_dry_windy_p<n>.json` files.
pub struct JsonSummarySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonSummarySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ForecastError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ForecastError::Sink(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), ForecastError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| ForecastError::Sink(format!("cannot serialize {}: {}", name, e)))?;
        std::fs::write(&path, json)
            .map_err(|e| ForecastError::Sink(format!("cannot write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Wrote summary");
        self.written.push(path);
        Ok(())
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map_or(name, |s| s.trim_start_matches("ds."))
}

impl RenderSink for JsonSummarySink {
    fn render_period(&mut self, frame: &PeriodFrame<'_>) -> Result<(), ForecastError> {
        let summary = PeriodSummary {
            product: frame.product.to_string(),
            parameter: frame.product.parameter(),
            period: frame.period,
            title: &frame.title,
            unit: frame.unit.symbol(),
            width: frame.field.width,
            height: frame.field.height,
            stats: &frame.stats,
            diff_stats: frame.diff.as_ref().map(|d| d.stats()),
            stations: frame.stations,
            borders: frame.borders.layers(),
            border_settings: frame.borders,
        };
        let name = format!("{}_p{}.json", file_stem(frame.product.file_name()), frame.period);
        self.write(&name, &summary)
    }

    fn render_hazard(&mut self, frame: &HazardFrame<'_>) -> Result<(), ForecastError> {
        let summary = HazardSummary {
            period: frame.period,
            title: &frame.title,
            width: frame.coords.width,
            height: frame.coords.height,
            profiles: frame
                .masks
                .iter()
                .map(|m| ProfileSummary {
                    profile: m.profile,
                    thresholds: m.thresholds,
                    flagged: m.mask.count(),
                })
                .collect(),
        };
        self.write(&format!("hot_dry_windy_p{}.json", frame.period), &summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use ndfd_core::{Grid2D, GridCoords, HazardMask, ProductCode, ProfileMask, ReferenceSystem, Unit};
    use std::borrow::Cow;

    fn coords() -> GridCoords {
        GridCoords {
            width: 2,
            height: 1,
            lat: vec![61.2, 61.2],
            lon: vec![-149.9, -149.8],
        }
    }

    fn title() -> PeriodTitle {
        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        PeriodTitle::new(
            &tz.with_ymd_and_hms(2024, 6, 10, 6, 0, 0).unwrap(),
            &tz.with_ymd_and_hms(2024, 6, 10, 18, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_period_summary_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonSummarySink::new(dir.path().join("out")).unwrap();

        let coords = coords();
        let borders = ReferenceSystem::StatesOnly.borders();
        let field = Grid2D::new(2, 1, vec![60.0, 70.0]).unwrap();
        let frame = PeriodFrame {
            product: ProductCode::MaxTemperature,
            period: 3,
            title: title(),
            unit: Unit::Fahrenheit,
            stats: field.stats(),
            field: Cow::Owned(field),
            diff: None,
            coords: &coords,
            stations: None,
            borders: &borders,
        };
        sink.render_period(&frame).unwrap();

        let path = dir.path().join("out/maxt_p3.json");
        assert_eq!(sink.written(), &[path.clone()]);
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(json["parameter"], "TMAX");
        assert_eq!(json["unit"], "°F");
        assert_eq!(json["stats"]["mean"], 65.0);
        assert_eq!(json["title"]["start"], "Mon Jun 10, 2024 6:00 AM");
        assert!(json.get("stations").is_none());
        assert_eq!(json["borders"], serde_json::json!(["states"]));
        assert_eq!(json["border_settings"]["state_linewidth"], 1.5);
    }

    #[test]
    fn test_hazard_summary_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonSummarySink::new(dir.path()).unwrap();

        let coords = coords();
        let profile = HazardProfile::PreGreenup;
        let frame = HazardFrame {
            period: 1,
            title: title(),
            coords: &coords,
            masks: vec![ProfileMask {
                profile,
                thresholds: profile.default_thresholds(),
                mask: HazardMask {
                    width: 2,
                    height: 1,
                    cells: vec![true, false],
                },
            }],
        };
        sink.render_hazard(&frame).unwrap();

        let text = std::fs::read_to_string(dir.path().join("hot_dry_windy_p1.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["profiles"][0]["profile"], "pre_greenup");
        assert_eq!(json["profiles"][0]["flagged"], 1);
    }
}
