//! End-to-end assembly from synthetic NDFD GRIB2 files.

use ndfd_core::{
    AssembledProduct, FieldStats, ForecastError, HazardFrame, Horizon, Overrides, PeriodFrame,
    Pipeline, PipelineConfig, ProductCode, RawProduct, RenderSink, ResolvedSettings, Result,
};
use chrono::{Datelike, Duration, Timelike};
use test_utils::{assert_approx_eq, concat_messages, NdfdMessageBuilder};

/// Forecast hours from the 12Z reference that start at 06:00 AKDT.
const DAY_HOURS: [u32; 7] = [2, 26, 50, 74, 98, 122, 146];

#[derive(Default)]
struct RecordingSink {
    periods: Vec<(usize, String, FieldStats, Option<usize>)>,
    borders: Vec<Vec<&'static str>>,
    hazards: Vec<(usize, Vec<usize>)>,
}

impl RenderSink for RecordingSink {
    fn render_period(&mut self, frame: &PeriodFrame<'_>) -> Result<()> {
        self.periods.push((
            frame.period,
            frame.title.start.clone(),
            frame.stats.clone(),
            frame.stations.map(|s| s.len()),
        ));
        self.borders.push(frame.borders.layers());
        Ok(())
    }

    fn render_hazard(&mut self, frame: &HazardFrame<'_>) -> Result<()> {
        self.hazards
            .push((frame.period, frame.masks.iter().map(|m| m.mask.count()).collect()));
        Ok(())
    }
}

fn pipeline() -> Pipeline {
    let config = PipelineConfig {
        timezone: "America/Anchorage".into(),
        ..Default::default()
    };
    let overrides = Overrides {
        stride: Some(1),
        ..Default::default()
    };
    Pipeline::new(ResolvedSettings::resolve(&config, &overrides).unwrap())
}

fn product_files(
    code: ProductCode,
    hours: &[u32],
    builder: impl Fn(u32) -> NdfdMessageBuilder,
) -> Vec<RawProduct> {
    let (short, extended): (Vec<u32>, Vec<u32>) = hours.iter().copied().partition(|&h| h < 72);
    [(Horizon::Short, short), (Horizon::Extended, extended)]
        .into_iter()
        .filter(|(_, hours)| !hours.is_empty())
        .map(|(horizon, hours)| {
            let messages: Vec<Vec<u8>> = hours.iter().map(|&h| builder(h).build()).collect();
            RawProduct::new(code, horizon, concat_messages(&messages))
        })
        .collect()
}

fn tmax(hours: &[u32], value: impl Fn(u32) -> f32) -> Vec<RawProduct> {
    product_files(ProductCode::MaxTemperature, hours, |h| {
        NdfdMessageBuilder::new_tmax()
            .with_forecast_hour(h)
            .with_constant_value(value(h))
    })
}

fn minrh(hours: &[u32], value: f32) -> Vec<RawProduct> {
    product_files(ProductCode::MinRelativeHumidity, hours, |h| {
        NdfdMessageBuilder::new_rh()
            .with_parameter(1, 198)
            .with_interval(12, 3)
            .with_forecast_hour(h)
            .with_constant_value(value)
    })
}

fn wind(hours: &[u32], value: f32) -> Vec<RawProduct> {
    wind_by_hour(hours, |_| value)
}

fn wind_by_hour(hours: &[u32], value: impl Fn(u32) -> f32) -> Vec<RawProduct> {
    product_files(ProductCode::WindSpeed, hours, |h| {
        NdfdMessageBuilder::new_wind()
            .with_forecast_hour(h)
            .with_constant_value(value(h))
    })
}

/// Operational wind cadence: 3-hourly to 72 h, then 6-hourly.
fn wind_hours() -> Vec<u32> {
    (0..72).step_by(3).chain((72..=162).step_by(6)).collect()
}

/// Local AKDT hour of a forecast hour from the 12Z reference.
fn local_hour(forecast_hour: u32) -> u32 {
    (forecast_hour + 4) % 24
}

fn assemble(code: ProductCode, raws: &[RawProduct]) -> AssembledProduct {
    pipeline().assemble(code, raws).unwrap()
}

#[test]
fn test_seven_period_product() {
    let product = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |_| 290.0));

    assert_eq!(product.series.short_count(), 3);
    assert_eq!(product.series.extended_count(), 4);
    assert_eq!(product.total_steps(), 7);

    // Strictly increasing starts in both series
    for series in [&product.series.short, &product.series.extended] {
        assert!(series.periods.windows(2).all(|w| w[0].start < w[1].start));
    }

    let mut sink = RecordingSink::default();
    let rendered = pipeline().render_product(&product, &mut sink).unwrap();
    assert_eq!(rendered, 7);

    let (period, title, stats, stations) = &sink.periods[0];
    assert_eq!(*period, 1);
    assert_eq!(title, "Mon Jun 10, 2024 6:00 AM");
    // 290 K in °F
    assert_approx_eq!(stats.mean.unwrap(), 62.33, 0.05);
    assert_eq!(*stations, Some(12));

    // Default reference system is states and counties
    assert_eq!(sink.borders.len(), 7);
    assert!(sink.borders.iter().all(|b| b == &vec!["states", "counties"]));
}

#[test]
fn test_sub_daily_wind_one_period_per_day() {
    let product = assemble(ProductCode::WindSpeed, &wind(&wind_hours(), 8.0));
    assert_eq!(product.series.short_count(), 24);
    assert_eq!(product.series.extended_count(), 16);
    assert_eq!(product.total_steps(), 7);

    let fields = product.fields(false).unwrap();
    let starts: Vec<_> = fields.available().map(|f| f.start).collect();
    assert_eq!(starts.len(), 7);

    // One entry per forecast day, nearest local noon
    let hours: Vec<u32> = starts.iter().map(|s| s.hour()).collect();
    assert_eq!(hours, vec![13, 13, 13, 10, 10, 10, 10]);
    let days: Vec<u32> = starts.iter().map(|s| s.day()).collect();
    assert_eq!(days, vec![10, 11, 12, 13, 14, 15, 16]);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::hours(12));
    }
}

#[test]
fn test_six_period_product_degrades_gracefully() {
    let product = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS[..6], |_| 290.0));
    assert_eq!(product.total_steps(), 6);

    let fields = product.fields(false).unwrap();
    assert_eq!(fields.available_count(), 6);
    assert!(fields.period_7().is_none());

    let diffs = product.fields(true).unwrap();
    assert!(diffs.get(1).is_none());
    assert!(diffs.period_7().is_none());

    let stations = product.stations(&pipeline().settings().sample);
    assert_eq!(stations.tables.len(), 6);
    assert!(stations.missing.is_empty());
    assert!(stations.get(7).is_none());

    let mut sink = RecordingSink::default();
    assert_eq!(pipeline().render_product(&product, &mut sink).unwrap(), 6);
    assert!(sink.periods.iter().all(|(p, ..)| *p <= 6));
}

#[test]
fn test_raw_fields_are_the_decoded_grids() {
    let product = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |h| 280.0 + h as f32));
    let fields = product.fields(false).unwrap();

    for n in 1..=product.steps.short_steps {
        let field = fields.get(n).unwrap();
        assert!(std::ptr::eq(
            field.field.as_ref(),
            &product.series.short.periods[n - 1].field
        ));
    }
}

#[test]
fn test_diff_matches_neighbour_subtraction() {
    let product = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |h| 250.0 + h as f32 / 2.0));
    let raw = product.fields(false).unwrap();
    let diff = product.fields(true).unwrap();

    for n in 2..=7 {
        let expected = raw.get(n).unwrap().field.difference(&raw.get(n - 1).unwrap().field).unwrap();
        let actual = &diff.get(n).unwrap().field;
        for (a, e) in actual.data.iter().zip(&expected.data) {
            assert_approx_eq!(*a, *e, 1e-4);
        }
    }
    // Day-over-day TMAX rises by 12 K in every period
    assert_approx_eq!(diff.get(4).unwrap().field.data[0], 12.0, 0.05);
}

#[test]
fn test_stale_first_period_is_discarded() {
    let raws = tmax(&DAY_HOURS, |_| 290.0);
    let first_start = assemble(ProductCode::MaxTemperature, &raws).series.short.periods[0].start;

    let product = pipeline()
        .with_now(first_start + chrono::Duration::hours(13))
        .assemble(ProductCode::MaxTemperature, &raws)
        .unwrap();
    assert_eq!(product.series.discarded, 1);
    assert_eq!(product.total_steps(), 6);
}

#[test]
fn test_too_few_periods_degrades() {
    let product = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS[..4], |_| 290.0));
    assert_eq!(product.total_steps(), 4);
    assert!(!product.steps.has_period_7());

    let mut sink = RecordingSink::default();
    let rendered = pipeline().render_product(&product, &mut sink).unwrap();
    assert_eq!(rendered, 4);
    let periods: Vec<usize> = sink.periods.iter().map(|p| p.0).collect();
    assert_eq!(periods, vec![1, 2, 3, 4]);
}

#[test]
fn test_empty_product_is_a_decode_error() {
    let raws = [RawProduct::new(ProductCode::MaxTemperature, Horizon::Short, Vec::<u8>::new())];
    assert!(matches!(
        pipeline().assemble(ProductCode::MaxTemperature, &raws),
        Err(ForecastError::Decode { .. })
    ));
}

#[test]
fn test_hot_dry_windy_masks() {
    // 300 K ~ 80 °F, 10 % RH, 13.4 m/s ~ 30 mph
    let temp = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |_| 300.0));
    let rh = assemble(ProductCode::MinRelativeHumidity, &minrh(&DAY_HOURS, 10.0));
    let windy = assemble(ProductCode::WindSpeed, &wind(&DAY_HOURS, 13.4));

    let mut sink = RecordingSink::default();
    let rendered = pipeline()
        .render_hazard(&temp, &rh, &windy, &mut sink)
        .unwrap();
    assert_eq!(rendered, 7);
    // Both profiles flag all 12 cells
    assert!(sink.hazards.iter().all(|(_, counts)| counts == &vec![12, 12]));

    // 5 m/s is about 11 mph, below the wind threshold
    let calm = assemble(ProductCode::WindSpeed, &wind(&DAY_HOURS, 5.0));
    let mut sink = RecordingSink::default();
    pipeline().render_hazard(&temp, &rh, &calm, &mut sink).unwrap();
    assert!(sink.hazards.iter().all(|(_, counts)| counts == &vec![0, 0]));
}

#[test]
fn test_hazard_uses_periods_all_products_share() {
    let temp = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS[..6], |_| 300.0));
    let rh = assemble(ProductCode::MinRelativeHumidity, &minrh(&DAY_HOURS, 10.0));
    let windy = assemble(ProductCode::WindSpeed, &wind(&DAY_HOURS, 13.4));

    let mut sink = RecordingSink::default();
    let rendered = pipeline()
        .render_hazard(&temp, &rh, &windy, &mut sink)
        .unwrap();
    assert_eq!(rendered, 6);
    assert!(sink.hazards.iter().all(|(period, _)| *period <= 6));
}

#[test]
fn test_hazard_pairs_sub_daily_wind_by_forecast_day() {
    let temp = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |_| 300.0));
    let rh = assemble(ProductCode::MinRelativeHumidity, &minrh(&DAY_HOURS, 10.0));
    // Windy only around local midday, calm overnight
    let windy = assemble(
        ProductCode::WindSpeed,
        &wind_by_hour(&wind_hours(), |h| {
            if (10..=13).contains(&local_hour(h)) {
                13.4
            } else {
                5.0
            }
        }),
    );

    let mut sink = RecordingSink::default();
    let rendered = pipeline()
        .render_hazard(&temp, &rh, &windy, &mut sink)
        .unwrap();
    assert_eq!(rendered, 7);
    let periods: Vec<usize> = sink.hazards.iter().map(|(p, _)| *p).collect();
    assert_eq!(periods, vec![1, 2, 3, 4, 5, 6, 7]);
    assert!(sink.hazards.iter().all(|(_, counts)| counts == &vec![12, 12]));
}

#[test]
fn test_hazard_skips_days_without_wind() {
    let temp = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |_| 300.0));
    let rh = assemble(ProductCode::MinRelativeHumidity, &minrh(&DAY_HOURS, 10.0));
    // Short-range wind only, covering the first three days
    let hours: Vec<u32> = (0..72).step_by(3).collect();
    let windy = assemble(ProductCode::WindSpeed, &wind(&hours, 13.4));
    assert_eq!(windy.total_steps(), 3);

    let mut sink = RecordingSink::default();
    let rendered = pipeline()
        .render_hazard(&temp, &rh, &windy, &mut sink)
        .unwrap();
    assert_eq!(rendered, 3);
    let periods: Vec<usize> = sink.hazards.iter().map(|(p, _)| *p).collect();
    assert_eq!(periods, vec![1, 2, 3]);
}

#[test]
fn test_hazard_grid_mismatch_is_fatal() {
    let temp = assemble(ProductCode::MaxTemperature, &tmax(&DAY_HOURS, |_| 300.0));
    let rh = assemble(ProductCode::MinRelativeHumidity, &minrh(&DAY_HOURS, 10.0));
    let windy = assemble(
        ProductCode::WindSpeed,
        &product_files(ProductCode::WindSpeed, &DAY_HOURS, |h| {
            NdfdMessageBuilder::new_wind()
                .with_grid(5, 3)
                .with_forecast_hour(h)
                .with_constant_value(13.4)
        }),
    );

    let mut sink = RecordingSink::default();
    let result = pipeline().render_hazard(&temp, &rh, &windy, &mut sink);
    assert!(matches!(result, Err(ForecastError::GridMismatch { .. })));
    assert!(sink.hazards.is_empty());
}
