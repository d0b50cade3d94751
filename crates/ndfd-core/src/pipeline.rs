//! Product assembly and hand-off to a render sink.
//!
//! ```text
//! RawProduct(s) ──► GridDecoder ──► CadenceSplitter ──► StepAligner
//!                                                          │
//!                                  AssembledProduct ◄──────┘
//!                                       │
//!            ┌──────────────────────────┼────────────────────────┐
//!            ▼                          ▼                        ▼
//!      find_ds_vals          parse_nws_grib_data_array     build_display_mask
//!            └──────────────► PeriodFrame / HazardFrame ◄────────┘
//!                                       │
//!                                       ▼
//!                                  RenderSink
//! ```

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use projection::GridCoords;
use tracing::{debug, info, instrument};

use crate::align::StepAligner;
use crate::cadence::CadenceSplitter;
use crate::config::{BorderSettings, ResolvedSettings};
use crate::decoder::GridDecoder;
use crate::error::Result;
use crate::extract::{find_ds_vals, PeriodField, PeriodFields};
use crate::hazard::{build_display_mask, NativeInputs, ProfileMask};
use crate::products::{ProductCode, RawProduct};
use crate::stations::{parse_nws_grib_data_array, SampleOptions, SampledStations, StationTable};
use crate::time::{DayHalf, PeriodTitle};
use crate::types::{FieldStats, Grid2D, SplitSeries, StepCount};
use crate::units::{convert_grid, Conversion, Unit};

/// Everything a renderer needs for one period of one product.
#[derive(Debug)]
pub struct PeriodFrame<'a> {
    pub product: ProductCode,
    pub period: usize,
    pub title: PeriodTitle,
    pub unit: Unit,
    pub field: Cow<'a, Grid2D>,
    /// Change from the previous period, when differences are enabled.
    pub diff: Option<Cow<'a, Grid2D>>,
    pub coords: &'a GridCoords,
    pub stats: FieldStats,
    pub stations: Option<&'a StationTable>,
    /// Boundary layers to draw under the field.
    pub borders: &'a BorderSettings,
}

/// Hot-dry-windy masks of one period.
#[derive(Debug)]
pub struct HazardFrame<'a> {
    pub period: usize,
    pub title: PeriodTitle,
    pub coords: &'a GridCoords,
    pub masks: Vec<ProfileMask>,
}

/// Receives assembled frames. Unavailable periods produce no call.
pub trait RenderSink {
    fn render_period(&mut self, frame: &PeriodFrame<'_>) -> Result<()>;

    fn render_hazard(&mut self, _frame: &HazardFrame<'_>) -> Result<()> {
        Ok(())
    }
}

/// A product decoded, split and aligned.
#[derive(Debug, Clone)]
pub struct AssembledProduct {
    pub code: ProductCode,
    pub series: SplitSeries,
    pub steps: StepCount,
}

impl AssembledProduct {
    pub fn fields(&self, diff: bool) -> Result<PeriodFields<'_>> {
        find_ds_vals(&self.series, &self.steps, self.code.parameter(), diff)
    }

    pub fn stations(&self, options: &SampleOptions) -> SampledStations {
        parse_nws_grib_data_array(&self.series, &self.steps, self.code.parameter(), options)
    }

    pub fn total_steps(&self) -> usize {
        self.steps.total_steps
    }
}

/// Runs the assembly stages with one set of resolved settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: ResolvedSettings,
    decoder: GridDecoder,
    now: Option<DateTime<FixedOffset>>,
}

impl Pipeline {
    pub fn new(settings: ResolvedSettings) -> Self {
        let decoder = GridDecoder::ndfd(settings.zone);
        Self {
            settings,
            decoder,
            now: None,
        }
    }

    /// Drop periods that have ended by `now`.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    /// Decode, split and align all files of one product.
    #[instrument(skip(self, raws), fields(files = raws.len()))]
    pub fn assemble(&self, code: ProductCode, raws: &[RawProduct]) -> Result<AssembledProduct> {
        let periods = self.decoder.decode_all(raws)?;

        let mut splitter = CadenceSplitter::new(self.settings.split);
        let mut aligner = StepAligner::new(code.preferred_half());
        if let Some(now) = self.now {
            splitter = splitter.with_now(now);
            aligner = aligner.with_now(now);
        }

        let series = splitter.split(periods);
        let steps = aligner.ndfd_step_count(&series.short, &series.extended)?;
        info!(
            product = %code,
            short = series.short_count(),
            extended = series.extended_count(),
            total_steps = steps.total_steps,
            "assembled product"
        );

        Ok(AssembledProduct {
            code,
            series,
            steps,
        })
    }

    fn display_conversion(&self, code: ProductCode) -> Result<Option<Conversion>> {
        if !self.settings.display_units {
            return Ok(None);
        }
        Conversion::new(code.native_unit(), code.display_unit()).map(Some)
    }

    /// Hand every available period of a product to `sink`. Returns the
    /// number of frames rendered.
    #[instrument(skip_all, fields(product = %product.code))]
    pub fn render_product(
        &self,
        product: &AssembledProduct,
        sink: &mut dyn RenderSink,
    ) -> Result<usize> {
        let conversion = self.display_conversion(product.code)?;
        let unit = conversion.map_or(product.code.native_unit(), |c| c.to);

        let fields = product.fields(false)?;
        let diffs = if self.settings.sample.include_diff {
            Some(product.fields(true)?)
        } else {
            None
        };
        let stations = product.stations(&SampleOptions {
            conversion,
            ..self.settings.sample
        });

        let mut rendered = 0;
        for period in fields.available() {
            let field = match conversion {
                Some(c) => Cow::Owned(convert_grid(&period.field, c)),
                None => Cow::Borrowed(period.field.as_ref()),
            };
            let diff = diffs
                .as_ref()
                .and_then(|d| d.get(period.period))
                .map(|d| Cow::Owned(display_diff(&d.field, conversion)));

            let frame = PeriodFrame {
                product: product.code,
                period: period.period,
                title: PeriodTitle::new(&period.start, &period.end),
                unit,
                stats: field.stats(),
                field,
                diff,
                coords: period.coords.as_ref(),
                stations: stations.get(period.period),
                borders: &self.settings.borders,
            };
            sink.render_period(&frame)?;
            rendered += 1;
        }

        debug!(rendered, missing_stations = ?stations.missing, "rendered product");
        Ok(rendered)
    }

    /// Build hot-dry-windy masks for every temperature period the humidity
    /// and wind products also cover.
    ///
    /// Products are matched by forecast day and overlapping local windows,
    /// not by period number, since their cadences differ.
    #[instrument(skip_all)]
    pub fn render_hazard(
        &self,
        temp: &AssembledProduct,
        rh: &AssembledProduct,
        wind: &AssembledProduct,
        sink: &mut dyn RenderSink,
    ) -> Result<usize> {
        let temp_fields = temp.fields(false)?;
        let rh_fields = rh.fields(false)?;
        let wind_fields = wind.fields(false)?;

        let mut rendered = 0;
        for t in temp_fields.available() {
            let h = rh_fields.available().find(|f| coincides(t, f));
            let w = wind_fields.available().find(|f| coincides(t, f));
            let (Some(h), Some(w)) = (h, w) else {
                debug!(period = t.period, start = %t.start, "no matching humidity or wind period");
                continue;
            };
            let masks = build_display_mask(
                NativeInputs {
                    temp: (t.field.as_ref(), temp.code.native_unit()),
                    rh: (h.field.as_ref(), rh.code.native_unit()),
                    wind: (w.field.as_ref(), wind.code.native_unit()),
                },
                &self.settings.hazard_profiles,
            )?;

            let frame = HazardFrame {
                period: t.period,
                title: PeriodTitle::new(&t.start, &t.end),
                coords: t.coords.as_ref(),
                masks,
            };
            sink.render_hazard(&frame)?;
            rendered += 1;
        }

        debug!(rendered, "rendered hazard masks");
        Ok(rendered)
    }
}

/// Same forecast day, and `other` starts inside `base` or runs into it.
fn coincides(base: &PeriodField<'_>, other: &PeriodField<'_>) -> bool {
    DayHalf::forecast_day(&base.start) == DayHalf::forecast_day(&other.start)
        && other.start < base.end
        && (other.start >= base.start || other.end > base.start)
}

/// Temperature differences are intervals, so only the scale of the
/// conversion applies.
fn display_diff(diff: &Grid2D, conversion: Option<Conversion>) -> Grid2D {
    match conversion {
        Some(c) => {
            let offset = c.apply(0.0);
            diff.map(|v| c.apply(v) - offset)
        }
        None => diff.clone(),
    }
}
