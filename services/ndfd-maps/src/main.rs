//! NDFD Alaska forecast map service.
//!
//! Fetches the configured NDFD products for both forecast horizons,
//! assembles them into per-period frames and writes a JSON summary per
//! frame:
//! - Parallel product fetch with timeouts and exponential backoff retry
//! - Short/extended series alignment with an optional 7th period
//! - Decimated station tables for label placement
//! - Hot-dry-windy hazard masks

mod config;
mod fetch;
mod sink;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndfd_core::{AssembledProduct, Overrides, Pipeline, ProductCode, ResolvedSettings};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::{ServiceConfig, SourceConfig, HAZARD_PRODUCTS};
use fetch::{fetch_products, source_from_config};
use sink::JsonSummarySink;

#[derive(Parser, Debug)]
#[command(name = "ndfd-maps")]
#[command(about = "Assemble NDFD Alaska forecast periods into render-ready frames")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "NDFD_CONFIG")]
    config: Option<PathBuf>,

    /// Products to assemble, e.g. "maxt,minrh,wspd" (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    products: Vec<String>,

    /// Read products from a local mirror instead of HTTP
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Directory for JSON summaries
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// IANA zone for local times, or "host"
    #[arg(long)]
    timezone: Option<String>,

    /// Map region used to pick the station stride
    #[arg(long)]
    region: Option<String>,

    /// Boundary set, e.g. "States & Counties"
    #[arg(long)]
    reference_system: Option<String>,

    /// Explicit station stride (overrides the region table)
    #[arg(long)]
    stride: Option<usize>,

    /// Hours after the first period where the extended series starts
    #[arg(long)]
    split_hours: Option<i64>,

    /// Include day-over-day differences
    #[arg(long)]
    diff: bool,

    /// Skip the hot-dry-windy masks
    #[arg(long)]
    no_hazard: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            timezone: self.timezone.clone(),
            region: self.region.clone(),
            reference_system: self.reference_system.clone(),
            stride: self.stride,
            split_hours: self.split_hours,
            include_diff: self.diff.then_some(true),
        }
    }
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format.eq_ignore_ascii_case("json") {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).pretty().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, &args.log_format);

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    apply_args(&mut config, &args)?;

    let settings = ResolvedSettings::resolve(&config.pipeline, &args.overrides())
        .context("Invalid pipeline settings")?;
    info!(
        zone = %settings.zone,
        region = %settings.region,
        stride = settings.sample.stride,
        products = ?config.products,
        "Starting NDFD map assembly"
    );

    let source = source_from_config(&config.source)?;
    let raws = fetch_products(source.as_ref(), &config.products).await?;

    let pipeline = Pipeline::new(settings.clone()).with_now(settings.zone.now());
    let mut sink = JsonSummarySink::new(&config.output_dir)?;

    let assembled = assemble_all(&pipeline, &raws);
    if assembled.is_empty() {
        bail!("No product could be assembled");
    }

    for product in assembled.values() {
        match pipeline.render_product(product, &mut sink) {
            Ok(frames) => info!(product = %product.code, frames, "Rendered product"),
            Err(e) => error!(product = %product.code, error = %e, "Failed to render product"),
        }
    }

    if config.hazard_ready() {
        render_hazard(&pipeline, &assembled, &mut sink)?;
    }

    info!(
        files = sink.written().len(),
        output_dir = %config.output_dir.display(),
        "Done"
    );
    Ok(())
}

fn apply_args(config: &mut ServiceConfig, args: &Args) -> Result<()> {
    if !args.products.is_empty() {
        config.products = args
            .products
            .iter()
            .map(|p| p.parse::<ProductCode>())
            .collect::<std::result::Result<_, _>>()?;
    }
    if let Some(dir) = &args.source_dir {
        config.source = SourceConfig::Directory { path: dir.clone() };
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.no_hazard {
        config.hazard = false;
    }
    Ok(())
}

/// Assemble every fetched product; failures are logged and skipped.
fn assemble_all(
    pipeline: &Pipeline,
    raws: &BTreeMap<ProductCode, Vec<ndfd_core::RawProduct>>,
) -> BTreeMap<ProductCode, AssembledProduct> {
    raws.iter()
        .filter_map(|(&code, files)| {
            if files.is_empty() {
                warn!(product = %code, "No files fetched");
                return None;
            }
            match pipeline.assemble(code, files) {
                Ok(product) => Some((code, product)),
                Err(e) => {
                    error!(product = %code, error = %e, "Failed to assemble product");
                    None
                }
            }
        })
        .collect()
}

fn render_hazard(
    pipeline: &Pipeline,
    assembled: &BTreeMap<ProductCode, AssembledProduct>,
    sink: &mut JsonSummarySink,
) -> Result<()> {
    let [temp, rh, wind] = HAZARD_PRODUCTS.map(|code| assembled.get(&code));
    let (Some(temp), Some(rh), Some(wind)) = (temp, rh, wind) else {
        warn!("Hazard inputs incomplete, skipping hot-dry-windy masks");
        return Ok(());
    };

    let frames = pipeline
        .render_hazard(temp, rh, wind, sink)
        .context("Failed to build hot-dry-windy masks")?;
    info!(frames, "Rendered hot-dry-windy masks");
    Ok(())
}
