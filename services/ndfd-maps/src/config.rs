//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ndfd_core::{PipelineConfig, ProductCode, NDFD_ALASKA_BASE_URL};
use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Where product files come from
    pub source: SourceConfig,

    /// Products to assemble
    pub products: Vec<ProductCode>,

    /// Also build hot-dry-windy masks (needs max temperature, min RH and wind)
    pub hazard: bool,

    /// Assembly settings
    pub pipeline: PipelineConfig,

    /// Directory for JSON summaries
    pub output_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            products: HAZARD_PRODUCTS.to_vec(),
            hazard: true,
            pipeline: PipelineConfig::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Temperature, humidity and wind inputs of the hot-dry-windy mask.
pub const HAZARD_PRODUCTS: [ProductCode; 3] = [
    ProductCode::MaxTemperature,
    ProductCode::MinRelativeHumidity,
    ProductCode::WindSpeed,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// NWS telecommunications gateway (or a mirror with the same layout)
    Http {
        base_url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: u64,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        /// First retry delay (milliseconds); doubles per retry
        #[serde(default = "default_initial_retry_delay_ms")]
        initial_retry_delay_ms: u64,
        #[serde(default = "default_max_retry_delay_ms")]
        max_retry_delay_ms: u64,
    },
    /// Local copy laid out as `<path>/VP.001-003/ds.maxt.bin`
    Directory { path: PathBuf },
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    2000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

impl SourceConfig {
    /// HTTP source with default timeouts and retries.
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::Http {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::http(NDFD_ALASKA_BASE_URL)
    }
}

/// Retry and timeout settings of the HTTP source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(default_timeout_secs()),
            connect_timeout: Duration::from_secs(default_connect_timeout_secs()),
            max_retries: default_max_retries(),
            initial_retry_delay: Duration::from_millis(default_initial_retry_delay_ms()),
            max_retry_delay: Duration::from_millis(default_max_retry_delay_ms()),
        }
    }
}

impl ServiceConfig {
    /// Load from a YAML file, or defaults when no file is given, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Apply NDFD_BASE_URL, NDFD_TIMEZONE and NDFD_OUTPUT_DIR.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("NDFD_BASE_URL") {
            match &mut self.source {
                SourceConfig::Http { base_url, .. } => *base_url = url,
                SourceConfig::Directory { .. } => self.source = SourceConfig::http(url),
            }
        }
        if let Some(tz) = var("NDFD_TIMEZONE") {
            self.pipeline.timezone = tz;
        }
        if let Some(dir) = var("NDFD_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Whether every input of the hazard mask is configured.
    pub fn hazard_ready(&self) -> bool {
        self.hazard && HAZARD_PRODUCTS.iter().all(|p| self.products.contains(p))
    }
}
