//! Product sources.
//!
//! Each product is fetched once per horizon. A missing file (HTTP 404 or
//! no such path) is not an error: extended-range files in particular are
//! sometimes absent, and assembly copes with fewer periods.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use ndfd_core::{Horizon, ProductCode, RawProduct};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::config::{HttpPolicy, SourceConfig};

/// Horizons every product is published for.
pub const HORIZONS: [Horizon; 2] = [Horizon::Short, Horizon::Extended];

/// Something that can deliver the raw bytes of a product file.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetch one file; `None` when the source does not have it.
    async fn fetch(&self, code: ProductCode, horizon: Horizon) -> Result<Option<RawProduct>>;

    fn describe(&self) -> String;
}

/// Build the source a configuration names.
pub fn source_from_config(config: &SourceConfig) -> Result<Box<dyn ProductSource>> {
    match config {
        SourceConfig::Http {
            base_url,
            timeout_secs,
            connect_timeout_secs,
            max_retries,
            initial_retry_delay_ms,
            max_retry_delay_ms,
        } => {
            let policy = HttpPolicy {
                timeout: std::time::Duration::from_secs(*timeout_secs),
                connect_timeout: std::time::Duration::from_secs(*connect_timeout_secs),
                max_retries: *max_retries,
                initial_retry_delay: std::time::Duration::from_millis(*initial_retry_delay_ms),
                max_retry_delay: std::time::Duration::from_millis(*max_retry_delay_ms),
            };
            Ok(Box::new(HttpSource::new(base_url.clone(), policy)?))
        }
        SourceConfig::Directory { path } => Ok(Box::new(FileSource::new(path.clone()))),
    }
}

/// HTTP source with per-request timeouts and exponential backoff.
pub struct HttpSource {
    client: Client,
    base_url: String,
    policy: HttpPolicy,
}

impl HttpSource {
    pub fn new(base_url: String, policy: HttpPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .connect_timeout(policy.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            policy,
        })
    }

    /// One GET. `Ok(None)` on 404.
    async fn get_once(&self, url: &str) -> Result<Option<Bytes>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        match response.status() {
            StatusCode::OK => Ok(Some(
                response.bytes().await.context("Failed to read response body")?,
            )),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(anyhow!("HTTP error: {}", status)),
        }
    }
}

#[async_trait]
impl ProductSource for HttpSource {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch(&self, code: ProductCode, horizon: Horizon) -> Result<Option<RawProduct>> {
        let url = code
            .url(&self.base_url, horizon)
            .ok_or_else(|| anyhow!("No directory for horizon {:?}", horizon))?;

        let mut retry_count = 0;
        let mut delay = self.policy.initial_retry_delay;

        loop {
            match self.get_once(&url).await {
                Ok(Some(bytes)) => {
                    info!(url = %url, bytes = bytes.len(), "Fetched product");
                    return Ok(Some(RawProduct::new(code, horizon, bytes)));
                }
                Ok(None) => {
                    warn!(url = %url, "Product not published");
                    return Ok(None);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.policy.max_retries {
                        return Err(e.context(format!(
                            "Fetching {} failed after {} retries",
                            url, self.policy.max_retries
                        )));
                    }

                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.policy.max_retry_delay);
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Local mirror with the server's directory layout.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path(&self, code: ProductCode, horizon: Horizon) -> Option<PathBuf> {
        horizon
            .directory()
            .map(|dir| self.root.join(dir).join(code.file_name()))
    }
}

#[async_trait]
impl ProductSource for FileSource {
    async fn fetch(&self, code: ProductCode, horizon: Horizon) -> Result<Option<RawProduct>> {
        let path = self
            .path(code, horizon)
            .ok_or_else(|| anyhow!("No directory for horizon {:?}", horizon))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Read product file");
                Ok(Some(RawProduct::new(code, horizon, bytes)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Product file not found");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Fetch both horizons of every product concurrently.
///
/// Products with no file at all map to an empty list.
pub async fn fetch_products(
    source: &dyn ProductSource,
    products: &[ProductCode],
) -> Result<BTreeMap<ProductCode, Vec<RawProduct>>> {
    let requests = products
        .iter()
        .flat_map(|&code| HORIZONS.iter().map(move |&horizon| (code, horizon)))
        .map(|(code, horizon)| async move {
            source
                .fetch(code, horizon)
                .await
                .map(|raw| (code, raw))
        });

    let fetched = try_join_all(requests).await?;

    let mut by_product: BTreeMap<ProductCode, Vec<RawProduct>> =
        products.iter().map(|&code| (code, Vec::new())).collect();
    for (code, raw) in fetched {
        if let Some(raw) = raw {
            by_product.entry(code).or_default().push(raw);
        }
    }

    info!(
        source = %source.describe(),
        files = by_product.values().map(Vec::len).sum::<usize>(),
        "Fetched products"
    );
    Ok(by_product)
}
