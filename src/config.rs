use anyhow::{Context, Result};
use feed_enrich_core::ColumnMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub reference: ReferenceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Remote feed, fetched over HTTP(S).
    #[serde(default)]
    pub url: Option<String>,
    /// Local feed file, used instead of `url`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    #[serde(default = "default_item_element")]
    pub item_element: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_namespace_prefix() -> String {
    "g".to_string()
}
fn default_item_element() -> String {
    "item".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

/// Where the feed comes from after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Url(String),
    Path(PathBuf),
}

impl FeedConfig {
    pub fn source(&self) -> Result<FeedSource> {
        match (&self.url, &self.path) {
            (Some(url), None) => Ok(FeedSource::Url(url.clone())),
            (None, Some(path)) => Ok(FeedSource::Path(path.clone())),
            (Some(_), Some(_)) => anyhow::bail!("feed.url and feed.path are mutually exclusive"),
            (None, None) => anyhow::bail!("one of feed.url or feed.path must be set"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    pub path: PathBuf,
    /// 1-based worksheet position for `.xlsx` files.
    #[serde(default = "default_sheet")]
    pub sheet: usize,
    #[serde(default = "default_on_error")]
    pub on_error: String,
    #[serde(default)]
    pub columns: ColumnMap,
}

fn default_sheet() -> usize {
    1
}
fn default_on_error() -> String {
    "abort".to_string()
}

impl ReferenceConfig {
    /// Whether an unreadable reference file degrades to an empty index.
    pub fn passthrough_on_error(&self) -> bool {
        self.on_error == "passthrough"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub path: PathBuf,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate feed
    config.feed.source()?;
    if config.feed.timeout_secs == 0 {
        anyhow::bail!("feed.timeout_secs must be > 0");
    }
    if config.feed.item_element.trim().is_empty() {
        anyhow::bail!("feed.item_element must not be empty");
    }

    // Validate reference
    if config.reference.sheet == 0 {
        anyhow::bail!("reference.sheet must be >= 1");
    }
    match config.reference.on_error.as_str() {
        "abort" | "passthrough" => {}
        other => anyhow::bail!(
            "Unknown reference.on_error: '{}'. Must be abort or passthrough.",
            other
        ),
    }
    for (field, column) in config.reference.columns.entries() {
        if column.trim().is_empty() {
            anyhow::bail!("reference.columns.{} must not be empty", field);
        }
    }

    Ok(config)
}
