//! TOML configuration parsing.
//!
//! Every section is optional; a missing key takes the same default the block
//! edit form offers (`https://example.com/api/annotations`, 30 s timeout,
//! 300 s cache lifetime).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::sanitize::clean_url;

pub const DEFAULT_API_URL: &str = "https://example.com/api/annotations";
pub const DEFAULT_BLOCK_TITLE: &str = "Annotation Block";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub block: BlockConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlockConfig {
    /// Display title. Empty means [`DEFAULT_BLOCK_TITLE`].
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

/// Per-request settings for the remote annotation call.
///
/// Derived once from [`Config`] and never mutated while a request is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub api_url: String,
    pub api_timeout: Duration,
    pub connect_timeout: Duration,
    pub cache_ttl: Duration,
}

impl FetchConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.api_timeout = Duration::from_secs(secs);
        self.connect_timeout = self.connect_timeout.min(self.api_timeout);
        self
    }

    pub fn with_cache_ttl(mut self, secs: u64) -> Self {
        self.cache_ttl = Duration::from_secs(secs);
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Config::default().fetch_config()
    }
}

impl Config {
    /// Settings for [`AnnotationFetcher::fetch`](crate::fetch::AnnotationFetcher::fetch).
    ///
    /// The connect timeout never exceeds the overall request timeout.
    pub fn fetch_config(&self) -> FetchConfig {
        let api_timeout = Duration::from_secs(self.api.timeout_secs);
        FetchConfig {
            api_url: self.api.url.trim().to_string(),
            api_timeout,
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs).min(api_timeout),
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
        }
    }

    /// The title shown above the block; never empty.
    pub fn block_title(&self) -> &str {
        let title = self.block.title.trim();
        if title.is_empty() {
            DEFAULT_BLOCK_TITLE
        } else {
            title
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;

    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    if clean_url(&config.api.url).is_empty() {
        anyhow::bail!(
            "api.url must be an absolute http(s) URL, got '{}'",
            config.api.url
        );
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if config.api.connect_timeout_secs == 0 {
        anyhow::bail!("api.connect_timeout_secs must be > 0");
    }

    Ok(())
}
