use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default TTL applied to cached upstream responses: 1 hour
pub const DEFAULT_CACHE_TTL_MS: i64 = 3_600_000;

/// Default timeout for outbound upstream calls
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub webserver: WebserverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the proxied market-data API
    pub base_url: String,
    /// Credential injected server-side on every upstream call
    #[serde(default)]
    pub api_key: String,
    /// Requests per minute allowed against the upstream
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// REST key-value store endpoint; empty means in-memory store
    #[serde(default)]
    pub store_url: String,
    #[serde(default)]
    pub store_token: String,
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebserverConfig {
    pub host: String,
    pub port: u16,
}

fn default_rate_limit() -> usize {
    60
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_ttl_ms() -> i64 {
    DEFAULT_CACHE_TTL_MS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_url: String::new(),
            store_token: String::new(),
            default_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: String::new(),
                api_key: String::new(),
                rate_limit_per_minute: default_rate_limit(),
                timeout_seconds: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            },
            cache: CacheConfig::default(),
            webserver: WebserverConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file does not exist, a default skeleton is written so the
    /// operator has something to fill in, and an error is returned since the
    /// upstream section cannot be defaulted.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            Self::save_default(path)?;
            anyhow::bail!(
                "config file not found; wrote a default skeleton to {} - fill in [upstream] and restart",
                path
            );
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration skeleton
    pub fn save_default(path: &str) -> Result<()> {
        let rendered = toml::to_string_pretty(&Config::default())
            .context("failed to serialize default config")?;
        fs::write(path, rendered)
            .with_context(|| format!("failed to write default config to {}", path))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.upstream.base_url.trim().is_empty() {
            anyhow::bail!("upstream.base_url is required");
        }
        if self.cache.enabled && !self.cache.store_url.trim().is_empty()
            && self.cache.store_token.trim().is_empty()
        {
            anyhow::bail!("cache.store_token is required when cache.store_url is set");
        }
        Ok(())
    }
}
