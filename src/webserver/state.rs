/// Shared application state for the webserver
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::apis::client::RateLimiter;
use crate::cache::CacheManager;
use crate::config::Config;
use crate::errors::{GatewayError, GatewayResult};

/// State passed to all route handlers
pub struct AppState {
    pub config: Arc<Config>,

    /// Outbound client for upstream dispatch
    pub http: Client,

    /// Paces upstream calls to the configured budget
    pub limiter: RateLimiter,

    pub cache: Arc<CacheManager>,

    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: Config, cache: Arc<CacheManager>) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;

        let limiter = RateLimiter::new(config.upstream.rate_limit_per_minute);

        Ok(Self {
            config: Arc::new(config),
            http,
            limiter,
            cache,
            startup_time: chrono::Utc::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
