/// Typed request client shared by all domain service clients
///
/// Builds gateway URLs, attaches the credential header, paces calls through a
/// rate limiter, and decodes typed JSON responses. Holds no mutable state
/// after construction.
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::apis::descriptor::{canonical_param, RequestDescriptor, ServiceClientConfig, ROUTING_PARAM};
use crate::errors::{GatewayError, GatewayResult};
use crate::logger::{self, LogTag};

/// Header carrying the upstream credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Paces outbound calls to a requests-per-minute budget
///
/// One permit at a time plus a minimum interval between consecutive calls,
/// so a burst of callers queues instead of tripping the upstream limiter.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        let min_interval = if max_per_minute > 0 {
            Duration::from_secs_f64(60.0 / max_per_minute as f64)
        } else {
            Duration::ZERO
        };

        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            last_request: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Wait until the pacing budget allows another request
    pub async fn acquire(&self) -> GatewayResult<RateLimitGuard> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| GatewayError::Transport(format!("rate limiter closed: {}", e)))?;

        if !self.min_interval.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(last_time) = *last {
                let elapsed = last_time.elapsed();
                if elapsed < self.min_interval {
                    tokio::time::sleep(self.min_interval - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// RAII guard returned by [`RateLimiter::acquire`]
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

/// HTTP client bound to one gateway configuration
pub struct ApiClient {
    http: Client,
    config: ServiceClientConfig,
    limiter: RateLimiter,
}

impl ApiClient {
    pub fn new(
        config: ServiceClientConfig,
        rate_limit_per_minute: usize,
        timeout_seconds: u64,
    ) -> GatewayResult<Self> {
        if timeout_seconds == 0 {
            return Err(GatewayError::Config("timeout must be greater than zero".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            limiter: RateLimiter::new(rate_limit_per_minute),
        })
    }

    /// Build the gateway URL for an endpoint path and query parameters
    ///
    /// The routing parameter carries the endpoint path with any leading
    /// separator stripped; remaining parameters follow in insertion order,
    /// null values dropped.
    pub fn build_url(&self, endpoint_path: &str, params: &[(String, Value)]) -> GatewayResult<Url> {
        let base = format!(
            "{}/{}",
            self.config.origin.trim_end_matches('/'),
            self.config.base_path.trim_start_matches('/')
        );
        let mut url = Url::parse(&base)
            .map_err(|e| GatewayError::Config(format!("invalid gateway URL {}: {}", base, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(ROUTING_PARAM, endpoint_path.trim_start_matches('/'));
            for (name, value) in params {
                if value.is_null() {
                    continue;
                }
                pairs.append_pair(name, &canonical_param(value));
            }
        }

        Ok(url)
    }

    /// Execute a descriptor and decode the JSON response as `T`
    ///
    /// Non-success statuses fail with the status preserved; retry policy
    /// belongs to the caller.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> GatewayResult<T> {
        descriptor.validate()?;
        let url = self.build_url(&descriptor.endpoint_path, &descriptor.query)?;

        let _guard = self.limiter.acquire().await?;

        let mut builder = self
            .http
            .request(descriptor.method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            logger::debug(
                LogTag::Api,
                &format!("request to {} failed with status {}", descriptor.endpoint_path, status),
            );
            return Err(GatewayError::RequestFailed { status: status.as_u16() });
        }

        let body = response.text().await?;
        decode_json(&body)
    }
}

/// The single unchecked decode point: the caller's type annotation is
/// trusted, no runtime schema validation is applied. A validation layer can
/// wrap this one function without touching call sites.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> GatewayResult<T> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}
