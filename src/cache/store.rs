/// Backing key-value stores for the cache manager
///
/// The store contract is string keys to string-serialized values; whatever
/// shape was serialized on write is what the reader must expect back.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")] Request(String),

    #[error("unexpected store response: {0}")] Response(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Get/set/delete over string keys and string-serialized values
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a value; `ttl_ms <= 0` means no store-level expiry
    async fn set(&self, key: &str, value: &str, ttl_ms: i64) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// REST key-value store client (Upstash-style wire protocol)
///
/// `GET {base}/get/{key}`, `POST {base}/set/{key}?px={ttl}` with the value as
/// the request body, `POST {base}/del/{key}`; every response is
/// `{"result": ...}` and authentication is a bearer token.
pub struct RestKvStore {
    http: Client,
    base_url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn command_url(&self, command: &str, key: &str) -> StoreResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| StoreError::Request(format!("invalid store URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Request("store URL cannot be a base".to_string()))?
            .push(command)
            .push(key);
        Ok(url)
    }

    fn parse_result(body: &str) -> StoreResult<Value> {
        let parsed: Value = serde_json::from_str(body)
            .map_err(|e| StoreError::Response(format!("invalid JSON: {}", e)))?;
        match parsed {
            Value::Object(mut fields) => fields
                .remove("result")
                .ok_or_else(|| StoreError::Response("missing 'result' field".to_string())),
            other => Err(StoreError::Response(format!("expected object, got {}", other))),
        }
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> StoreResult<Value> {
        let response = builder
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Request(format!("store returned status {}", status)));
        }
        Self::parse_result(&body)
    }
}

#[async_trait]
impl CacheStore for RestKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let url = self.command_url("get", key)?;
        match self.execute(self.http.get(url)).await? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            other => Err(StoreError::Response(format!("non-string value: {}", other))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_ms: i64) -> StoreResult<()> {
        let mut url = self.command_url("set", key)?;
        if ttl_ms > 0 {
            url.query_pairs_mut().append_pair("px", &ttl_ms.to_string());
        }
        self.execute(self.http.post(url).body(value.to_string())).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let url = self.command_url("del", key)?;
        self.execute(self.http.post(url)).await?;
        Ok(())
    }
}

/// In-process store used when no REST store is configured
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((_, Some(expires_at))) if Instant::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_ms: i64) -> StoreResult<()> {
        let expires_at = if ttl_ms > 0 {
            Some(Instant::now() + Duration::from_millis(ttl_ms as u64))
        } else {
            None
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
