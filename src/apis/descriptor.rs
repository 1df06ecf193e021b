/// Request descriptors shared by every domain service client
use reqwest::Method;
use serde_json::Value;

use crate::errors::{GatewayError, GatewayResult};

/// Query parameter name reserved by the proxy wire contract for routing.
/// Descriptors must never carry it among their own parameters.
pub const ROUTING_PARAM: &str = "endpoint";

/// Immutable per-client configuration
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Path the proxy endpoint is mounted under, e.g. "/api/proxy"
    pub base_path: String,
    /// Origin the URL is built against, e.g. "https://gateway.example.com"
    pub origin: String,
    /// Credential attached to outbound calls when present
    pub api_key: Option<String>,
}

/// Identifies one upstream call: target path, query parameters, method, body
///
/// Query pairs keep insertion order; `Value::Null` entries are dropped when
/// the URL is built.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub endpoint_path: String,
    pub query: Vec<(String, Value)>,
    pub method: Method,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(endpoint_path: impl Into<String>) -> Self {
        Self {
            endpoint_path: endpoint_path.into(),
            query: Vec::new(),
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(endpoint_path: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint_path: endpoint_path.into(),
            query: Vec::new(),
            method: Method::POST,
            body: Some(body),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Reject descriptors that collide with the proxy's routing parameter
    pub fn validate(&self) -> GatewayResult<()> {
        if self.query.iter().any(|(name, _)| name == ROUTING_PARAM) {
            return Err(GatewayError::Config(format!(
                "query parameter '{}' is reserved for proxy routing",
                ROUTING_PARAM
            )));
        }
        Ok(())
    }
}

/// Canonical string form of a scalar query value
///
/// Strings are taken verbatim (no JSON quoting); numbers and booleans render
/// via their JSON form. `Null` has no canonical form and must be filtered out
/// by the caller.
pub fn canonical_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
