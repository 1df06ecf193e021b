/// Proxy forwarder endpoint
///
/// Receives a caller's request, resolves the real upstream target from the
/// `endpoint` routing parameter, injects the server-held credential, and
/// relays the upstream JSON or a normalized error envelope. The upstream URL
/// and credential appear only in server-side logs, never in responses.
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::apis::client::API_KEY_HEADER;
use crate::apis::descriptor::ROUTING_PARAM;
use crate::errors::{GatewayError, GatewayResult};
use crate::logger::{self, LogTag};
use crate::webserver::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/proxy", get(forward))
}

/// Error envelope relayed to callers
///
/// Internal detail (upstream URL, credential, transport errors) stays in
/// server-side logs; the body carries only a normalized message.
struct ProxyError(GatewayError);

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self.0 {
            GatewayError::MissingEndpoint => self.0.to_string(),
            GatewayError::RequestFailed { .. } => self.0.to_string(),
            GatewayError::Decode(_) => "upstream returned a malformed body".to_string(),
            _ => "failed to reach upstream".to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn forward(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, ProxyError> {
    let query = query.unwrap_or_default();

    // Order-preserving parse; HashMap extraction would scramble pass-through
    // parameters.
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let endpoint = pairs
        .iter()
        .find(|(name, _)| name == ROUTING_PARAM)
        .map(|(_, value)| value.clone())
        .ok_or(ProxyError(GatewayError::MissingEndpoint))?;

    let passthrough: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(name, _)| name != ROUTING_PARAM)
        .collect();

    let url = resolve_upstream(&state.config.upstream.base_url, &endpoint, &passthrough)
        .map_err(ProxyError)?;

    let body = if state.config.cache.enabled {
        let key = cache_key(&endpoint, &passthrough);
        let ttl = state.cache.default_ttl_ms();
        state
            .cache
            .get_or_compute(&key, ttl, || dispatch(&state, url))
            .await
    } else {
        dispatch(&state, url).await
    };

    body.map(Json).map_err(ProxyError)
}

/// Upstream target: base with trailing separators stripped, then the
/// endpoint, then every pass-through parameter in arrival order
fn resolve_upstream(
    base_url: &str,
    endpoint: &str,
    passthrough: &[(String, String)],
) -> GatewayResult<reqwest::Url> {
    let target = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    let mut url = reqwest::Url::parse(&target)
        .map_err(|e| GatewayError::Config(format!("invalid upstream target: {}", e)))?;

    if !passthrough.is_empty() {
        let mut query = url.query_pairs_mut();
        for (name, value) in passthrough {
            query.append_pair(name, value);
        }
    }

    Ok(url)
}

/// Cache key for a relayed request
///
/// Pairs are re-encoded so a delimiter inside a decoded value cannot make
/// two distinct requests share a key.
fn cache_key(endpoint: &str, passthrough: &[(String, String)]) -> String {
    let mut key = format!("proxy:{}", endpoint.trim_start_matches('/'));
    if !passthrough.is_empty() {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in passthrough {
            query.append_pair(name, value);
        }
        key.push('?');
        key.push_str(&query.finish());
    }
    key
}

/// Issue the upstream call with the credential attached and decode the body
async fn dispatch(state: &AppState, url: reqwest::Url) -> GatewayResult<Value> {
    let _guard = state.limiter.acquire().await?;

    let mut builder = state
        .http
        .get(url.clone())
        .header(CONTENT_TYPE, "application/json");
    if !state.config.upstream.api_key.is_empty() {
        builder = builder.header(API_KEY_HEADER, &state.config.upstream.api_key);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            logger::error(LogTag::Proxy, &format!("upstream dispatch to {} failed: {}", url, e));
            return Err(GatewayError::Transport(e.to_string()));
        }
    };

    let status = response.status();
    if !status.is_success() {
        logger::warning(LogTag::Proxy, &format!("upstream {} responded {}", url, status));
        return Err(GatewayError::RequestFailed { status: status.as_u16() });
    }

    let raw = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;
    crate::apis::client::decode_json(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_strips_separators_on_both_sides() {
        let a = resolve_upstream("https://api.example.com/", "/token/mcap", &[]).unwrap();
        let b = resolve_upstream("https://api.example.com", "token/mcap", &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path(), "/token/mcap");
    }

    #[test]
    fn resolve_copies_passthrough_in_arrival_order() {
        let passthrough = vec![
            ("unit".to_string(), "abc123".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        let url = resolve_upstream("https://api.example.com", "token/holders", &passthrough)
            .unwrap();
        assert_eq!(url.query(), Some("unit=abc123&page=2"));
    }

    #[test]
    fn routing_param_never_reaches_upstream_query() {
        let url = resolve_upstream("https://api.example.com", "token/mcap", &[]).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn cache_key_is_stable_per_endpoint_and_query() {
        let passthrough = vec![("unit".to_string(), "x".to_string())];
        assert_eq!(cache_key("token/mcap", &passthrough), "proxy:token/mcap?unit=x");
        assert_eq!(cache_key("/token/mcap", &passthrough), "proxy:token/mcap?unit=x");
        assert_eq!(cache_key("token/mcap", &[]), "proxy:token/mcap");
    }

    #[test]
    fn cache_key_distinguishes_delimiters_inside_values() {
        // One parameter whose value contains '&' and '=' ...
        let embedded = vec![("unit".to_string(), "a&b=c".to_string())];
        // ... versus two parameters that would decode to the same characters
        let split = vec![
            ("unit".to_string(), "a".to_string()),
            ("b".to_string(), "c".to_string()),
        ];
        assert_ne!(cache_key("e", &embedded), cache_key("e", &split));
    }
}
