/// Integration tests for the proxy forwarder
///
/// A stub upstream server records what the gateway sends it; the gateway
/// router is driven directly with `tower::ServiceExt::oneshot`.
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use marketgate::cache::{CacheManager, MemoryStore};
use marketgate::config::{CacheConfig, Config, UpstreamConfig, WebserverConfig};
use marketgate::webserver::routes::create_router;
use marketgate::webserver::AppState;

#[derive(Debug, Clone)]
struct SeenRequest {
    path: String,
    query: String,
    api_key: Option<String>,
}

#[derive(Clone)]
struct StubUpstream {
    base_url: String,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

/// Spawn a stub upstream that answers every request with a fixed status and
/// JSON body while recording path, query, and credential header
async fn spawn_stub(status: StatusCode, body: Value) -> StubUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));

    let hits_handler = Arc::clone(&hits);
    let seen_handler = Arc::clone(&seen);
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| {
        let hits = Arc::clone(&hits_handler);
        let seen = Arc::clone(&seen_handler);
        let body = body.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(SeenRequest {
                path: uri.path().to_string(),
                query: uri.query().unwrap_or_default().to_string(),
                api_key: headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string()),
            });
            (status, Json(body))
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubUpstream {
        base_url: format!("http://{}", addr),
        hits,
        seen,
    }
}

fn gateway(base_url: &str, cache_enabled: bool) -> Router {
    let config = Config {
        upstream: UpstreamConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            rate_limit_per_minute: 0,
            timeout_seconds: 5,
        },
        cache: CacheConfig {
            enabled: cache_enabled,
            store_url: String::new(),
            store_token: String::new(),
            default_ttl_ms: 60_000,
        },
        webserver: WebserverConfig::default(),
    };
    let cache = Arc::new(CacheManager::new(Arc::new(MemoryStore::new()), 60_000));
    let state = Arc::new(AppState::new(config, cache).unwrap());
    create_router(state)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn passthrough_params_reach_upstream_without_routing_param() {
    let stub = spawn_stub(StatusCode::OK, json!({"mcap": 123})).await;
    let app = gateway(&stub.base_url, false);

    let (status, body) = call(app, "/api/proxy?endpoint=token/mcap&unit=abc123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"mcap": 123}));

    let seen = stub.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/token/mcap");
    assert_eq!(seen[0].query, "unit=abc123");
    assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
}

#[tokio::test]
async fn missing_endpoint_is_rejected_without_upstream_call() {
    let stub = spawn_stub(StatusCode::OK, json!({})).await;
    let app = gateway(&stub.base_url, false);

    let (status, body) = call(app, "/api/proxy?unit=abc123").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("endpoint"));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_error_status_is_relayed_with_normalized_body() {
    let stub = spawn_stub(StatusCode::NOT_FOUND, json!({"detail": "no such token"})).await;
    let app = gateway(&stub.base_url, false);

    let (status, body) = call(app, "/api/proxy?endpoint=token/mcap&unit=nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("404"));
    // Neither the upstream address nor the credential may leak
    assert!(!message.contains(&stub.base_url));
    assert!(!message.contains("test-key"));
}

#[tokio::test]
async fn transport_failure_is_a_generic_server_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let app = gateway(&format!("http://{}", dead_addr), false);
    let (status, body) = call(app, "/api/proxy?endpoint=token/mcap").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert_eq!(message, "failed to reach upstream");
}

#[tokio::test]
async fn separators_are_normalized_when_resolving_upstream() {
    let stub = spawn_stub(StatusCode::OK, json!({"ok": true})).await;
    let app = gateway(&format!("{}/", stub.base_url), false);

    let (status, _) = call(app, "/api/proxy?endpoint=%2Ftoken%2Fmcap").await;

    assert_eq!(status, StatusCode::OK);
    let seen = stub.seen.lock().unwrap();
    assert_eq!(seen[0].path, "/token/mcap");
}

#[tokio::test]
async fn cached_relay_hits_upstream_once() {
    let stub = spawn_stub(StatusCode::OK, json!({"holders": 9000})).await;
    let app = gateway(&stub.base_url, true);

    for _ in 0..3 {
        let (status, body) =
            call(app.clone(), "/api/proxy?endpoint=token/holders&unit=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"holders": 9000}));
    }
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);

    // A different query is a different cache key
    let (status, _) = call(app.clone(), "/api/proxy?endpoint=token/holders&unit=other").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn encoded_delimiters_in_values_do_not_collide_in_cache() {
    let stub = spawn_stub(StatusCode::OK, json!({"ok": true})).await;
    let app = gateway(&stub.base_url, true);

    // One parameter whose decoded value is "a&b=c"
    let (status, _) = call(app.clone(), "/api/proxy?endpoint=e&unit=a%26b%3Dc").await;
    assert_eq!(status, StatusCode::OK);

    // Two parameters that decode to the same character sequence
    let (status, _) = call(app.clone(), "/api/proxy?endpoint=e&unit=a&b=c").await;
    assert_eq!(status, StatusCode::OK);

    // Distinct requests must each reach the upstream
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
    let seen = stub.seen.lock().unwrap();
    assert_eq!(seen[0].query, "unit=a%26b%3Dc");
    assert_eq!(seen[1].query, "unit=a&b=c");
}

#[tokio::test]
async fn malformed_upstream_body_is_a_generic_server_error() {
    // Upstream answers 200 but the body is not JSON
    let app_stub = Router::new().fallback(|| async { "<html>rate limited</html>" });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app_stub).await.unwrap();
    });

    let app = gateway(&format!("http://{}", addr), false);
    let (status, body) = call(app, "/api/proxy?endpoint=token/mcap").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upstream returned a malformed body");
}

#[tokio::test]
async fn upstream_errors_are_never_cached() {
    let stub = spawn_stub(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let app = gateway(&stub.base_url, true);

    for _ in 0..2 {
        let (status, _) = call(app.clone(), "/api/proxy?endpoint=token/mcap&unit=abc").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    // Both requests reached the upstream: failures bypass the cache
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn responses_grant_any_origin_read_access() {
    let stub = spawn_stub(StatusCode::OK, json!({"ok": true})).await;
    let app = gateway(&stub.base_url, false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/proxy?endpoint=token/mcap")
                .header("origin", "https://dashboard.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn status_endpoint_reports_cache_metrics() {
    let stub = spawn_stub(StatusCode::OK, json!({"ok": true})).await;
    let app = gateway(&stub.base_url, true);

    let (_, _) = call(app.clone(), "/api/proxy?endpoint=token/mcap&unit=a").await;
    let (_, _) = call(app.clone(), "/api/proxy?endpoint=token/mcap&unit=a").await;

    let (status, body) = call(app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache"]["hits"], 1);
    assert_eq!(body["cache"]["misses"], 1);
}
