/// Axum webserver lifecycle
///
/// Startup, shutdown, and graceful termination.
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::errors::{GatewayError, GatewayResult};
use crate::logger::{self, LogTag};
use crate::webserver::{routes, state::AppState};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver; blocks until shut down
pub async fn start_server(state: Arc<AppState>) -> GatewayResult<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.webserver.host, state.config.webserver.port
    )
    .parse()
    .map_err(|e| GatewayError::Config(format!("invalid bind address: {}", e)))?;

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Config(format!("failed to bind to {}: {}", addr, e)))?;

    logger::info(LogTag::Webserver, &format!("🌐 Gateway listening on http://{}", addr));
    logger::info(
        LogTag::Webserver,
        &format!("📡 Proxy endpoint at http://{}/api/proxy", addr),
    );

    let shutdown_signal = async {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(LogTag::Webserver, "Received shutdown signal, stopping webserver...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| GatewayError::Config(format!("server error: {}", e)))?;

    logger::info(LogTag::Webserver, "✅ Webserver stopped gracefully");
    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    SHUTDOWN_NOTIFY.notify_one();
}
