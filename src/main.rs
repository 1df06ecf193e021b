use clap::Parser;
use std::sync::Arc;

use marketgate::arguments::Arguments;
use marketgate::cache::{CacheManager, CacheStore, MemoryStore, RestKvStore};
use marketgate::config::Config;
use marketgate::logger::{self, LogTag};
use marketgate::webserver::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    logger::init(args.debug);

    let mut config = Config::load(&args.config)?;
    if let Some(port) = args.port {
        config.webserver.port = port;
    }

    let store: Arc<dyn CacheStore> = if config.cache.store_url.trim().is_empty() {
        logger::info(LogTag::Cache, "No store configured, using in-memory cache");
        Arc::new(MemoryStore::new())
    } else {
        logger::info(
            LogTag::Cache,
            &format!("Using REST key-value store at {}", config.cache.store_url),
        );
        Arc::new(RestKvStore::new(&config.cache.store_url, &config.cache.store_token))
    };
    let cache = Arc::new(CacheManager::new(store, config.cache.default_ttl_ms));

    logger::info(
        LogTag::Config,
        &format!("Proxying upstream {}", config.upstream.base_url),
    );

    let state = Arc::new(AppState::new(config, cache)?);

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            webserver::shutdown();
        }
    });

    webserver::start_server(state).await?;
    Ok(())
}
