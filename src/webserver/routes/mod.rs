use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::webserver::state::AppState;

pub mod proxy;
pub mod status;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        // Relayed responses are readable from any origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(proxy::routes()).merge(status::routes())
}
