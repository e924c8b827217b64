pub mod health;
pub mod tvl;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adapters::AdapterRegistry;

pub use health::health_check;
pub use tvl::{get_borrowed, get_tvl, list_protocols};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AdapterRegistry>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/protocols", get(list_protocols))
        .route("/protocols/:name/:chain/tvl", get(get_tvl))
        .route("/protocols/:name/:chain/borrowed", get(get_borrowed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
