pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Storage;
use crate::state::AppState;

/// Full HTTP application over an already opened store.
pub fn create_app(storage: Arc<dyn Storage>) -> axum::Router {
    let state = AppState::new(storage);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
