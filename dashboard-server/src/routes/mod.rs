pub mod backup;
pub mod health;
pub mod logs;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let index_html = static_dir.join("index.html");

    Router::new()
        .nest("/api/md-backup", backup::router())
        .nest("/api/logs", logs::router())
        .route("/api/health", axum::routing::get(health::health))
        .route("/events", axum::routing::get(logs::events))
        .fallback_service(ServeDir::new(&static_dir).fallback(ServeFile::new(index_html)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
