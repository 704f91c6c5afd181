use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::source::RecordSource;
use crate::thumbs::ThumbSource;

mod activity;
mod health;
mod logs;
mod meta;
mod stats;
mod status;
mod timeline;

// ---

/// Shared application state passed to all handlers. Collaborators are
/// trait objects so tests can swap in the in-memory source.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RecordSource>,
    pub thumbs: Arc<dyn ThumbSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn RecordSource>, thumbs: Arc<dyn ThumbSource>) -> Self {
        // ---
        Self { source, thumbs }
    }
}

// ---

pub fn router(state: AppState) -> Router {
    // ---
    // CORS is wide open: the dashboard frontend is served from arbitrary
    // origins in the field.
    Router::new()
        .merge(health::router())
        .merge(meta::router())
        .merge(status::router())
        .merge(timeline::router())
        .merge(logs::router())
        .merge(activity::router())
        .merge(stats::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
