//! Axum router construction for the Chronoatlas API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chronoatlas_runner::TextGenerator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// CORS allows any origin so the map UI can be served from elsewhere
/// during development.
pub fn build_router<G: TextGenerator + 'static>(state: Arc<AppState<G>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Lookups
        .route("/api/districts/locate", get(handlers::locate::<G>))
        .route("/api/entities", get(handlers::list_entities::<G>))
        .route("/api/entities/search", get(handlers::search_entity::<G>))
        .route("/api/timeline/percent", get(handlers::timeline_percent))
        .route("/api/timeline/year", get(handlers::timeline_year))
        // Generation
        .route("/api/analysis", post(handlers::run_analysis::<G>))
        .route("/api/place-history", post(handlers::place_history::<G>))
        .route("/api/dynasty-info", post(handlers::dynasty_info::<G>))
        .route("/api/event-analysis", post(handlers::event_analysis::<G>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
