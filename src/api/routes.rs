use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id::make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Rankings
        .route("/films/popular", get(handlers::popular_films))
        .route("/films/common", get(handlers::common_films))
        .route("/films/search", get(handlers::search_films))
        .route("/films/director/:director_id", get(handlers::director_films))
        // Likes
        .route(
            "/films/:id/like/:user_id",
            put(handlers::add_like).delete(handlers::remove_like),
        )
        // Users
        .route("/users/:id/recommendations", get(handlers::recommendations))
        .route("/users/:id/feed", get(handlers::feed))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
