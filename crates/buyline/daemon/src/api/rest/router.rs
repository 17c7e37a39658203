//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Media buys
        .route("/media-buys", post(handlers::create_media_buy))
        .route("/media-buys", get(handlers::list_media_buys))
        .route("/media-buys/:id", get(handlers::get_media_buy))
        .route("/media-buys/:id/readiness", get(handlers::get_readiness))
        .route("/media-buys/:id/creatives", put(handlers::sync_creatives))
        .route("/media-buys/:id/pause", post(handlers::pause_media_buy))
        .route("/media-buys/:id/resume", post(handlers::resume_media_buy))
        // Creatives
        .route("/creatives/:id/review", post(handlers::review_creative))
        // Workflow steps
        .route("/workflow-steps", get(handlers::list_steps))
        .route("/workflow-steps/:id", get(handlers::get_step))
        .route("/workflow-steps/:id/comments", get(handlers::get_step_comments))
        .route("/workflow-steps/:id/decision", post(handlers::decide_step))
        // Object-to-step lookup
        .route(
            "/objects/:object_type/:object_id/steps",
            get(handlers::get_blocking_steps),
        );

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
