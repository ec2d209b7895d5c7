//! Application setup and server configuration.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::QueueEngine;
use crate::kernel::EngineDeps;
use crate::server::middleware::identity_middleware;
use crate::server::routes;

/// Shared application state, cheap to clone (both fields are `Arc`-backed).
#[derive(Clone)]
pub struct AppState {
    pub engine: QueueEngine,
    pub deps: EngineDeps,
}

impl AppState {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            engine: QueueEngine::new(deps.clone()),
            deps,
        }
    }
}

/// Builds the Axum application router (spec §6 "Transport: HTTP/JSON").
pub fn build_app(deps: EngineDeps) -> Router {
    let state = AppState::new(deps.clone());

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let router = Router::new()
        .route("/health", get(routes::health::health_handler))
        .route("/api/enqueue", post(routes::enqueue::enqueue_handler))
        .route("/api/restructure", post(routes::restructure::restructure_handler))
        .route("/api/queue-entries/:id/actions", post(routes::actions::queue_action_handler))
        .route("/api/queue-entries/:id/rating", post(routes::actions::update_rating_handler))
        .route("/api/helper-queue", get(routes::projections::helper_queue_handler))
        .route("/api/helper-wait-times", get(routes::projections::helper_wait_times_handler))
        .route("/api/helpers/:id/recent-actions", get(routes::projections::helper_recent_actions_handler))
        .route("/api/user-queue-history", get(routes::projections::user_queue_history_handler))
        .route("/api/business-queue-history", get(routes::projections::business_queue_history_handler))
        .route("/api/manual-customers", post(routes::manual_customers::add_handler))
        .route("/api/manual-customers/search", get(routes::manual_customers::search_handler))
        .route("/api/break", post(routes::break_resume::set_break_handler))
        .route("/api/resume", post(routes::break_resume::resume_break_handler));

    router
        .layer(middleware::from_fn(identity_middleware))
        .layer(Extension(deps))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
