//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_job, delete_job, get_job, health, list_jobs, list_user_jobs, ready, submit_contact,
    update_job,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;
use crate::ws::ws_feed;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).patch(update_job).delete(delete_job))
        .route("/user/jobs", get(list_user_jobs));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    // The contact form writes to Firestore without auth, so it gets its own
    // stricter per-IP limit.
    let contact_rate_limiter = Arc::new(RateLimiterCache::new(state.config.contact_rate_limit_rps));

    let contact_routes = Router::new()
        .route("/contact", post(submit_contact))
        .layer(middleware::from_fn_with_state(
            contact_rate_limiter,
            rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .merge(job_routes)
        .merge(contact_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let ws_routes = Router::new().route("/ws/feed", get(ws_feed));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
