//! Axum HTTP/WS API server for JobSphere.
//!
//! This crate provides:
//! - REST endpoints for job listings and the contact form
//! - Firebase ID token verification and owner checks
//! - A shared listing poller feeding live WebSocket feeds
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;


pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{FeedSnapshot, ListingFeed, ListingSource};
pub use state::AppState;
