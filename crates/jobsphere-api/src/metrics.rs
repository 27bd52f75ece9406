//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "jobsphere_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "jobsphere_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "jobsphere_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "jobsphere_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "jobsphere_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "jobsphere_ws_messages_sent_total";
    pub const WS_MESSAGES_RECEIVED: &str = "jobsphere_ws_messages_received_total";

    // Feed poller metrics
    pub const FEED_SNAPSHOTS_PUBLISHED: &str = "jobsphere_feed_snapshots_published_total";
    pub const FEED_POLL_FAILURES: &str = "jobsphere_feed_poll_failures_total";
    pub const FEED_SUBSCRIBERS: &str = "jobsphere_feed_subscribers";
    pub const FEED_LISTINGS: &str = "jobsphere_feed_listings";

    // Domain metrics
    pub const LISTING_WRITES_TOTAL: &str = "jobsphere_listing_writes_total";
    pub const CONTACT_SUBMISSIONS_TOTAL: &str = "jobsphere_contact_submissions_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "jobsphere_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record WebSocket connection.
pub fn record_ws_connection(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

pub fn record_ws_message_received(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_MESSAGES_RECEIVED, &labels).increment(1);
}

pub fn record_feed_snapshot_published(count: usize) {
    counter!(names::FEED_SNAPSHOTS_PUBLISHED).increment(1);
    gauge!(names::FEED_LISTINGS).set(count as f64);
}

pub fn record_feed_poll_failure() {
    counter!(names::FEED_POLL_FAILURES).increment(1);
}

pub fn set_feed_subscribers(count: usize) {
    gauge!(names::FEED_SUBSCRIBERS).set(count as f64);
}

/// Record a listing create/update/delete.
pub fn record_listing_write(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::LISTING_WRITES_TOTAL, &labels).increment(1);
}

/// Record a contact form submission by outcome.
pub fn record_contact_submission(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::CONTACT_SUBMISSIONS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});
static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").expect("valid regex"));
static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/[a-zA-Z0-9_-]+").expect("valid regex"));

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let path = UUID_RE.replace_all(path, ":id");
    let path = NUMERIC_RE.replace_all(&path, "/:id$1");
    // Firestore auto-ids after /jobs/
    let path = JOB_ID_RE.replace_all(&path, "/jobs/:id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let _in_flight = scopeguard::guard((), |_| {
        gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);
    });

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
