//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};
use std::time::Duration;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Authentication Metrics
    pub static ref AUTH_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("codevault_auth_events_total", "Total number of authentication attempts"),
        &["method", "outcome"]
    ).expect("metric can be created");

    // Upstream Metrics
    pub static ref GITHUB_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("codevault_github_requests_total", "Total number of GitHub API requests"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref GITHUB_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "codevault_github_request_duration_seconds",
            "GitHub API request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("codevault_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; duplicate registrations are ignored.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(AUTH_EVENTS_TOTAL.clone()),
        Box::new(GITHUB_REQUESTS_TOTAL.clone()),
        Box::new(GITHUB_REQUEST_DURATION_SECONDS.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }
}

/// Record the outcome of a sign-in or sign-up attempt.
pub fn record_auth_event(method: &str, outcome: &str) {
    AUTH_EVENTS_TOTAL.with_label_values(&[method, outcome]).inc();
}

/// Record a completed GitHub API call.
pub fn observe_github_request(endpoint: &str, status: &str, elapsed: Duration) {
    GITHUB_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status])
        .inc();
    GITHUB_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(elapsed.as_secs_f64());
}
