use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder and return the handle for scraping.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe_counter!(
        "mirror_http_requests_total",
        "Total number of upstream HTTP requests issued by the mirroring engine"
    );
    describe_histogram!(
        "mirror_http_request_duration_seconds",
        "Upstream HTTP request duration in seconds, including retries"
    );
    describe_counter!(
        "mirror_assets_total",
        "Total number of asset references encountered by the localiser"
    );
    describe_counter!(
        "mirror_projects_total",
        "Total number of projects processed by outcome"
    );
    describe_counter!(
        "mirror_screens_total",
        "Total number of screens processed by outcome"
    );
    describe_counter!(
        "serve_requests_total",
        "Total number of requests served by the read API"
    );
    describe_histogram!(
        "serve_request_duration_seconds",
        "Read API request duration in seconds"
    );

    counter!("mirror_projects_total", "outcome" => "successful").absolute(0);
    counter!("mirror_projects_total", "outcome" => "ignored").absolute(0);
    counter!("mirror_projects_total", "outcome" => "failed").absolute(0);
    counter!("mirror_assets_total", "outcome" => "downloaded").absolute(0);
    counter!("mirror_assets_total", "outcome" => "skipped").absolute(0);

    handle
}

/// Record an upstream HTTP call made by the mirroring engine.
pub fn record_upstream_request(method: &str, status: Option<u16>, duration: std::time::Duration) {
    let status_label = status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string());
    let labels = [("method", method.to_string()), ("status", status_label)];

    counter!("mirror_http_requests_total", &labels).increment(1);
    histogram!("mirror_http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record an asset localisation decision (downloaded vs. skipped because it already existed).
pub fn record_asset(downloaded: bool) {
    let labels = [("outcome", if downloaded { "downloaded" } else { "skipped" })];
    counter!("mirror_assets_total", &labels).increment(1);
}

/// Record a project-level run outcome: "successful", "ignored", or "failed".
pub fn record_project_outcome(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("mirror_projects_total", &labels).increment(1);
}

/// Record a screen-level run outcome.
pub fn record_screen_outcome(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("mirror_screens_total", &labels).increment(1);
}

/// Record a served read-API request with its method, path, status, and duration.
pub fn record_request(method: &str, path: &str, status: u16, duration: std::time::Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!("serve_requests_total", &labels).increment(1);
    histogram!("serve_request_duration_seconds", &labels).record(duration.as_secs_f64());
}
