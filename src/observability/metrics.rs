//! # Metrics Collection
//!
//! Prometheus metrics for state requests and backend failures.

use std::net::SocketAddr;

use ::tracing::info;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::{Error, Result};
use crate::listener::normalize_listen_addr;

/// Records gateway metrics through the global `metrics` recorder.
///
/// Without an installed exporter every call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record a completed state request
    pub fn record_request(&self, method: &str, status: u16, duration: f64) {
        let labels = [("method", method.to_string()), ("status", status.to_string())];
        counter!("tfstate_requests_total", &labels).increment(1);

        let method_label = [("method", method.to_string())];
        histogram!("tfstate_request_duration_seconds", &method_label).record(duration);
    }

    /// Record a failed secret store call (`read`, `write`, `session`, `auth`)
    pub fn record_backend_error(&self, operation: &str) {
        let labels = [("operation", operation.to_string())];
        counter!("tfstate_backend_errors_total", &labels).increment(1);
    }

    /// Register descriptions so the exporter lists metrics before first use.
    pub fn register(&self) {
        describe_counter!(
            "tfstate_requests_total",
            Unit::Count,
            "State requests grouped by method and response status"
        );
        describe_histogram!(
            "tfstate_request_duration_seconds",
            Unit::Seconds,
            "State request latency"
        );
        describe_counter!(
            "tfstate_backend_errors_total",
            Unit::Count,
            "Secret store failures grouped by operation"
        );
    }
}

/// Install the Prometheus exporter on `addr` (`:9100` style accepted).
pub fn init_metrics(addr: &str) -> Result<()> {
    let normalized = normalize_listen_addr(addr);
    let socket_addr: SocketAddr = normalized
        .parse()
        .map_err(|e| Error::config(format!("Invalid metrics address '{}': {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", crate::APP_NAME)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register();

    info!(metrics_addr = %socket_addr, "Prometheus metrics exporter started");
    Ok(())
}
