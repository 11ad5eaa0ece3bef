//! # Observability Infrastructure
//!
//! Structured logging, Prometheus metrics and per-request tracing for the
//! gateway.

pub mod http_tracing;
pub mod logging;
pub mod metrics;

pub use http_tracing::track_requests;
pub use logging::init_logging;
pub use metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging and, when an exporter address is configured, metrics.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_logging(config)?;

    if let Some(addr) = config.metrics_addr.as_deref() {
        init_metrics(addr)?;
    }

    info!(
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.metrics_addr.is_some(),
        "Observability initialized"
    );

    Ok(())
}
