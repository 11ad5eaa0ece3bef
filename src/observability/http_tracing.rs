//! # HTTP Request Tracing Middleware
//!
//! Wraps every request in an `http_request` span and records request metrics.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, Instrument};

use super::MetricsRecorder;

pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let span = crate::request_span!(method, path);
    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed();
    span.record("status", status);

    MetricsRecorder::new().record_request(&method, status, elapsed.as_secs_f64());
    span.in_scope(|| {
        info!(status, duration_ms = elapsed.as_millis() as u64, "Request completed");
    });

    response
}
