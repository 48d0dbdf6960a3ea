//! Prometheus metrics infrastructure.
//!
//! # Metrics Exposed
//!
//! - `aclgate_http_requests_total` - HTTP requests by method, path, status class
//! - `aclgate_http_request_duration_seconds` - Request duration histogram
//! - `aclgate_tuples_loaded_total` - Tuples written by load operations
//! - `aclgate_tuples_dropped_total` - Tuples rejected by the tuple grammar
//! - `aclgate_token_requests_total` - Token requests by outcome

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Shared state containing the Prometheus handle for metrics rendering.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// A state whose recorder is not installed globally; renders only what
    /// is recorded through it directly.
    pub fn detached() -> Self {
        Self::new(PrometheusBuilder::new().build_recorder().handle())
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;
    register_default_metrics();
    Ok(MetricsState::new(handle))
}

fn register_default_metrics() {
    metrics::describe_counter!("aclgate_http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "aclgate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(
        "aclgate_tuples_loaded_total",
        "Relationship tuples written by load operations"
    );
    metrics::describe_counter!(
        "aclgate_tuples_dropped_total",
        "Relationship tuples rejected by the tuple grammar"
    );
    metrics::describe_counter!(
        "aclgate_token_requests_total",
        "Authorization token requests by outcome"
    );
}

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the `/metrics` endpoint.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

/// Records one token request; `outcome` is `issued`, `not_found`, `invalid` or `error`.
pub fn record_token_request(outcome: &'static str) {
    metrics::counter!("aclgate_token_requests_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_state_renders() {
        let state = MetricsState::detached();
        let cloned = state.clone();
        assert_eq!(state.render(), cloned.render());
    }

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        record_token_request("issued");
        record_token_request("not_found");
    }
}
