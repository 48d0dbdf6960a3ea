//! API middleware.
//!
//! Includes:
//! - Request correlation ids
//! - Per-request logging spans
//! - Request counters and latency histograms
//! - CORS configuration

mod logging;
mod metrics;
mod request_id;

pub use logging::RequestLoggingLayer;
pub use metrics::{MetricsLayer, RequestMetrics};
pub use request_id::{RequestId, RequestIdLayer, REQUEST_ID_HEADER};

use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Creates the CORS layer for the gateway's GET/POST surface.
///
/// Any origin may call; the request id header is accepted and exposed.
pub fn cors_layer() -> CorsLayer {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, request_id.clone()])
        .expose_headers([request_id])
}
