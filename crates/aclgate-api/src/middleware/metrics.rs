//! Metrics collection middleware.
//!
//! Emits through the `metrics` facade, exported by
//! `metrics-exporter-prometheus`:
//!
//! - `aclgate_http_requests_total` - Counter with labels: method, path, status_class
//! - `aclgate_http_request_duration_seconds` - Histogram with the same labels

use std::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower::{Layer, Service};

/// Collected request metrics.
///
/// The atomic counters mirror what is sent to the facade so tests can read
/// them back without installing a recorder.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    request_count: AtomicU64,
    success_count: AtomicU64,
    client_error_count: AtomicU64,
    server_error_count: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished request.
    pub fn record(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let status_class = match status {
            200..=299 => {
                self.success_count.fetch_add(1, Ordering::Relaxed);
                "2xx"
            }
            400..=499 => {
                self.client_error_count.fetch_add(1, Ordering::Relaxed);
                "4xx"
            }
            500..=599 => {
                self.server_error_count.fetch_add(1, Ordering::Relaxed);
                "5xx"
            }
            _ => "other",
        };

        let labels = [
            ("method", method.to_string()),
            ("path", path.to_string()),
            ("status_class", status_class.to_string()),
        ];
        metrics::counter!("aclgate_http_requests_total", &labels).increment(1);
        metrics::histogram!("aclgate_http_request_duration_seconds", &labels).record(duration_secs);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn client_error_count(&self) -> u64 {
        self.client_error_count.load(Ordering::Relaxed)
    }

    pub fn server_error_count(&self) -> u64 {
        self.server_error_count.load(Ordering::Relaxed)
    }
}

/// Layer that collects request metrics.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<RequestMetrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<RequestMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Service that records metrics for each request.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<RequestMetrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let start = Instant::now();
        let method = request.method().to_string();
        // Route patterns keep label cardinality bounded; unmatched requests share one label.
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(request).await?;
            metrics.record(
                &method,
                &path,
                response.status().as_u16(),
                start.elapsed().as_secs_f64(),
            );
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics_by_status_class() {
        let metrics = RequestMetrics::new();
        metrics.record("GET", "/", 200, 0.001);
        metrics.record("POST", "/init", 201, 0.002);
        metrics.record("GET", "/authz/token/:sso_user_id", 404, 0.0005);
        metrics.record("POST", "/check", 503, 0.0015);

        assert_eq!(metrics.request_count(), 4);
        assert_eq!(metrics.success_count(), 2);
        assert_eq!(metrics.client_error_count(), 1);
        assert_eq!(metrics.server_error_count(), 1);
    }
}
