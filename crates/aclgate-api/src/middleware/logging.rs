//! Request logging middleware.
//!
//! Each request runs inside an `http_request` span carrying its request id,
//! so events from the resolvers and the store client are correlated with
//! the request that caused them.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{error, info, info_span, warn, Instrument};

use super::request_id::RequestId;

/// Layer that logs one event per completed request.
#[derive(Clone, Default)]
pub struct RequestLoggingLayer;

impl RequestLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggingService<S>
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
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string());
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string());
        let span = info_span!(
            target: "aclgate::http",
            "http_request",
            request_id = request_id.as_deref(),
            method = %request.method(),
            route = route.as_deref(),
        );
        let uri = request.uri().clone();

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let response = inner.call(request).await?;
                let status = response.status().as_u16();
                let duration_ms = start.elapsed().as_millis() as u64;

                if response.status().is_server_error() {
                    error!(target: "aclgate::http", %uri, status, duration_ms, "request failed");
                } else if response.status().is_client_error() {
                    warn!(target: "aclgate::http", %uri, status, duration_ms, "request rejected");
                } else {
                    info!(target: "aclgate::http", %uri, status, duration_ms, "request completed");
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
