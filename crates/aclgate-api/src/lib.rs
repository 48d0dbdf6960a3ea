//! aclgate-api: HTTP gateway over a relationship store
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints via Axum
//! - Storage-to-domain adapters
//! - Middleware (request id, metrics, logging)
//! - Logging and Prometheus setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 aclgate-api                 │
//! ├─────────────────────────────────────────────┤
//! │  http/          - HTTP REST endpoints       │
//! │  adapters       - Store -> domain traits    │
//! │  middleware/    - Request id, metrics, logs │
//! │  observability/ - Logging, Prometheus       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod http;
pub mod middleware;
pub mod observability;
