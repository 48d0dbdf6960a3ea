//! aclgate-server: configuration and request handlers
//!
//! This crate contains the layer between the HTTP surface and the domain:
//! - Configuration management
//! - Load handler for translated documents and tuple lists
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               aclgate-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  handlers/   - Request handlers             │
//! │    load.rs        - Document & bulk loads   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::{DocumentLoad, LoadHandler, LoadReport};
