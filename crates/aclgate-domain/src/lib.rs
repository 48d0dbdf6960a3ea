//! aclgate-domain: core access-control translation and resolution logic
//!
//! This crate contains:
//! - The relationship tuple grammar and the typed configuration document
//! - The translator lowering documents into tuples
//! - The bulk tuple-list parser
//! - Hierarchy and subtree resolvers over a relationship store
//! - Authorization token assembly
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               aclgate-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Tuples, documents, nodes     │
//! │  translator/ - Document -> tuple lowering   │
//! │  loader      - Bulk tuple-list parsing      │
//! │  resolver/   - Hierarchy & subtree builds   │
//! │  token/      - Authorization token          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The crate performs no I/O; store access goes through the
//! [`resolver::RelationshipReader`] and [`resolver::RelationshipWriter`]
//! traits.

pub mod error;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod token;
pub mod translator;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use loader::{parse_relationships, ParsedBatch};
pub use model::{AclDocument, Node, ObjectRef, Tuple};
pub use translator::translate;
