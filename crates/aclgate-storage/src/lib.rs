//! aclgate-storage: relationship store access
//!
//! This crate provides the store client interface used by the gateway:
//! - RelationshipStore trait for relationship reads, writes and lookups
//! - In-memory implementation for tests and local development
//! - SpiceDB implementation over its HTTP/JSON gateway
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               aclgate-storage               │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - RelationshipStore trait      │
//! │  memory.rs   - In-memory implementation     │
//! │  spicedb.rs  - SpiceDB HTTP client          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod spicedb;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRelationshipStore;
pub use spicedb::{SpiceDbConfig, SpiceDbHttpStore};
pub use traits::{HealthStatus, ObjectReference, RelationshipStore, StoredTuple, TupleFilter};
