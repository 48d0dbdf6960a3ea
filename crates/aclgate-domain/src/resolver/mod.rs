//! Reconstruction of resource trees from flat store results.
//!
//! Both resolvers fetch their inputs through [`RelationshipReader`] and then
//! hand them to a pure builder ([`build_hierarchy`], [`build_subtree`]) that
//! owns no state across calls.
//!
//! - **Hierarchy**: all accessible resources of one type, linked by
//!   same-type `parent` relationships, always under a synthetic root.
//! - **Subtree**: accessible resources of a target type whose `parent` chain
//!   (possibly crossing types) reaches a given root.
//!
//! Children are ordered by id so output does not depend on the store's
//! enumeration order.

mod forest;
mod hierarchy;
mod subtree;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use hierarchy::{build_hierarchy, HierarchyResolver};
pub use subtree::{build_subtree, SubtreeResolver};
pub use traits::{RelationshipReader, RelationshipWriter};
pub use types::{RelationshipFilter, SubtreeQuery};
