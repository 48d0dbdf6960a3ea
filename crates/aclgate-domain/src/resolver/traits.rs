//! Traits for the store operations the resolvers and loaders need.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{ObjectRef, Tuple};

use super::types::RelationshipFilter;

/// Read access to the relationship store.
#[async_trait]
pub trait RelationshipReader: Send + Sync {
    /// Lists ids of `resource_type` resources on which `subject` holds
    /// `permission`.
    ///
    /// The result is an unordered set; callers must not rely on its order.
    async fn lookup_resources(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectRef,
    ) -> DomainResult<Vec<String>>;

    /// Reads stored relationships matching the filter.
    async fn read_relationships(&self, filter: &RelationshipFilter) -> DomainResult<Vec<Tuple>>;
}

/// Write access to the relationship store.
#[async_trait]
pub trait RelationshipWriter: Send + Sync {
    /// Writes relationships. Writing an existing relationship is not an error.
    async fn write_relationships(&self, tuples: &[Tuple]) -> DomainResult<()>;
}
