//! Same-type resource hierarchy for a subject.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::DomainResult;
use crate::model::{relation, Node, ObjectRef, Tuple};

use super::forest::assemble_forest;
use super::traits::RelationshipReader;
use super::types::RelationshipFilter;

/// Rebuilds the forest of resources of one type that a subject can access.
pub struct HierarchyResolver<R> {
    reader: Arc<R>,
}

impl<R> Clone for HierarchyResolver<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<R: RelationshipReader> HierarchyResolver<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Returns the accessible `resource_type` resources as a forest under a
    /// synthetic root.
    ///
    /// A resource whose parent is not accessible is returned as a root.
    #[instrument(skip(self, subject), fields(subject = %subject))]
    pub async fn resolve(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectRef,
    ) -> DomainResult<Node> {
        let accessible = self
            .reader
            .lookup_resources(resource_type, permission, subject)
            .await?;
        let edges = self
            .reader
            .read_relationships(&RelationshipFilter::same_type_parents(resource_type))
            .await?;
        debug!(
            accessible = accessible.len(),
            edges = edges.len(),
            "fetched hierarchy inputs"
        );
        Ok(build_hierarchy(resource_type, &accessible, &edges))
    }
}

/// Builds the forest from already fetched inputs.
///
/// `parent_edges` may contain relationships of any shape; only `parent`
/// relationships between two `resource_type` resources are used.
pub fn build_hierarchy(resource_type: &str, accessible: &[String], parent_edges: &[Tuple]) -> Node {
    let members: BTreeSet<&str> = accessible.iter().map(String::as_str).collect();
    let edges = parent_edges
        .iter()
        .filter(|t| {
            t.relation == relation::PARENT
                && t.resource_type == resource_type
                && t.subject_type == resource_type
        })
        .map(|t| (t.resource_id.as_str(), t.subject_id.as_str()));
    Node::synthetic_root(resource_type, assemble_forest(resource_type, &members, edges))
}
