//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain layer (aclgate-domain) defines narrow traits for store access:
//! - `RelationshipReader`: resource lookups and relationship reads
//! - `RelationshipWriter`: relationship writes
//!
//! The storage layer (aclgate-storage) implements `RelationshipStore` with
//! concrete backends. These adapters implement the domain traits on top of any
//! `RelationshipStore` and translate storage errors into domain errors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use aclgate_domain::error::{DomainError, DomainResult};
use aclgate_domain::model::{ObjectRef, Tuple};
use aclgate_domain::resolver::{RelationshipFilter, RelationshipReader, RelationshipWriter};
use aclgate_storage::{ObjectReference, RelationshipStore, StorageError, StoredTuple, TupleFilter};

/// Implements the domain store traits using a `RelationshipStore`.
pub struct StoreAdapter<S: ?Sized> {
    storage: Arc<S>,
}

impl<S: ?Sized> StoreAdapter<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: ?Sized> Clone for StoreAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

#[async_trait]
impl<S: RelationshipStore + ?Sized> RelationshipReader for StoreAdapter<S> {
    async fn lookup_resources(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectRef,
    ) -> DomainResult<Vec<String>> {
        self.storage
            .lookup_resources(resource_type, permission, &to_reference(subject))
            .await
            .map_err(to_domain_error)
    }

    async fn read_relationships(&self, filter: &RelationshipFilter) -> DomainResult<Vec<Tuple>> {
        let filter = TupleFilter {
            resource_type: filter.resource_type.clone(),
            resource_id: filter.resource_id.clone(),
            relation: filter.relation.clone(),
            subject_type: filter.subject_type.clone(),
        };
        let tuples = self
            .storage
            .read_tuples(&filter)
            .await
            .map_err(to_domain_error)?;
        Ok(tuples.into_iter().map(to_tuple).collect())
    }
}

#[async_trait]
impl<S: RelationshipStore + ?Sized> RelationshipWriter for StoreAdapter<S> {
    async fn write_relationships(&self, tuples: &[Tuple]) -> DomainResult<()> {
        let stored = tuples
            .iter()
            .map(|t| {
                StoredTuple::new(
                    &t.resource_type,
                    &t.resource_id,
                    &t.relation,
                    &t.subject_type,
                    &t.subject_id,
                )
            })
            .collect();
        self.storage
            .write_tuples(stored)
            .await
            .map_err(to_domain_error)
    }
}

pub(crate) fn to_reference(object: &ObjectRef) -> ObjectReference {
    ObjectReference::new(&object.object_type, &object.id)
}

fn to_tuple(t: StoredTuple) -> Tuple {
    Tuple::new(
        t.resource_type,
        t.resource_id,
        t.relation,
        t.subject_type,
        t.subject_id,
    )
}

/// Maps a storage error to the domain taxonomy.
///
/// Unreachable stores and timeouts become `StoreUnavailable`; every other
/// failure is an answered error and becomes `StorageOperationFailed`.
pub fn to_domain_error(err: StorageError) -> DomainError {
    error!(error = %err, "relationship store call failed");
    match err {
        StorageError::InvalidInput { message } => DomainError::InvalidParameter {
            parameter: "relationship".to_string(),
            reason: message,
        },
        e if e.is_unavailable() => DomainError::StoreUnavailable {
            reason: e.to_string(),
        },
        e => DomainError::StorageOperationFailed {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclgate_storage::MemoryRelationshipStore;

    #[tokio::test]
    async fn test_writer_and_reader_round_trip_through_store() {
        let storage = Arc::new(MemoryRelationshipStore::with_default_permissions());
        let adapter = StoreAdapter::new(Arc::clone(&storage));

        adapter
            .write_relationships(&[
                Tuple::new("partner", "2", "parent", "partner", "1"),
                Tuple::new("partner", "2", "user", "users", "7"),
            ])
            .await
            .unwrap();

        let parents = adapter
            .read_relationships(&RelationshipFilter::same_type_parents("partner"))
            .await
            .unwrap();
        assert_eq!(parents, vec![Tuple::new("partner", "2", "parent", "partner", "1")]);

        let ids = adapter
            .lookup_resources("partner", "view", &ObjectRef::new("users", "7"))
            .await
            .unwrap();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn test_adapter_over_trait_object() {
        let storage: Arc<dyn RelationshipStore> = Arc::new(MemoryRelationshipStore::new());
        let adapter = StoreAdapter::new(storage);

        let err = adapter
            .write_relationships(&[Tuple::new("partner", "", "user", "users", "7")])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidParameter { .. }));
    }

    #[test]
    fn test_error_mapping() {
        let unavailable = to_domain_error(StorageError::ConnectionError {
            message: "refused".to_string(),
        });
        assert!(matches!(unavailable, DomainError::StoreUnavailable { .. }));

        let timeout = to_domain_error(StorageError::QueryTimeout {
            message: "slow".to_string(),
        });
        assert!(matches!(timeout, DomainError::StoreUnavailable { .. }));

        let failed = to_domain_error(StorageError::QueryError {
            message: "bad".to_string(),
        });
        assert!(matches!(failed, DomainError::StorageOperationFailed { .. }));
    }
}
