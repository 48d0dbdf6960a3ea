//! In-memory relationship store for tests and local development.
//!
//! Tuples are kept in a `HashSet` per resource type, so writes are idempotent
//! and O(1). Permissions are evaluated with a direct-relation rule only: a
//! permission on a resource type is held by the subjects of a configured set
//! of relations, wildcard subjects included. There is no recursive userset
//! or arrow evaluation.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::StorageResult;
use crate::traits::{
    validate_object, validate_tuple, HealthStatus, ObjectReference, RelationshipStore,
    StoredTuple, TupleFilter,
};

/// Resource types that grant `view` to their users and to public wildcards.
const VIEWABLE_TYPES: &[&str] = &["api", "page", "partner", "advertiser", "publisher", "feature"];

/// In-memory implementation of RelationshipStore.
///
/// # Performance Characteristics
///
/// - **Write tuple**: O(1) average (HashSet insert)
/// - **Read / lookup**: O(N) in the tuples of the matching resource types
#[derive(Debug, Default)]
pub struct MemoryRelationshipStore {
    /// Tuples keyed by resource type.
    tuples: DashMap<String, HashSet<StoredTuple>>,
    /// Relations granting a permission, keyed by `(resource_type, permission)`.
    permissions: DashMap<(String, String), Vec<String>>,
}

impl MemoryRelationshipStore {
    /// Creates an empty store where every permission is its own relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Creates a store where `view` on accounts, pages, features and apis is
    /// held through `user` and `public`.
    pub fn with_default_permissions() -> Self {
        let store = Self::new();
        for resource_type in VIEWABLE_TYPES {
            store.define_permission(resource_type, "view", &["user", "public"]);
        }
        store
    }

    /// Declares which relations grant `permission` on `resource_type`.
    ///
    /// Without a declaration, a permission is granted only by the relation of
    /// the same name.
    pub fn define_permission(&self, resource_type: &str, permission: &str, relations: &[&str]) {
        self.permissions.insert(
            (resource_type.to_string(), permission.to_string()),
            relations.iter().map(|r| r.to_string()).collect(),
        );
    }

    fn granting_relations(&self, resource_type: &str, permission: &str) -> Vec<String> {
        self.permissions
            .get(&(resource_type.to_string(), permission.to_string()))
            .map(|r| r.value().clone())
            .unwrap_or_else(|| vec![permission.to_string()])
    }

    /// Returns the number of stored tuples.
    pub fn len(&self) -> usize {
        self.tuples.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RelationshipStore for MemoryRelationshipStore {
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn write_tuples(&self, tuples: Vec<StoredTuple>) -> StorageResult<()> {
        for tuple in &tuples {
            validate_tuple(tuple)?;
        }
        for tuple in tuples {
            self.tuples
                .entry(tuple.resource_type.clone())
                .or_default()
                .insert(tuple);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn check_permission(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<bool> {
        validate_object(resource)?;
        validate_object(subject)?;
        let relations = self.granting_relations(&resource.object_type, permission);
        let allowed = self
            .tuples
            .get(&resource.object_type)
            .map(|tuples| {
                tuples.iter().any(|t| {
                    t.resource_id == resource.object_id
                        && relations.contains(&t.relation)
                        && t.grants_to(subject)
                })
            })
            .unwrap_or(false);
        Ok(allowed)
    }

    #[instrument(skip(self))]
    async fn read_tuples(&self, filter: &TupleFilter) -> StorageResult<Vec<StoredTuple>> {
        let matching = |tuples: &HashSet<StoredTuple>| -> Vec<StoredTuple> {
            tuples.iter().filter(|t| filter.matches(t)).cloned().collect()
        };
        let result = match &filter.resource_type {
            Some(resource_type) => self
                .tuples
                .get(resource_type)
                .map(|tuples| matching(tuples.value()))
                .unwrap_or_default(),
            None => self
                .tuples
                .iter()
                .flat_map(|entry| matching(entry.value()))
                .collect(),
        };
        debug!(count = result.len(), "read tuples");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn lookup_resources(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<Vec<String>> {
        validate_object(subject)?;
        let relations = self.granting_relations(resource_type, permission);
        let ids: BTreeSet<String> = self
            .tuples
            .get(resource_type)
            .map(|tuples| {
                tuples
                    .iter()
                    .filter(|t| relations.contains(&t.relation) && t.grants_to(subject))
                    .map(|t| t.resource_id.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn lookup_subjects(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject_type: &str,
    ) -> StorageResult<Vec<String>> {
        validate_object(resource)?;
        let relations = self.granting_relations(&resource.object_type, permission);
        let ids: BTreeSet<String> = self
            .tuples
            .get(&resource.object_type)
            .map(|tuples| {
                tuples
                    .iter()
                    .filter(|t| {
                        t.resource_id == resource.object_id
                            && t.subject_type == subject_type
                            && relations.contains(&t.relation)
                    })
                    .map(|t| t.subject_id.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids.into_iter().collect())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        let tuples = self.len();
        Ok(HealthStatus {
            healthy: true,
            latency: started.elapsed(),
            message: Some(format!("in-memory store with {tuples} tuples")),
        })
    }
}
