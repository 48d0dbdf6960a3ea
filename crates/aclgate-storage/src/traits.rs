//! RelationshipStore trait definition.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Subject id granting a relation to every subject of a type.
pub const WILDCARD: &str = "*";

/// A typed reference to a resource or subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectReference {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// Filter for reading tuples. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleFilter {
    /// Filter by resource type.
    pub resource_type: Option<String>,
    /// Filter by resource ID.
    pub resource_id: Option<String>,
    /// Filter by relation.
    pub relation: Option<String>,
    /// Filter by subject type.
    pub subject_type: Option<String>,
}

impl TupleFilter {
    /// Returns true if the tuple satisfies every set field.
    pub fn matches(&self, tuple: &StoredTuple) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }
        field(&self.resource_type, &tuple.resource_type)
            && field(&self.resource_id, &tuple.resource_id)
            && field(&self.relation, &tuple.relation)
            && field(&self.subject_type, &tuple.subject_type)
    }
}

/// A stored tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredTuple {
    pub resource_type: String,
    pub resource_id: String,
    pub relation: String,
    pub subject_type: String,
    pub subject_id: String,
}

impl StoredTuple {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        relation: impl Into<String>,
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            relation: relation.into(),
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }

    pub fn resource(&self) -> ObjectReference {
        ObjectReference::new(&self.resource_type, &self.resource_id)
    }

    /// Returns true if this tuple's subject side covers `subject`.
    pub fn grants_to(&self, subject: &ObjectReference) -> bool {
        self.subject_type == subject.object_type
            && (self.subject_id == subject.object_id || self.subject_id == WILDCARD)
    }
}

/// Result of a store health check.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency: Duration,
    pub message: Option<String>,
}

/// Client interface to a relationship-based permission store.
///
/// Implementations must be thread-safe (Send + Sync). Results of the
/// enumerating operations are unordered.
#[async_trait]
pub trait RelationshipStore: Send + Sync + 'static {
    /// Writes tuples. Writing an existing tuple is not an error.
    async fn write_tuples(&self, tuples: Vec<StoredTuple>) -> StorageResult<()>;

    /// Checks whether `subject` holds `permission` on `resource`.
    async fn check_permission(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<bool>;

    /// Reads tuples matching the filter.
    async fn read_tuples(&self, filter: &TupleFilter) -> StorageResult<Vec<StoredTuple>>;

    /// Lists ids of `resource_type` resources on which `subject` holds
    /// `permission`.
    async fn lookup_resources(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<Vec<String>>;

    /// Lists ids of `subject_type` subjects holding `permission` on
    /// `resource`. A wildcard grant is reported as `*`.
    async fn lookup_subjects(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject_type: &str,
    ) -> StorageResult<Vec<String>>;

    /// Checks that the store is reachable.
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}

/// Rejects tuples with an empty component.
pub fn validate_tuple(tuple: &StoredTuple) -> StorageResult<()> {
    let components = [
        ("resource_type", &tuple.resource_type),
        ("resource_id", &tuple.resource_id),
        ("relation", &tuple.relation),
        ("subject_type", &tuple.subject_type),
        ("subject_id", &tuple.subject_id),
    ];
    for (name, value) in components {
        if value.is_empty() {
            return Err(StorageError::InvalidInput {
                message: format!("{name} cannot be empty"),
            });
        }
    }
    Ok(())
}

/// Rejects an empty object reference.
pub fn validate_object(object: &ObjectReference) -> StorageResult<()> {
    if object.object_type.is_empty() || object.object_id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("object reference '{object}' must have a type and an id"),
        });
    }
    Ok(())
}
