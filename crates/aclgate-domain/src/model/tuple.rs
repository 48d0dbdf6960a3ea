//! Relationship tuple grammar.
//!
//! A tuple is serialized as `resourceType:resourceId#relation@subjectType:subjectId`.
//! The same text form is produced by the translator and accepted by the bulk
//! loader, so `parse(serialize(t)) == t` must hold for every well-formed tuple.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subject id denoting "anyone of the subject type".
pub const WILDCARD: &str = "*";

/// A typed object reference (e.g. `partner:10` or `users:42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    /// The type portion (e.g. "partner").
    #[serde(rename = "type")]
    pub object_type: String,
    /// The id portion (e.g. "10").
    pub id: String,
}

impl ObjectRef {
    /// Creates a new reference from type and id.
    pub fn new(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: id.into(),
        }
    }

    /// Parses `type:id`, splitting at the first colon.
    pub fn parse(value: &str) -> Result<Self, TupleParseError> {
        let (object_type, id) = value
            .split_once(':')
            .ok_or_else(|| TupleParseError::InvalidObject(value.to_string()))?;
        if object_type.is_empty() || id.is_empty() {
            return Err(TupleParseError::EmptyComponent(value.to_string()));
        }
        Ok(Self::new(object_type, id))
    }

    /// Returns the `type:id` key used by the resolvers.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.id)
    }
}

/// Errors produced when a tuple string does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleParseError {
    #[error("invalid relation format: {0}")]
    InvalidRelation(String),

    #[error("invalid resource format: {0}")]
    InvalidResource(String),

    #[error("invalid relation/subject format: {0}")]
    InvalidRelationSubject(String),

    #[error("invalid subject format: {0}")]
    InvalidSubject(String),

    #[error("invalid object format: {0}")]
    InvalidObject(String),

    #[error("empty component in: {0}")]
    EmptyComponent(String),
}

/// A single relationship fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub resource_type: String,
    pub resource_id: String,
    pub relation: String,
    pub subject_type: String,
    pub subject_id: String,
}

impl Tuple {
    /// Creates a new tuple from its five components.
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

    /// Returns the resource side as a reference.
    pub fn resource(&self) -> ObjectRef {
        ObjectRef::new(&self.resource_type, &self.resource_id)
    }

    /// Returns the subject side as a reference.
    pub fn subject(&self) -> ObjectRef {
        ObjectRef::new(&self.subject_type, &self.subject_id)
    }

    /// Returns true if the subject is the `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.subject_id == WILDCARD
    }

    /// Returns true if any component is empty.
    pub fn has_empty_component(&self) -> bool {
        self.resource_type.is_empty()
            || self.resource_id.is_empty()
            || self.relation.is_empty()
            || self.subject_type.is_empty()
            || self.subject_id.is_empty()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}@{}:{}",
            self.resource_type, self.resource_id, self.relation, self.subject_type, self.subject_id
        )
    }
}

impl FromStr for Tuple {
    type Err = TupleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split('#').collect();
        let &[left, right] = parts.as_slice() else {
            return Err(TupleParseError::InvalidRelation(value.to_string()));
        };

        let resource: Vec<&str> = left.split(':').collect();
        let &[resource_type, resource_id] = resource.as_slice() else {
            return Err(TupleParseError::InvalidResource(left.to_string()));
        };

        let relation_subject: Vec<&str> = right.split('@').collect();
        let &[relation, subject] = relation_subject.as_slice() else {
            return Err(TupleParseError::InvalidRelationSubject(right.to_string()));
        };

        let subject_parts: Vec<&str> = subject.split(':').collect();
        let &[subject_type, subject_id] = subject_parts.as_slice() else {
            return Err(TupleParseError::InvalidSubject(subject.to_string()));
        };

        let tuple = Tuple::new(resource_type, resource_id, relation, subject_type, subject_id);
        if tuple.has_empty_component() {
            return Err(TupleParseError::EmptyComponent(value.to_string()));
        }
        Ok(tuple)
    }
}
