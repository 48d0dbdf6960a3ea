//! Request types for the resolvers.

use serde::{Deserialize, Serialize};

use crate::model::{relation, ObjectRef, Tuple};

/// Filter for reading stored relationships. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFilter {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub relation: Option<String>,
    pub subject_type: Option<String>,
}

impl RelationshipFilter {
    /// Matches every `parent` relationship, across all types.
    pub fn all_parents() -> Self {
        Self {
            relation: Some(relation::PARENT.to_string()),
            ..Self::default()
        }
    }

    /// Matches `parent` relationships between two resources of the same type.
    pub fn same_type_parents(resource_type: &str) -> Self {
        Self {
            resource_type: Some(resource_type.to_string()),
            relation: Some(relation::PARENT.to_string()),
            subject_type: Some(resource_type.to_string()),
            resource_id: None,
        }
    }

    /// Returns true if the tuple satisfies every set field.
    pub fn matches(&self, tuple: &Tuple) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }
        field(&self.resource_type, &tuple.resource_type)
            && field(&self.resource_id, &tuple.resource_id)
            && field(&self.relation, &tuple.relation)
            && field(&self.subject_type, &tuple.subject_type)
    }
}

/// Parameters of a subtree resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeQuery {
    /// The resource every kept path must reach.
    pub root: ObjectRef,
    /// Permission the subject must hold on target-type resources.
    pub permission: String,
    /// Subject whose accessible resources seed the walk.
    pub subject: Option<ObjectRef>,
    /// Only resources of this type are returned.
    pub target_type: Option<String>,
}

impl SubtreeQuery {
    pub fn new(root: ObjectRef, permission: impl Into<String>) -> Self {
        Self {
            root,
            permission: permission.into(),
            subject: None,
            target_type: None,
        }
    }

    pub fn with_subject(mut self, subject: ObjectRef) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    /// Type of the nodes in the result; empty when no target type was given.
    pub fn node_type(&self) -> &str {
        self.target_type.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_set_fields_only() {
        let filter = RelationshipFilter::same_type_parents("partner");
        assert!(filter.matches(&Tuple::new("partner", "2", "parent", "partner", "1")));
        assert!(!filter.matches(&Tuple::new("partner", "2", "parent", "superroot", "1")));
        assert!(!filter.matches(&Tuple::new("partner", "2", "user", "partner", "1")));

        let all = RelationshipFilter::all_parents();
        assert!(all.matches(&Tuple::new("feature", "f", "parent", "advertiser", "5")));
        assert!(RelationshipFilter::default().matches(&Tuple::new("a", "b", "c", "d", "e")));
    }
}
