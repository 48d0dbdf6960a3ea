//! Reconstructed resource trees.

use serde::{Deserialize, Serialize};

/// Id used by the synthetic container node that wraps several roots.
pub const SYNTHETIC_ROOT_ID: &str = "root";

/// A resource with its owned children.
///
/// Nodes are built per request from flat store results and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a leaf node.
    pub fn new(node_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            children: Vec::new(),
        }
    }

    /// Creates a node with the given children.
    pub fn with_children(
        node_type: impl Into<String>,
        id: impl Into<String>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            children,
        }
    }

    /// Creates the synthetic container node of a forest.
    pub fn synthetic_root(node_type: impl Into<String>, roots: Vec<Node>) -> Self {
        Self::with_children(node_type, SYNTHETIC_ROOT_ID, roots)
    }

    /// Returns the `type:id` key of this node.
    pub fn key(&self) -> String {
        format!("{}:{}", self.node_type, self.id)
    }

    /// Returns the ids of every node below this one in depth-first pre-order.
    ///
    /// The node itself is not included; call this on a synthetic root to
    /// flatten a forest.
    pub fn descendant_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let mut stack: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.id.clone());
            stack.extend(node.children.iter().rev());
        }
        ids
    }

    /// Returns the number of nodes in this tree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant_ids_are_preorder() {
        let tree = Node::synthetic_root(
            "partner",
            vec![
                Node::with_children("partner", "1", vec![Node::new("partner", "2")]),
                Node::new("partner", "3"),
            ],
        );
        assert_eq!(tree.descendant_ids(), vec!["1", "2", "3"]);
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_leaf_serializes_without_children() {
        let json = serde_json::to_value(Node::new("advertiser", "5")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "5", "type": "advertiser"}));
    }
}
