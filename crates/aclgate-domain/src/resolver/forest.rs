//! Forest assembly shared by the hierarchy and subtree resolvers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::model::Node;

/// Links `members` into a forest of `node_type` nodes.
///
/// `edges` are `(child, parent)` id pairs; edges with an endpoint outside
/// `members` are ignored. A member with no linked parent is a root. A child
/// with several linked parents appears under each of them. Members that are
/// only reachable through a cycle are promoted to roots, and a cycle is cut
/// where it would revisit a node already on the current path.
///
/// Roots and children come out ordered by id.
pub(crate) fn assemble_forest<'a>(
    node_type: &str,
    members: &BTreeSet<&'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<Node> {
    let mut children: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut attached: HashSet<&str> = HashSet::new();
    for (child, parent) in edges {
        if child == parent || !members.contains(child) || !members.contains(parent) {
            continue;
        }
        children.entry(parent).or_default().insert(child);
        attached.insert(child);
    }

    let mut builder = Builder {
        node_type,
        children: &children,
        path: HashSet::new(),
        visited: HashSet::new(),
    };

    let mut roots: Vec<Node> = members
        .iter()
        .filter(|id| !attached.contains(*id))
        .map(|id| builder.materialize(*id))
        .collect();

    for &id in members {
        if !builder.visited.contains(id) {
            debug!(node_type, id, "promoting node reachable only through a cycle to a root");
            roots.push(builder.materialize(id));
        }
    }
    roots.sort_by(|a, b| a.id.cmp(&b.id));
    roots
}

struct Builder<'a, 'b> {
    node_type: &'b str,
    children: &'b BTreeMap<&'a str, BTreeSet<&'a str>>,
    path: HashSet<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a, 'b> Builder<'a, 'b> {
    fn materialize(&mut self, id: &'a str) -> Node {
        self.visited.insert(id);
        self.path.insert(id);
        let children = self.children;
        let mut kids = Vec::new();
        if let Some(child_ids) = children.get(id) {
            for &child in child_ids {
                if !self.path.contains(child) {
                    kids.push(self.materialize(child));
                }
            }
        }
        self.path.remove(id);
        Node::with_children(self.node_type, id, kids)
    }
}
