//! Path-constrained subtree under a given root.
//!
//! Parent chains may cross types (`feature -> advertiser -> partner`). Only
//! accessible target-type resources whose chain reaches the root are kept,
//! together with the target-type resources on those chains.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::DomainResult;
use crate::model::{relation, Node, Tuple};

use super::forest::assemble_forest;
use super::traits::RelationshipReader;
use super::types::{RelationshipFilter, SubtreeQuery};

/// Resolves subtrees of target-type resources under a root.
pub struct SubtreeResolver<R> {
    reader: Arc<R>,
}

impl<R> Clone for SubtreeResolver<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<R: RelationshipReader> SubtreeResolver<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Returns the single kept root, or a synthetic root wrapping all of them.
    #[instrument(skip(self, query), fields(root = %query.root, target_type = ?query.target_type))]
    pub async fn resolve(&self, query: &SubtreeQuery) -> DomainResult<Node> {
        let accessible = match (&query.subject, &query.target_type) {
            (Some(subject), Some(target_type)) => {
                self.reader
                    .lookup_resources(target_type, &query.permission, subject)
                    .await?
            }
            _ => Vec::new(),
        };
        let edges = self
            .reader
            .read_relationships(&RelationshipFilter::all_parents())
            .await?;
        debug!(
            accessible = accessible.len(),
            edges = edges.len(),
            "fetched subtree inputs"
        );
        Ok(build_subtree(query, &accessible, &edges))
    }
}

/// Builds the subtree from already fetched inputs.
///
/// `accessible` holds target-type ids. Non-`parent` relationships in
/// `parent_edges` are ignored.
pub fn build_subtree(query: &SubtreeQuery, accessible: &[String], parent_edges: &[Tuple]) -> Node {
    let node_type = query.node_type();
    let mut parents: HashMap<String, Vec<String>> = HashMap::new();
    for tuple in parent_edges.iter().filter(|t| t.relation == relation::PARENT) {
        parents
            .entry(tuple.resource().key())
            .or_default()
            .push(tuple.subject().key());
    }

    let root_key = query.root.key();
    let mut walk = PathWalk {
        root: &root_key,
        parents: &parents,
        kept: HashSet::new(),
        unreachable: HashSet::new(),
        path: HashSet::new(),
    };
    for id in accessible {
        let key = format!("{node_type}:{id}");
        if walk.visit(&key) != Reach::Root {
            debug!(resource = %key, "discarding resource not under root");
        }
    }

    let prefix = format!("{node_type}:");
    let members: BTreeSet<&str> = walk
        .kept
        .iter()
        .filter_map(|key| key.strip_prefix(&prefix))
        .collect();
    let edges = parent_edges
        .iter()
        .filter(|t| {
            t.relation == relation::PARENT
                && t.resource_type == node_type
                && t.subject_type == node_type
        })
        .map(|t| (t.resource_id.as_str(), t.subject_id.as_str()));

    let mut roots = assemble_forest(node_type, &members, edges);
    if roots.len() == 1 {
        roots.remove(0)
    } else {
        Node::synthetic_root(node_type, roots)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    Root,
    Unreachable,
    /// Stopped at a node already on the current path.
    Cut,
}

/// Upward walk over the child -> parents map with memoized outcomes.
struct PathWalk<'a> {
    root: &'a str,
    parents: &'a HashMap<String, Vec<String>>,
    kept: HashSet<String>,
    unreachable: HashSet<String>,
    path: HashSet<String>,
}

impl PathWalk<'_> {
    /// Walks every parent of `key`, marking each node on a path to the root
    /// as kept.
    fn visit(&mut self, key: &str) -> Reach {
        if key == self.root || self.kept.contains(key) {
            self.kept.insert(key.to_string());
            return Reach::Root;
        }
        if self.unreachable.contains(key) {
            return Reach::Unreachable;
        }
        if self.path.contains(key) {
            return Reach::Cut;
        }

        let parents = self.parents;
        self.path.insert(key.to_string());
        let mut outcome = Reach::Unreachable;
        for parent in parents.get(key).into_iter().flatten() {
            match self.visit(parent) {
                Reach::Root => outcome = Reach::Root,
                Reach::Cut if outcome == Reach::Unreachable => outcome = Reach::Cut,
                _ => {}
            }
        }
        self.path.remove(key);

        match outcome {
            Reach::Root => {
                self.kept.insert(key.to_string());
            }
            // A cut outcome depends on the current path, so it is not memoized.
            Reach::Unreachable => {
                self.unreachable.insert(key.to_string());
            }
            Reach::Cut => {}
        }
        outcome
    }
}
