//! Subtree resolver tests.

use super::mocks::create_resolvers;
use crate::model::{Node, ObjectRef, Tuple, SYNTHETIC_ROOT_ID};
use crate::resolver::{build_subtree, RelationshipFilter, SubtreeQuery};

fn feature_query(root: &str) -> SubtreeQuery {
    SubtreeQuery::new(ObjectRef::parse(root).unwrap(), "view")
        .with_subject(ObjectRef::new("users", "alice"))
        .with_target_type("feature")
}

fn tuples(lines: &[&str]) -> Vec<Tuple> {
    lines.iter().map(|line| line.parse().unwrap()).collect()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_path_not_reaching_root_is_pruned() {
    let (reader, _, subtree) = create_resolvers();
    reader.grant("feature", "view", "users:alice", &["F1", "F2"]).await;
    reader
        .add_tuples(&[
            "feature:F1#parent@advertiser:AD1",
            "advertiser:AD1#parent@partner:P",
            "feature:F2#parent@advertiser:AD2",
            "advertiser:AD2#parent@partner:Q",
        ])
        .await;

    let tree = subtree.resolve(&feature_query("partner:P")).await.unwrap();

    assert_eq!(tree, Node::new("feature", "F1"));
    assert_eq!(
        reader.recorded_filters().await,
        vec![RelationshipFilter::all_parents()]
    );
}

#[tokio::test]
async fn test_missing_subject_yields_empty_wrapper() {
    let (reader, _, subtree) = create_resolvers();
    reader.grant("feature", "view", "users:alice", &["F1"]).await;
    reader.add_tuple("feature:F1#parent@partner:P").await;

    let query = SubtreeQuery::new(ObjectRef::new("partner", "P"), "view").with_target_type("feature");
    let tree = subtree.resolve(&query).await.unwrap();

    assert_eq!(tree, Node::synthetic_root("feature", Vec::new()));
}

#[tokio::test]
async fn test_store_failure_is_surfaced() {
    let (reader, _, subtree) = create_resolvers();
    reader.set_unavailable().await;
    let result = subtree.resolve(&feature_query("partner:P")).await;
    assert!(result.unwrap_err().is_store_failure());
}

#[test]
fn test_intermediate_target_nodes_are_materialized() {
    let edges = tuples(&[
        "feature:F2#parent@feature:F1",
        "feature:F1#parent@advertiser:AD1",
        "advertiser:AD1#parent@partner:P",
    ]);

    let tree = build_subtree(&feature_query("partner:P"), &ids(&["F2"]), &edges);

    assert_eq!(
        tree,
        Node::with_children("feature", "F1", vec![Node::new("feature", "F2")])
    );
}

#[test]
fn test_several_roots_are_wrapped() {
    let edges = tuples(&[
        "feature:F1#parent@advertiser:AD1",
        "feature:F2#parent@advertiser:AD1",
        "advertiser:AD1#parent@partner:P",
    ]);

    let tree = build_subtree(&feature_query("partner:P"), &ids(&["F2", "F1"]), &edges);

    assert_eq!(tree.id, SYNTHETIC_ROOT_ID);
    assert_eq!(
        tree.children,
        vec![Node::new("feature", "F1"), Node::new("feature", "F2")]
    );
}

#[test]
fn test_any_parent_reaching_root_keeps_node() {
    let edges = tuples(&[
        "feature:F#parent@advertiser:AD1",
        "feature:F#parent@advertiser:AD2",
        "advertiser:AD1#parent@partner:Q",
        "advertiser:AD2#parent@partner:P",
    ]);

    let tree = build_subtree(&feature_query("partner:P"), &ids(&["F"]), &edges);

    assert_eq!(tree, Node::new("feature", "F"));
}

#[test]
fn test_root_of_target_type_is_included() {
    let edges = tuples(&[
        "feature:a#parent@feature:top",
        "feature:b#parent@feature:other",
    ]);

    let tree = build_subtree(&feature_query("feature:top"), &ids(&["a", "b"]), &edges);

    assert_eq!(
        tree,
        Node::with_children("feature", "top", vec![Node::new("feature", "a")])
    );
}

#[test]
fn test_cycle_without_root_terminates_empty() {
    let edges = tuples(&[
        "feature:F1#parent@feature:F2",
        "feature:F2#parent@feature:F1",
    ]);

    let tree = build_subtree(&feature_query("partner:P"), &ids(&["F1", "F2"]), &edges);

    assert_eq!(tree, Node::synthetic_root("feature", Vec::new()));
}

#[test]
fn test_node_cut_by_cycle_is_revisited() {
    // m is walked first; n only reaches the root through m, which is on the
    // path at that point.
    let edges = tuples(&[
        "feature:m#parent@feature:n",
        "feature:n#parent@feature:m",
        "feature:m#parent@partner:P",
    ]);

    let tree = build_subtree(&feature_query("partner:P"), &ids(&["m", "n"]), &edges);

    assert_eq!(
        tree,
        Node::with_children("feature", "m", vec![Node::new("feature", "n")])
    );
}
