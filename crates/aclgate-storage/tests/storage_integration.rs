//! Storage Integration Tests.
//!
//! These tests drive the in-memory store through the `RelationshipStore`
//! trait object, the way the gateway holds it at runtime.

use std::sync::Arc;

use aclgate_storage::{
    MemoryRelationshipStore, ObjectReference, RelationshipStore, StoredTuple, TupleFilter,
};

fn create_store() -> Arc<dyn RelationshipStore> {
    Arc::new(MemoryRelationshipStore::with_default_permissions())
}

async fn seed(store: &dyn RelationshipStore) {
    store
        .write_tuples(vec![
            StoredTuple::new("partner", "1", "user", "users", "7"),
            StoredTuple::new("partner", "2", "parent", "partner", "1"),
            StoredTuple::new("partner", "2", "user", "users", "7"),
            StoredTuple::new("advertiser", "100", "parent", "partner", "2"),
            StoredTuple::new("advertiser", "100", "user", "users", "7"),
            StoredTuple::new("page", "home", "public", "users", "*"),
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_parent_edges_across_types() {
    let store = create_store();
    seed(store.as_ref()).await;

    let mut edges = store
        .read_tuples(&TupleFilter {
            relation: Some("parent".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    edges.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].resource(), ObjectReference::new("advertiser", "100"));
    assert_eq!(edges[1].resource(), ObjectReference::new("partner", "2"));
}

#[tokio::test]
async fn test_same_type_parent_edges() {
    let store = create_store();
    seed(store.as_ref()).await;

    let edges = store
        .read_tuples(&TupleFilter {
            resource_type: Some("partner".to_string()),
            relation: Some("parent".to_string()),
            subject_type: Some("partner".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        edges,
        vec![StoredTuple::new("partner", "2", "parent", "partner", "1")]
    );
}

#[tokio::test]
async fn test_view_lookups() {
    let store = create_store();
    seed(store.as_ref()).await;
    let user = ObjectReference::new("users", "7");

    let partners = store.lookup_resources("partner", "view", &user).await.unwrap();
    assert_eq!(partners, vec!["1", "2"]);

    let pages = store
        .lookup_resources("page", "view", &ObjectReference::new("users", "anyone"))
        .await
        .unwrap();
    assert_eq!(pages, vec!["home"]);

    let subjects = store
        .lookup_subjects(&ObjectReference::new("advertiser", "100"), "view", "users")
        .await
        .unwrap();
    assert_eq!(subjects, vec!["7"]);
}

#[tokio::test]
async fn test_reload_of_same_tuples_is_idempotent() {
    let store = MemoryRelationshipStore::with_default_permissions();
    seed(&store).await;
    let before = store.len();

    seed(&store).await;

    assert_eq!(store.len(), before);
}
