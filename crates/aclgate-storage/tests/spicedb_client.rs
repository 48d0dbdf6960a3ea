//! SpiceDB HTTP client tests.
//!
//! A wiremock server stands in for the SpiceDB HTTP gateway; each test checks
//! the request shape the client sends and how it decodes the reply.

use std::time::Duration;

use aclgate_storage::{
    ObjectReference, RelationshipStore, SpiceDbConfig, SpiceDbHttpStore, StorageError,
    StoredTuple, TupleFilter,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, SpiceDbHttpStore) {
    let server = MockServer::start().await;
    let mut config = SpiceDbConfig::new(server.uri());
    config.preshared_key = Some("test-key".to_string());
    config.timeout = Duration::from_secs(2);
    let store = SpiceDbHttpStore::new(config).unwrap();
    (server, store)
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_write_sends_touch_updates_with_bearer_key() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/relationships/write"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "updates": [{
                "operation": "OPERATION_TOUCH",
                "relationship": {
                    "resource": {"objectType": "partner", "objectId": "10"},
                    "relation": "user",
                    "subject": {"object": {"objectType": "users", "objectId": "alice"}}
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writtenAt": {"token": "t1"}})))
        .expect(1)
        .mount(&server)
        .await;

    store
        .write_tuples(vec![StoredTuple::new("partner", "10", "user", "users", "alice")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_write_makes_no_request() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    store.write_tuples(Vec::new()).await.unwrap();
}

#[tokio::test]
async fn test_check_permission_decodes_permissionship() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/permissions/check"))
        .and(body_partial_json(json!({
            "consistency": {"minimizeLatency": true},
            "permission": "view"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "checkedAt": {"token": "t1"},
            "permissionship": "PERMISSIONSHIP_HAS_PERMISSION"
        })))
        .mount(&server)
        .await;

    let allowed = store
        .check_permission(
            &ObjectReference::new("partner", "10"),
            "view",
            &ObjectReference::new("users", "alice"),
        )
        .await
        .unwrap();

    assert!(allowed);
}

#[tokio::test]
async fn test_check_permission_denied() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/permissions/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "permissionship": "PERMISSIONSHIP_NO_PERMISSION"
        })))
        .mount(&server)
        .await;

    let allowed = store
        .check_permission(
            &ObjectReference::new("partner", "10"),
            "view",
            &ObjectReference::new("users", "bob"),
        )
        .await
        .unwrap();

    assert!(!allowed);
}

#[tokio::test]
async fn test_read_decodes_streamed_relationships() {
    let (server, store) = setup().await;
    let body = ndjson(&[
        json!({"result": {"relationship": {
            "resource": {"objectType": "advertiser", "objectId": "5"},
            "relation": "parent",
            "subject": {"object": {"objectType": "partner", "objectId": "10"}}
        }}}),
        json!({"result": {"relationship": {
            "resource": {"objectType": "partner", "objectId": "11"},
            "relation": "parent",
            "subject": {"object": {"objectType": "partner", "objectId": "10"}}
        }}}),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/relationships/read"))
        .and(body_partial_json(json!({
            "relationshipFilter": {"optionalRelation": "parent"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let tuples = store
        .read_tuples(&TupleFilter {
            relation: Some("parent".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        tuples,
        vec![
            StoredTuple::new("advertiser", "5", "parent", "partner", "10"),
            StoredTuple::new("partner", "11", "parent", "partner", "10"),
        ]
    );
}

#[tokio::test]
async fn test_lookup_resources_collects_ids() {
    let (server, store) = setup().await;
    let body = ndjson(&[
        json!({"result": {"resourceObjectId": "10"}}),
        json!({"result": {"resourceObjectId": "20"}}),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/permissions/resources"))
        .and(body_partial_json(json!({
            "resourceObjectType": "partner",
            "permission": "view",
            "subject": {"object": {"objectType": "users", "objectId": "7"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let ids = store
        .lookup_resources("partner", "view", &ObjectReference::new("users", "7"))
        .await
        .unwrap();

    assert_eq!(ids, vec!["10", "20"]);
}

#[tokio::test]
async fn test_lookup_subjects_collects_ids() {
    let (server, store) = setup().await;
    let body = ndjson(&[
        json!({"result": {"subject": {"subjectObjectId": "alice"}}}),
        json!({"result": {"subject": {"subjectObjectId": "*"}}}),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/permissions/subjects"))
        .and(body_partial_json(json!({"subjectObjectType": "users"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let ids = store
        .lookup_subjects(&ObjectReference::new("partner", "10"), "view", "users")
        .await
        .unwrap();

    assert_eq!(ids, vec!["alice", "*"]);
}

#[tokio::test]
async fn test_stream_error_frame_fails_the_call() {
    let (server, store) = setup().await;
    let body = ndjson(&[
        json!({"result": {"resourceObjectId": "10"}}),
        json!({"error": {"code": 4, "message": "deadline exceeded"}}),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/permissions/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = store
        .lookup_resources("partner", "view", &ObjectReference::new("users", "7"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::QueryError { message } if message == "deadline exceeded"));
}

#[tokio::test]
async fn test_bad_request_maps_to_invalid_input() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/permissions/check"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"code": 3, "message": "object definition `nope` not found"})),
        )
        .mount(&server)
        .await;

    let err = store
        .check_permission(
            &ObjectReference::new("nope", "1"),
            "view",
            &ObjectReference::new("users", "alice"),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, StorageError::InvalidInput { ref message } if message.contains("nope")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_unavailable_store_maps_to_connection_error() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = store
        .lookup_resources("partner", "view", &ObjectReference::new("users", "7"))
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_slow_store_maps_to_timeout() {
    let server = MockServer::start().await;
    let mut config = SpiceDbConfig::new(server.uri());
    config.timeout = Duration::from_millis(100);
    let store = SpiceDbHttpStore::new(config).unwrap();
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"permissionship": "PERMISSIONSHIP_HAS_PERMISSION"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = store
        .check_permission(
            &ObjectReference::new("partner", "10"),
            "view",
            &ObjectReference::new("users", "alice"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::QueryTimeout { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_health_check_accepts_missing_schema() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/schema/read"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 5, "message": "no schema"})))
        .mount(&server)
        .await;

    let status = store.health_check().await.unwrap();

    assert!(status.healthy);
}
