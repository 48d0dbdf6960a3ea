use serde_json::json;

use super::*;

fn lower(value: serde_json::Value) -> Vec<String> {
    let document: AclDocument = serde_json::from_value(value).unwrap();
    translate(&document).iter().map(Tuple::to_string).collect()
}

/// Decodes from text so entity order follows the document.
fn lower_text(text: &str) -> Vec<String> {
    let document = AclDocument::from_json(text).unwrap();
    translate(&document).iter().map(Tuple::to_string).collect()
}

#[test]
fn test_roles_emit_users_and_scopes() {
    let tuples = lower(json!({
        "roles": {
            "admin": {
                "users": ["u1", "u2"],
                "scopes": ["partner:10", "advertiser:5", "role:1", "page", "feature:"]
            }
        }
    }));
    assert_eq!(
        tuples,
        vec![
            "roles:admin#user@users:u1",
            "roles:admin#user@users:u2",
            "roles:admin#scope@partner:10",
            "roles:admin#scope@advertiser:5",
        ]
    );
}

#[test]
fn test_sections_are_lowered_in_fixed_order() {
    // Key order in the document does not change section order.
    let tuples = lower(json!({
        "features": {"f": {"users": "u"}},
        "partners": {"10": {"users": "u"}},
        "roles": {"r": {"users": "u"}}
    }));
    assert_eq!(
        tuples,
        vec![
            "roles:r#user@users:u",
            "partner:10#user@users:u",
            "feature:f#user@users:u",
        ]
    );
}

#[test]
fn test_superroot_and_globaluser() {
    let tuples = lower(json!({
        "superroot": {"main": {"superadmin": "boss", "globaluser": ["g1"]}},
        "globaluser": {"g1": {"globaladmin": ["ops"]}}
    }));
    assert_eq!(
        tuples,
        vec![
            "superroot:main#superadmin@users:boss",
            "superroot:main#globaluser@globaluser:g1",
            "globaluser:g1#globaladmin@users:ops",
        ]
    );
}

#[test]
fn test_api_parent_must_be_a_feature() {
    let tuples = lower_text(
        r#"{"apis": {
            "reports_api": {"parent": "feature:reports", "roles": "admin", "denied_users": "eve"},
            "other_api": {"parent": "partner:10", "users": ["bob"]}
        }}"#,
    );
    assert_eq!(
        tuples,
        vec![
            "api:reports_api#parent@feature:reports",
            "api:reports_api#role@roles:admin",
            "api:reports_api#denied_user@users:eve",
            "api:other_api#user@users:bob",
        ]
    );
}

#[test]
fn test_page_fields() {
    let tuples = lower(json!({
        "pages": {
            "home": {
                "root": "main",
                "users": "u1",
                "roles": ["viewer"],
                "public": true,
                "denied_users": ["eve"],
                "features": ["feature:banner", "advertiser:5"]
            }
        }
    }));
    assert_eq!(
        tuples,
        vec![
            "page:home#root@superroot:main",
            "page:home#user@users:u1",
            "page:home#role@roles:viewer",
            "page:home#public@users:*",
            "page:home#denied_user@users:eve",
            "page:home#feature@feature:banner",
        ]
    );
}

#[test]
fn test_partner_global_wildcard() {
    let tuples = lower(json!({
        "partners": {"10": {"root": "main", "global": "*", "public": false}}
    }));
    assert_eq!(
        tuples,
        vec!["partner:10#root@superroot:main", "partner:10#global@globaluser:*"]
    );
}

#[test]
fn test_advertiser_and_publisher_parents() {
    let tuples = lower(json!({
        "advertisers": {
            "5": {"parent": "partner:10", "users": "u1"},
            "6": {"parent": "publisher:1"}
        },
        "publishers": {"7": {"parent": "partner:10", "public": ["*"]}}
    }));
    assert_eq!(
        tuples,
        vec![
            "advertiser:5#parent@partner:10",
            "advertiser:5#user@users:u1",
            "publisher:7#parent@partner:10",
            "publisher:7#public@users:*",
        ]
    );
}

#[test]
fn test_translate_is_idempotent() {
    let document: AclDocument = serde_json::from_value(json!({
        "roles": {"admin": {"users": ["u1"]}},
        "partners": {"10": {"users": ["u1"], "public": "*"}},
        "features": {"reports": {"parent": "advertiser:5", "children": {"daily": {}}}}
    }))
    .unwrap();
    assert_eq!(translate(&document), translate(&document));
}

#[test]
fn test_repeated_facts_are_deduplicated() {
    let tuples = lower(json!({
        "roles": {"admin": {"users": ["u1", "u1", "u2", "u1"]}}
    }));
    assert_eq!(
        tuples,
        vec!["roles:admin#user@users:u1", "roles:admin#user@users:u2"]
    );
}

#[test]
fn test_public_wildcard_normalization() {
    for public in [json!(true), json!("*"), json!(["*"])] {
        let tuples = lower(json!({"pages": {"home": {"public": public}}}));
        assert_eq!(tuples, vec!["page:home#public@users:*"]);
    }
    for public in [json!(false), json!("no")] {
        let tuples = lower(json!({"pages": {"home": {"public": public}}}));
        assert!(tuples.is_empty());
    }
}

#[test]
fn test_feature_parent_scope_validation() {
    let tuples = lower(json!({
        "features": {"x": {"parent": ["role:5", "advertiser:5"]}}
    }));
    assert_eq!(tuples, vec!["feature:x#parent@advertiser:5"]);

    let single = lower(json!({"features": {"x": {"parent": "role:5"}}}));
    assert!(single.is_empty());
}

#[test]
fn test_nested_feature_children_get_implicit_parent() {
    let tuples = lower_text(
        r#"{"features": {
            "reports": {
                "parent": "advertiser:5",
                "children": {
                    "weekly": {},
                    "daily": {"users": "u1", "children": {"csv": {}}}
                }
            },
            "billing": {"public": true}
        }}"#,
    );
    assert_eq!(
        tuples,
        vec![
            "feature:reports#parent@advertiser:5",
            "feature:weekly#parent@feature:reports",
            "feature:daily#parent@feature:reports",
            "feature:daily#user@users:u1",
            "feature:csv#parent@feature:daily",
            "feature:billing#public@users:*",
        ]
    );
}

#[test]
fn test_feature_under_two_parents_yields_two_parent_tuples() {
    let tuples = lower(json!({
        "features": {
            "a": {"children": {"shared": {}}},
            "b": {"children": {"shared": {}}}
        }
    }));
    assert_eq!(
        tuples,
        vec![
            "feature:shared#parent@feature:a",
            "feature:shared#parent@feature:b",
        ]
    );
}

#[test]
fn test_deeply_nested_features_do_not_recurse() {
    let mut body = json!({});
    for depth in (0..40).rev() {
        body = json!({"children": {format!("f{depth}"): body}});
    }
    let tuples = lower(json!({"features": {"top": body}}));
    assert_eq!(tuples.len(), 40);
    assert_eq!(tuples[0], "feature:f0#parent@feature:top");
    assert_eq!(tuples[39], "feature:f39#parent@feature:f38");
}

#[test]
fn test_empty_entity_names_are_skipped() {
    let tuples = lower(json!({
        "partners": {"": {"users": "u1"}, "10": {"users": "u1"}}
    }));
    assert_eq!(tuples, vec!["partner:10#user@users:u1"]);
}

#[test]
fn test_wrongly_shaped_fields_emit_nothing() {
    let tuples = lower(json!({
        "partners": {"10": {"users": {"u1": true}, "root": ["main"], "roles": 7}},
        "advertisers": "not a mapping"
    }));
    assert!(tuples.is_empty());
}

#[test]
fn test_scoped_subject_splits_at_first_colon() {
    let subject = parse_scoped_subject("feature:a:b", &["feature"]).unwrap();
    assert_eq!(subject.id, "a:b");
    assert!(parse_scoped_subject("feature", &["feature"]).is_none());
    assert!(parse_scoped_subject("feature:", &["feature"]).is_none());
    assert!(parse_scoped_subject("page:1", &["feature"]).is_none());
}

#[test]
fn test_separators_in_names_and_ids_are_dropped() {
    let tuples = lower_text(
        r#"{
            "partners": {
                "acme:eu": {"users": "7"},
                "10": {"users": ["7", "a#b", "c@d", "e:f"]}
            },
            "advertisers": {"5": {"parent": "partner:10:eu"}}
        }"#,
    );
    assert_eq!(tuples, vec!["partner:10#user@users:7"]);
    for tuple in &tuples {
        assert_eq!(tuple.parse::<Tuple>().unwrap().to_string(), *tuple);
    }
}
