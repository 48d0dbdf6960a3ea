//! Typed access-control configuration document.
//!
//! The document is decoded once at the boundary. Field-level coercion rules
//! are encoded in the wrapper types below instead of being applied while
//! translating:
//!
//! | Wrapper | Accepts | Anything else |
//! |---------|---------|---------------|
//! | [`IdList`] | a string, or a list (non-string and empty items dropped) | empty |
//! | [`SingleId`] | a non-empty string | none |
//! | [`PublicFlag`] | `true`, `"*"`, or a list containing `"*"` | false |
//! | [`Section`] | a mapping of entity name to body, in document order | empty |
//!
//! Entity bodies that are not mappings are skipped and unknown fields are
//! ignored, so a partially valid document still lowers everything it can.

use std::fmt;
use std::marker::PhantomData;

use serde::de::value::MapAccessDeserializer;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifiers given as a single string or a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdList(Vec<String>);

impl IdList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            ids.into_iter()
                .map(Into::into)
                .filter(|id: &String| !id.is_empty())
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::new([s]),
            Value::Array(items) => Self::new(items.into_iter().filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })),
            _ => Self::default(),
        }
    }
}

impl<'de> Deserialize<'de> for IdList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// A field that only counts when it is a non-empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SingleId(Option<String>);

impl SingleId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self((!id.is_empty()).then_some(id))
    }

    pub fn get(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<'de> Deserialize<'de> for SingleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Self::new(s),
            _ => Self::default(),
        })
    }
}

/// A wildcard grant flag (`public`, `global`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublicFlag(bool);

impl PublicFlag {
    pub fn new(enabled: bool) -> Self {
        Self(enabled)
    }

    pub fn is_set(&self) -> bool {
        self.0
    }

    fn from_value(value: &Value) -> Self {
        Self(match value {
            Value::Bool(b) => *b,
            Value::String(s) => s == "*",
            Value::Array(items) => items.iter().any(|item| item.as_str() == Some("*")),
            _ => false,
        })
    }
}

impl<'de> Deserialize<'de> for PublicFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| Self::from_value(&v))
    }
}

/// Entities of one section, keyed by name, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<T>(Vec<(String, T)>);

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Section<T> {
    pub fn new(entries: Vec<(String, T)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &T)> {
        self.0.iter().map(|(name, body)| (name.as_str(), body))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, body) in &self.0 {
            map.serialize_entry(name, body)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Section<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SectionVisitor(PhantomData))
    }
}

struct SectionVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for SectionVisitor<T> {
    type Value = Section<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of entity names to entity bodies")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some((name, body)) = map.next_entry::<String, Lenient<T>>()? {
            match body.0 {
                Some(body) => entries.push((name, body)),
                None => tracing::debug!(entity = %name, "skipping entity body that is not a mapping"),
            }
        }
        Ok(Section(entries))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Section::default())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Section::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Section::default())
    }
}

/// Decodes a mapping into `T`; any other shape decodes to `None`.
struct Lenient<T>(Option<T>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LenientVisitor(PhantomData))
    }
}

struct LenientVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for LenientVisitor<T> {
    type Value = Lenient<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an entity body")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        T::deserialize(MapAccessDeserializer::new(map)).map(|body| Lenient(Some(body)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Lenient(None))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Lenient(None))
    }
}

/// `roles.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleBody {
    pub users: IdList,
    pub scopes: IdList,
}

/// `superroot.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperrootBody {
    pub superadmin: IdList,
    pub globaluser: IdList,
}

/// `globaluser.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalUserBody {
    pub globaladmin: IdList,
}

/// `apis.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiBody {
    pub parent: SingleId,
    pub roles: IdList,
    pub users: IdList,
    pub denied_users: IdList,
}

/// `pages.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageBody {
    pub root: SingleId,
    pub users: IdList,
    pub roles: IdList,
    pub public: PublicFlag,
    pub denied_users: IdList,
    pub features: IdList,
}

/// `partners.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerBody {
    pub root: SingleId,
    pub users: IdList,
    pub roles: IdList,
    pub public: PublicFlag,
    pub global: PublicFlag,
    pub denied_users: IdList,
}

/// `advertisers.<name>` and `publishers.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountBody {
    pub root: SingleId,
    pub parent: SingleId,
    pub roles: IdList,
    pub users: IdList,
    pub public: PublicFlag,
    pub denied_users: IdList,
}

/// `features.<name>`, possibly nested under another feature's `children`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureBody {
    pub root: SingleId,
    pub parent: IdList,
    pub users: IdList,
    pub roles: IdList,
    pub public: PublicFlag,
    pub denied_users: IdList,
    pub children: Section<FeatureBody>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclDocument {
    pub roles: Section<RoleBody>,
    pub superroot: Section<SuperrootBody>,
    pub globaluser: Section<GlobalUserBody>,
    pub apis: Section<ApiBody>,
    pub pages: Section<PageBody>,
    pub partners: Section<PartnerBody>,
    pub advertisers: Section<AccountBody>,
    pub publishers: Section<AccountBody>,
    pub features: Section<FeatureBody>,
}

impl AclDocument {
    /// Decodes a document from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Returns the number of top-level entities across all sections.
    pub fn entity_count(&self) -> usize {
        self.roles.len()
            + self.superroot.len()
            + self.globaluser.len()
            + self.apis.len()
            + self.pages.len()
            + self.partners.len()
            + self.advertisers.len()
            + self.publishers.len()
            + self.features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(list: &IdList) -> Vec<&str> {
        list.iter().collect()
    }

    #[test]
    fn test_id_list_accepts_string_or_list() {
        let single: IdList = serde_json::from_value(json!("alice")).unwrap();
        assert_eq!(ids(&single), vec!["alice"]);

        let many: IdList = serde_json::from_value(json!(["a", "", 3, "b", null])).unwrap();
        assert_eq!(ids(&many), vec!["a", "b"]);

        let empty: IdList = serde_json::from_value(json!("")).unwrap();
        assert!(empty.is_empty());

        let wrong: IdList = serde_json::from_value(json!({"x": 1})).unwrap();
        assert!(wrong.is_empty());
    }

    #[test]
    fn test_single_id_only_accepts_strings() {
        let id: SingleId = serde_json::from_value(json!("partner:1")).unwrap();
        assert_eq!(id.get(), Some("partner:1"));

        let list: SingleId = serde_json::from_value(json!(["partner:1"])).unwrap();
        assert_eq!(list.get(), None);

        let empty: SingleId = serde_json::from_value(json!("")).unwrap();
        assert_eq!(empty.get(), None);
    }

    #[test]
    fn test_public_flag_variants() {
        for truthy in [json!(true), json!("*"), json!(["x", "*"])] {
            let flag: PublicFlag = serde_json::from_value(truthy.clone()).unwrap();
            assert!(flag.is_set(), "expected {truthy} to be public");
        }
        for falsy in [json!(false), json!("no"), json!(["x"]), json!(1), json!(null)] {
            let flag: PublicFlag = serde_json::from_value(falsy.clone()).unwrap();
            assert!(!flag.is_set(), "expected {falsy} not to be public");
        }
    }

    #[test]
    fn test_section_preserves_document_order() {
        let doc = AclDocument::from_json(
            r#"{"partners": {"zeta": {}, "alpha": {}, "mid": {}}}"#,
        )
        .unwrap();
        let names: Vec<&str> = doc.partners.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_non_mapping_bodies_and_sections_are_skipped() {
        let doc = AclDocument::from_json(
            r#"{
                "roles": ["not", "a", "mapping"],
                "partners": {"10": "oops", "20": {"users": "u1"}},
                "unknown_section": {"x": {}}
            }"#,
        )
        .unwrap();
        assert!(doc.roles.is_empty());
        assert_eq!(doc.partners.len(), 1);
        assert_eq!(doc.entity_count(), 1);
    }

    #[test]
    fn test_nested_feature_children_decode() {
        let doc = AclDocument::from_json(
            r#"{"features": {"reports": {"children": {"daily": {"children": {"csv": {}}}}}}}"#,
        )
        .unwrap();
        let (_, reports) = doc.features.iter().next().unwrap();
        let (daily_name, daily) = reports.children.iter().next().unwrap();
        assert_eq!(daily_name, "daily");
        assert_eq!(daily.children.len(), 1);
    }

    #[test]
    fn test_encoded_document_decodes_to_same_entities() {
        let doc = AclDocument::from_json(
            r#"{
                "partners": {"zeta": {"users": ["7"], "public": "*"}, "alpha": {"root": "main"}},
                "advertisers": {"5": {"parent": "partner:zeta"}},
                "features": {"reports": {"users": "7", "children": {"daily": {}}}}
            }"#,
        )
        .unwrap();

        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.contains(r#""partners":{"zeta":"#));
        let decoded = AclDocument::from_json(&text).unwrap();

        assert_eq!(decoded, doc);
        let names: Vec<&str> = decoded.partners.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
