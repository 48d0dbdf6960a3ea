//! Lowering of the configuration document into relationship tuples.
//!
//! Sections are processed in a fixed order (roles, superroot, globaluser,
//! apis, pages, partners, advertisers, publishers, features) and entities in
//! document order. Within an entity, fields are emitted in a fixed order as
//! well, so the same document always yields the same tuple list.
//!
//! The output is deduplicated by serialized form, keeping the first
//! occurrence. Names or ids containing `:`, `#` or `@` cannot be expressed in
//! the tuple grammar; tuples built from them are dropped.

use std::collections::HashSet;

use tracing::debug;

use crate::model::{
    relation, resource_type as rt, AccountBody, AclDocument, FeatureBody, IdList, ObjectRef,
    PublicFlag, SingleId, Tuple, WILDCARD,
};

#[cfg(test)]
mod tests;

/// Subject types a role may be scoped to.
const ROLE_SCOPE_TYPES: &[&str] = &[rt::PARTNER, rt::ADVERTISER, rt::PUBLISHER, rt::FEATURE, rt::PAGE];
/// Subject types an api parent may have.
const API_PARENT_TYPES: &[&str] = &[rt::FEATURE];
/// Subject types a page may attach as features.
const PAGE_FEATURE_TYPES: &[&str] = &[rt::FEATURE];
/// Subject types an advertiser or publisher parent may have.
const ACCOUNT_PARENT_TYPES: &[&str] = &[rt::PARTNER];
/// Subject types a feature parent may have.
const FEATURE_PARENT_TYPES: &[&str] = &[rt::ADVERTISER, rt::PUBLISHER, rt::FEATURE, rt::PARTNER, rt::PAGE];

/// Translates a configuration document into an ordered, deduplicated tuple list.
pub fn translate(document: &AclDocument) -> Vec<Tuple> {
    let mut out = Emitter::default();

    for (name, role) in named(document.roles.iter()) {
        out.ids(rt::ROLES, name, relation::USER, rt::USERS, &role.users);
        for scope in role.scopes.iter() {
            out.scoped(rt::ROLES, name, relation::SCOPE, scope, ROLE_SCOPE_TYPES);
        }
    }

    for (name, root) in named(document.superroot.iter()) {
        out.ids(rt::SUPERROOT, name, relation::SUPERADMIN, rt::USERS, &root.superadmin);
        out.ids(rt::SUPERROOT, name, relation::GLOBALUSER, rt::GLOBALUSER, &root.globaluser);
    }

    for (name, global) in named(document.globaluser.iter()) {
        out.ids(rt::GLOBALUSER, name, relation::GLOBALADMIN, rt::USERS, &global.globaladmin);
    }

    for (name, api) in named(document.apis.iter()) {
        if let Some(parent) = api.parent.get() {
            out.scoped(rt::API, name, relation::PARENT, parent, API_PARENT_TYPES);
        }
        out.ids(rt::API, name, relation::ROLE, rt::ROLES, &api.roles);
        out.ids(rt::API, name, relation::USER, rt::USERS, &api.users);
        out.ids(rt::API, name, relation::DENIED_USER, rt::USERS, &api.denied_users);
    }

    for (name, page) in named(document.pages.iter()) {
        out.single(rt::PAGE, name, relation::ROOT, rt::SUPERROOT, &page.root);
        out.ids(rt::PAGE, name, relation::USER, rt::USERS, &page.users);
        out.ids(rt::PAGE, name, relation::ROLE, rt::ROLES, &page.roles);
        out.public(rt::PAGE, name, relation::PUBLIC, rt::USERS, page.public);
        out.ids(rt::PAGE, name, relation::DENIED_USER, rt::USERS, &page.denied_users);
        for feature in page.features.iter() {
            out.scoped(rt::PAGE, name, relation::FEATURE, feature, PAGE_FEATURE_TYPES);
        }
    }

    for (name, partner) in named(document.partners.iter()) {
        out.single(rt::PARTNER, name, relation::ROOT, rt::SUPERROOT, &partner.root);
        out.ids(rt::PARTNER, name, relation::USER, rt::USERS, &partner.users);
        out.ids(rt::PARTNER, name, relation::ROLE, rt::ROLES, &partner.roles);
        out.public(rt::PARTNER, name, relation::PUBLIC, rt::USERS, partner.public);
        out.public(rt::PARTNER, name, relation::GLOBAL, rt::GLOBALUSER, partner.global);
        out.ids(rt::PARTNER, name, relation::DENIED_USER, rt::USERS, &partner.denied_users);
    }

    for (name, advertiser) in named(document.advertisers.iter()) {
        out.account(rt::ADVERTISER, name, advertiser);
    }

    for (name, publisher) in named(document.publishers.iter()) {
        out.account(rt::PUBLISHER, name, publisher);
    }

    // Pre-order walk: children are pushed in reverse so they pop in document order.
    let mut pending: Vec<(&str, &FeatureBody, Option<&str>)> = named(document.features.iter())
        .rev()
        .map(|(name, body)| (name, body, None))
        .collect();
    while let Some((name, feature, lexical_parent)) = pending.pop() {
        out.feature(name, feature, lexical_parent);
        pending.extend(
            named(feature.children.iter())
                .rev()
                .map(|(child, body)| (child, body, Some(name))),
        );
    }

    debug!(
        entities = document.entity_count(),
        tuples = out.tuples.len(),
        "translated configuration document"
    );
    out.tuples
}

/// Parses a scoped subject (`type:id`, split at the first colon).
///
/// Returns `None` unless the type is in `allowed` and the id is non-empty.
pub fn parse_scoped_subject(value: &str, allowed: &[&str]) -> Option<ObjectRef> {
    let (subject_type, id) = value.split_once(':')?;
    (allowed.iter().any(|t| *t == subject_type) && !id.is_empty()).then(|| ObjectRef::new(subject_type, id))
}

/// Skips entities with an empty name.
fn named<'a, T: 'a>(
    entries: impl DoubleEndedIterator<Item = (&'a str, &'a T)>,
) -> impl DoubleEndedIterator<Item = (&'a str, &'a T)> {
    entries.filter(|(name, _)| {
        if name.is_empty() {
            debug!("skipping entity with an empty name");
        }
        !name.is_empty()
    })
}

/// Collects tuples, dropping repeats of an already emitted fact.
#[derive(Default)]
struct Emitter {
    tuples: Vec<Tuple>,
    seen: HashSet<String>,
}

impl Emitter {
    /// Keeps only tuples whose text form parses back to the same tuple.
    fn push(&mut self, tuple: Tuple) {
        if tuple.has_empty_component() {
            return;
        }
        let text = tuple.to_string();
        if text.parse::<Tuple>().as_ref() != Ok(&tuple) {
            debug!(tuple = %text, "dropping tuple with a separator inside a component");
            return;
        }
        if self.seen.insert(text) {
            self.tuples.push(tuple);
        }
    }

    fn ids(&mut self, resource_type: &str, name: &str, rel: &str, subject_type: &str, ids: &IdList) {
        for id in ids.iter() {
            self.push(Tuple::new(resource_type, name, rel, subject_type, id));
        }
    }

    fn single(&mut self, resource_type: &str, name: &str, rel: &str, subject_type: &str, id: &SingleId) {
        if let Some(id) = id.get() {
            self.push(Tuple::new(resource_type, name, rel, subject_type, id));
        }
    }

    fn public(&mut self, resource_type: &str, name: &str, rel: &str, subject_type: &str, flag: PublicFlag) {
        if flag.is_set() {
            self.push(Tuple::new(resource_type, name, rel, subject_type, WILDCARD));
        }
    }

    fn scoped(&mut self, resource_type: &str, name: &str, rel: &str, value: &str, allowed: &[&str]) {
        match parse_scoped_subject(value, allowed) {
            Some(subject) => self.push(Tuple::new(
                resource_type,
                name,
                rel,
                subject.object_type,
                subject.id,
            )),
            None => debug!(
                resource_type,
                resource_id = name,
                relation = rel,
                value,
                "dropping scoped subject with a disallowed or malformed type"
            ),
        }
    }

    fn account(&mut self, resource_type: &str, name: &str, body: &AccountBody) {
        self.single(resource_type, name, relation::ROOT, rt::SUPERROOT, &body.root);
        if let Some(parent) = body.parent.get() {
            self.scoped(resource_type, name, relation::PARENT, parent, ACCOUNT_PARENT_TYPES);
        }
        self.ids(resource_type, name, relation::ROLE, rt::ROLES, &body.roles);
        self.ids(resource_type, name, relation::USER, rt::USERS, &body.users);
        self.public(resource_type, name, relation::PUBLIC, rt::USERS, body.public);
        self.ids(resource_type, name, relation::DENIED_USER, rt::USERS, &body.denied_users);
    }

    fn feature(&mut self, name: &str, body: &FeatureBody, lexical_parent: Option<&str>) {
        if let Some(parent) = lexical_parent {
            self.push(Tuple::new(rt::FEATURE, name, relation::PARENT, rt::FEATURE, parent));
        }
        self.single(rt::FEATURE, name, relation::ROOT, rt::SUPERROOT, &body.root);
        for parent in body.parent.iter() {
            self.scoped(rt::FEATURE, name, relation::PARENT, parent, FEATURE_PARENT_TYPES);
        }
        self.ids(rt::FEATURE, name, relation::USER, rt::USERS, &body.users);
        self.ids(rt::FEATURE, name, relation::ROLE, rt::ROLES, &body.roles);
        self.public(rt::FEATURE, name, relation::PUBLIC, rt::USERS, body.public);
        self.ids(rt::FEATURE, name, relation::DENIED_USER, rt::USERS, &body.denied_users);
    }
}
