//! Per-user authorization token assembly.
//!
//! A token summarizes what a user may act on: one partner account, one role
//! and the visible advertisers. Each part comes from a hierarchy resolution
//! for the user; the partner name comes from an injected [`PartnerNameLookup`]
//! because it is not relationship data.
//!
//! Only the first role is used. Users holding several roles get a token for
//! whichever role sorts first.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::{relation, resource_type, Node, ObjectRef};
use crate::resolver::{HierarchyResolver, RelationshipReader};


/// Authorization summary for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationToken {
    pub user_id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub role_id: i64,
    pub advertiser_ids: Vec<i64>,
}

/// Types and permissions used while assembling a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub subject_type: String,
    pub partner_type: String,
    pub partner_permission: String,
    pub role_type: String,
    pub role_permission: String,
    pub advertiser_type: String,
    pub advertiser_permission: String,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            subject_type: resource_type::USERS.to_string(),
            partner_type: resource_type::PARTNER.to_string(),
            partner_permission: "view".to_string(),
            role_type: resource_type::ROLES.to_string(),
            role_permission: relation::USER.to_string(),
            advertiser_type: resource_type::ADVERTISER.to_string(),
            advertiser_permission: "view".to_string(),
        }
    }
}

/// Source of display names for partner accounts.
pub trait PartnerNameLookup: Send + Sync {
    /// Returns the name for a `partner:<id>` key, or an empty string.
    fn partner_name(&self, partner_key: &str) -> String;
}

/// Lookup that knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPartnerNames;

impl PartnerNameLookup for NoPartnerNames {
    fn partner_name(&self, _partner_key: &str) -> String {
        String::new()
    }
}

/// Lookup backed by a fixed map of partner id to name.
#[derive(Debug, Clone, Default)]
pub struct StaticPartnerNames {
    names: HashMap<String, String>,
}

impl StaticPartnerNames {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }
}

impl PartnerNameLookup for StaticPartnerNames {
    fn partner_name(&self, partner_key: &str) -> String {
        let id = partner_key
            .split_once(':')
            .map_or(partner_key, |(_, id)| id);
        self.names.get(id).cloned().unwrap_or_default()
    }
}

impl<F> PartnerNameLookup for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn partner_name(&self, partner_key: &str) -> String {
        self(partner_key)
    }
}

/// Builds [`AuthorizationToken`]s from three hierarchy resolutions.
pub struct TokenAssembler<R> {
    hierarchy: HierarchyResolver<R>,
    names: Arc<dyn PartnerNameLookup>,
    settings: TokenSettings,
}

impl<R: RelationshipReader> TokenAssembler<R> {
    pub fn new(hierarchy: HierarchyResolver<R>, names: Arc<dyn PartnerNameLookup>) -> Self {
        Self::with_settings(hierarchy, names, TokenSettings::default())
    }

    pub fn with_settings(
        hierarchy: HierarchyResolver<R>,
        names: Arc<dyn PartnerNameLookup>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            hierarchy,
            names,
            settings,
        }
    }

    /// Assembles the token for `sso_user_id`.
    ///
    /// With `partner_filter`, that partner must be accessible to the user;
    /// otherwise the first accessible partner is used. Fails with
    /// [`DomainError::NotFound`] when no partner or no role is found.
    #[instrument(skip(self))]
    pub async fn assemble(
        &self,
        sso_user_id: i64,
        partner_filter: Option<i64>,
    ) -> DomainResult<AuthorizationToken> {
        let s = &self.settings;
        let subject = ObjectRef::new(&s.subject_type, sso_user_id.to_string());

        let partners = self
            .hierarchy
            .resolve(&s.partner_type, &s.partner_permission, &subject)
            .await?;
        let candidates = collect_keys(&partners);
        debug!(?candidates, "accessible partners");

        let partner = match partner_filter {
            Some(partner_id) => {
                let wanted = format!("{}:{partner_id}", s.partner_type);
                candidates.into_iter().find(|c| *c == wanted).ok_or_else(|| {
                    DomainError::not_found(format!(
                        "partner {partner_id} for user {sso_user_id}"
                    ))
                })?
            }
            None => candidates
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::not_found(format!("partner for user {sso_user_id}")))?,
        };

        let roles = self
            .hierarchy
            .resolve(&s.role_type, &s.role_permission, &subject)
            .await?;
        let role = collect_keys(&roles)
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("role for user {sso_user_id} under {partner}")))?;

        let advertisers = self
            .hierarchy
            .resolve(&s.advertiser_type, &s.advertiser_permission, &subject)
            .await?;
        let advertiser_ids = collect_keys(&advertisers)
            .iter()
            .filter_map(|key| id_part(key).parse::<i64>().ok())
            .collect();

        Ok(AuthorizationToken {
            user_id: sso_user_id,
            account_id: parse_id_or_zero(&partner),
            account_name: self.names.partner_name(&partner),
            role_id: parse_id_or_zero(&role),
            advertiser_ids,
        })
    }
}

/// Flattens a forest into `type:id` keys in depth-first pre-order, skipping
/// the synthetic wrapper.
fn collect_keys(forest: &Node) -> Vec<String> {
    let mut keys = Vec::new();
    let mut stack: Vec<&Node> = forest.children.iter().rev().collect();
    while let Some(node) = stack.pop() {
        keys.push(node.key());
        stack.extend(node.children.iter().rev());
    }
    keys
}

fn id_part(key: &str) -> &str {
    key.split_once(':').map_or(key, |(_, id)| id)
}

/// Parses the id part of a `type:id` key, falling back to 0.
fn parse_id_or_zero(key: &str) -> i64 {
    id_part(key).parse().unwrap_or_else(|_| {
        warn!(key, "non-integer id in token, using 0");
        0
    })
}
