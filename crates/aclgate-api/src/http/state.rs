//! Application state for HTTP handlers.

use std::sync::Arc;

use aclgate_domain::resolver::{HierarchyResolver, SubtreeResolver};
use aclgate_domain::token::{NoPartnerNames, PartnerNameLookup, TokenAssembler, TokenSettings};
use aclgate_server::LoadHandler;
use aclgate_storage::RelationshipStore;

use crate::adapters::StoreAdapter;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - The relationship store, possibly `dyn RelationshipStore`
///
/// # Architecture
///
/// Resolvers, the token assembler and the loader all reach the store through
/// one [`StoreAdapter`], which implements the domain's reader and writer
/// traits. Direct store calls (`/check`, subject listings, readiness) use
/// `storage`.
pub struct AppState<S: RelationshipStore + ?Sized> {
    /// The relationship store.
    pub storage: Arc<S>,
    /// Same-type hierarchy resolution (`/lookup`).
    pub hierarchy: HierarchyResolver<StoreAdapter<S>>,
    /// Path-constrained subtree resolution (`/subtree`).
    pub subtree: SubtreeResolver<StoreAdapter<S>>,
    /// Authorization token assembly (`/authz/token`).
    pub tokens: TokenAssembler<StoreAdapter<S>>,
    /// Document and tuple-list loading.
    pub loader: LoadHandler<StoreAdapter<S>>,
    /// Subject type of user ids in `/check` and `/assign`.
    pub subject_type: String,
}

impl<S: RelationshipStore + ?Sized> AppState<S> {
    /// Creates state with default token settings and no partner names.
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_token_config(storage, TokenSettings::default(), Arc::new(NoPartnerNames))
    }

    /// Creates state with explicit token settings and partner name source.
    pub fn with_token_config(
        storage: Arc<S>,
        settings: TokenSettings,
        names: Arc<dyn PartnerNameLookup>,
    ) -> Self {
        let adapter = Arc::new(StoreAdapter::new(Arc::clone(&storage)));
        let hierarchy = HierarchyResolver::new(Arc::clone(&adapter));
        let subject_type = settings.subject_type.clone();
        let tokens = TokenAssembler::with_settings(hierarchy.clone(), names, settings);

        Self {
            storage,
            hierarchy,
            subtree: SubtreeResolver::new(Arc::clone(&adapter)),
            tokens,
            loader: LoadHandler::new(adapter),
            subject_type,
        }
    }
}
