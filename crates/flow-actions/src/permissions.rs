//! Permission scopes
//!
//! A [`PermissionScope`] answers "may this viewer do `action` to this
//! revision?". Scopes are built by a [`PermissionPolicy`]; the engine only
//! caches and consumes them.

use crate::taxonomy::{ActionTaxonomy, Permission};
use flow_model::Revision;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

/// The person a page is rendered for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Viewer {
    /// Account id, 0 when not identified
    pub id: u64,
    /// User name or address
    pub name: String,
    /// Granted rights
    pub rights: BTreeSet<String>,
}

impl Viewer {
    /// Unidentified viewer
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Logged-in viewer
    #[inline]
    #[must_use]
    pub fn registered(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rights: BTreeSet::new(),
        }
    }

    /// Grant rights
    #[must_use]
    pub fn with_rights<I, S>(mut self, rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rights.extend(rights.into_iter().map(Into::into));
        self
    }

    /// Identified viewers have a non-zero id
    #[inline]
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.id != 0
    }

    /// Whether the viewer holds any of `rights`
    #[must_use]
    pub fn has_any(&self, rights: &[String]) -> bool {
        rights.iter().any(|r| self.rights.contains(r))
    }
}

/// Action checks for one viewer
pub trait RevisionPermissions: Send + Sync + Debug {
    /// Viewer the scope was built for
    fn viewer(&self) -> &Viewer;

    /// May the viewer perform `action` on `revision`
    fn is_allowed(&self, revision: &Revision, action: &str) -> bool;
}

/// Shared permission scope
pub type PermissionScope = Arc<dyn RevisionPermissions>;

/// Builds permission scopes
pub trait PermissionPolicy: Send + Sync {
    /// Build a scope for `viewer` over `taxonomy`
    fn build(&self, taxonomy: Arc<ActionTaxonomy>, viewer: &Viewer) -> PermissionScope;
}

/// Default policy: taxonomy permission per moderation state
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyPolicy;

impl PermissionPolicy for TaxonomyPolicy {
    fn build(&self, taxonomy: Arc<ActionTaxonomy>, viewer: &Viewer) -> PermissionScope {
        Arc::new(TaxonomyPermissions::new(taxonomy, viewer.clone()))
    }
}

/// Scope produced by [`TaxonomyPolicy`]
#[derive(Debug)]
pub struct TaxonomyPermissions {
    taxonomy: Arc<ActionTaxonomy>,
    viewer: Viewer,
}

impl TaxonomyPermissions {
    /// Create scope
    #[inline]
    #[must_use]
    pub fn new(taxonomy: Arc<ActionTaxonomy>, viewer: Viewer) -> Self {
        Self { taxonomy, viewer }
    }
}

impl RevisionPermissions for TaxonomyPermissions {
    fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    fn is_allowed(&self, revision: &Revision, action: &str) -> bool {
        match self.taxonomy.permission(action, revision.moderation_state()) {
            Some(Permission::Everyone) => true,
            Some(Permission::AnyOf(rights)) => self.viewer.has_any(rights),
            None => {
                tracing::debug!(action, state = ?revision.moderation_state(), "no permission entry, denying");
                false
            }
        }
    }
}
