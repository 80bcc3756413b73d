//! Per-viewer permission resolver
//!
//! Scopes are built lazily through the [`PermissionPolicy`] collaborator and
//! cached by viewer id for the lifetime of the formatter. Anonymous viewers
//! share id 0 and are never cached.

use dashmap::DashMap;
use flow_actions::{ActionTaxonomy, PermissionPolicy, PermissionScope, Viewer};
use std::sync::Arc;

/// Lazily built, viewer-keyed permission scopes
pub struct PermissionResolver {
    taxonomy: Arc<ActionTaxonomy>,
    policy: Arc<dyn PermissionPolicy>,
    scopes: DashMap<u64, PermissionScope>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cached_viewers", &self.scopes.len())
            .finish_non_exhaustive()
    }
}

impl PermissionResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new(taxonomy: Arc<ActionTaxonomy>, policy: Arc<dyn PermissionPolicy>) -> Self {
        Self {
            taxonomy,
            policy,
            scopes: DashMap::new(),
        }
    }

    /// Scope for `viewer`
    #[must_use]
    pub fn permissions_for(&self, viewer: &Viewer) -> PermissionScope {
        if !viewer.is_identified() {
            return self.policy.build(Arc::clone(&self.taxonomy), viewer);
        }

        if let Some(scope) = self.scopes.get(&viewer.id) {
            return Arc::clone(scope.value());
        }

        let scope = self.policy.build(Arc::clone(&self.taxonomy), viewer);
        self.scopes.insert(viewer.id, Arc::clone(&scope));
        tracing::debug!(viewer = viewer.id, "cached permission scope");
        scope
    }

    /// Number of cached viewers
    #[inline]
    #[must_use]
    pub fn cached_viewers(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_actions::{RevisionPermissions, TaxonomyPermissions};
    use mockall::mock;

    mock! {
        Policy {}

        impl PermissionPolicy for Policy {
            fn build(&self, taxonomy: Arc<ActionTaxonomy>, viewer: &Viewer) -> PermissionScope;
        }
    }

    fn scope_for(taxonomy: Arc<ActionTaxonomy>, viewer: &Viewer) -> PermissionScope {
        Arc::new(TaxonomyPermissions::new(taxonomy, viewer.clone()))
    }

    #[test]
    fn identified_viewer_built_once() {
        let mut policy = MockPolicy::new();
        policy.expect_build().times(1).returning(scope_for);

        let resolver = PermissionResolver::new(Arc::new(ActionTaxonomy::with_defaults()), Arc::new(policy));
        let viewer = Viewer::registered(42, "Reader");

        let first = resolver.permissions_for(&viewer);
        let second = resolver.permissions_for(&viewer);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_viewers(), 1);
    }

    #[test]
    fn anonymous_viewer_rebuilt_every_time() {
        let mut policy = MockPolicy::new();
        policy.expect_build().times(3).returning(scope_for);

        let resolver = PermissionResolver::new(Arc::new(ActionTaxonomy::with_defaults()), Arc::new(policy));
        for _ in 0..3 {
            let scope = resolver.permissions_for(&Viewer::anonymous());
            assert!(!scope.viewer().is_identified());
        }
        assert_eq!(resolver.cached_viewers(), 0);
    }

    #[test]
    fn distinct_viewers_get_distinct_scopes() {
        let mut policy = MockPolicy::new();
        policy.expect_build().times(2).returning(scope_for);

        let resolver = PermissionResolver::new(Arc::new(ActionTaxonomy::with_defaults()), Arc::new(policy));
        let a = resolver.permissions_for(&Viewer::registered(1, "A"));
        let b = resolver.permissions_for(&Viewer::registered(2, "B"));

        assert_eq!(a.viewer().name, "A");
        assert_eq!(b.viewer().name, "B");
    }
}
