//! Flow action taxonomy
//!
//! The closed set of change types a revision can carry, and everything the
//! formatting engine needs to know about each of them.
//!
//! # Core Concepts
//!
//! - [`ActionTaxonomy`]: change type → [`ActionDefinition`], with legacy aliases
//! - [`HistorySpec`]: message key and ordered [`ParamSpec`] list for descriptions
//! - [`ParamSpec`]: literal message parameter or side-effect-free callback
//! - [`RevisionPermissions`]: per-viewer permission scope
//! - [`PermissionPolicy`]: builds scopes from a taxonomy and a [`Viewer`]
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_actions::ActionTaxonomy;
//!
//! let taxonomy = ActionTaxonomy::with_defaults();
//!
//! // legacy names resolve to their canonical action
//! assert_eq!(taxonomy.canonical_name("censor-post"), "suppress-post");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod params;
mod permissions;
mod taxonomy;

pub use error::ActionError;
pub use params::{builtin, MessageParam, ParamCallback, ParamContext, ParamSpec, RenderingContext};
pub use permissions::{
    PermissionPolicy, PermissionScope, RevisionPermissions, TaxonomyPermissions, TaxonomyPolicy,
    Viewer,
};
pub use taxonomy::{ActionDefinition, ActionEntry, ActionTaxonomy, HistorySpec, Permission};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use flow_model::{EntityId, ModerationState, Revision, RevisionKind};
    use std::sync::Arc;

    #[test]
    fn policy_uses_taxonomy_permissions() {
        let taxonomy = Arc::new(ActionTaxonomy::with_defaults());
        let policy = TaxonomyPolicy;

        let reader = policy.build(Arc::clone(&taxonomy), &Viewer::registered(7, "Reader"));
        let oversighter = policy.build(
            Arc::clone(&taxonomy),
            &Viewer::registered(8, "Oversight").with_rights(["flow-suppress"]),
        );

        let suppressed = Revision::builder(RevisionKind::Post, EntityId::new())
            .change_type("suppress-post")
            .moderated(ModerationState::Suppress, "private data")
            .build();

        assert!(!reader.is_allowed(&suppressed, "history"));
        assert!(oversighter.is_allowed(&suppressed, "history"));
    }

    #[test]
    fn every_linkable_change_type_has_history() {
        let taxonomy = ActionTaxonomy::with_defaults();
        for name in taxonomy.change_types() {
            assert!(
                taxonomy.history(name).is_some(),
                "change type {name} has no history message"
            );
        }
    }
}
