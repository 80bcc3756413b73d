//! Flow entity model
//!
//! Server-side entities that the formatting engine resolves and the client
//! mirrors.
//!
//! # Core Concepts
//!
//! - [`EntityId`]: sortable 128-bit identifier shared by workflows, revisions and posts
//! - [`Workflow`]: root container of a topic or a board
//! - [`Revision`]: immutable content snapshot tagged with a [`ChangeType`]
//! - [`PageTitle`]: the page a workflow is rendered on
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_model::{EntityId, Revision, RevisionKind};
//!
//! let post_id = EntityId::new();
//! let revision = Revision::builder(RevisionKind::Post, post_id)
//!     .change_type("reply")
//!     .content("Hello")
//!     .build();
//!
//! assert!(revision.id().timestamp() <= chrono::Utc::now());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod entity;
mod error;
mod id;
mod revision;
mod title;
mod workflow;

pub use entity::{EntityKind, StoredEntity};
pub use error::{ModelError, ModelResult};
pub use id::{EntityId, IntoEntityId};
pub use revision::{ChangeType, ModerationState, Revision, RevisionBuilder, RevisionKind, UserRef};
pub use title::{PageTitle, NS_MAIN, NS_TOPIC, NS_USER};
pub use workflow::{Workflow, WorkflowKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn revision_chain_orders_by_identifier() {
        let post = EntityId::new();
        let first = Revision::builder(RevisionKind::Post, post)
            .change_type("new-post")
            .content("first")
            .build();
        let second = Revision::builder(RevisionKind::Post, post)
            .previous(first.id())
            .change_type("edit-post")
            .content("first, edited")
            .build();

        assert!(second.id() > first.id());
        assert_eq!(second.previous_id(), Some(first.id()));
        assert_eq!(second.object_id(), post);
    }

    #[test]
    fn workflow_topic_page() {
        let workflow = Workflow::topic(EntityId::new());
        assert_eq!(workflow.page().namespace(), NS_TOPIC);
        assert_eq!(workflow.page().text(), workflow.id().to_string());
    }
}
