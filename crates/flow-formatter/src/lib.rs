//! Flow Formatter
//!
//! Entity resolution and formatting for board feeds (history,
//! contributions, recent changes).
//!
//! # Core Operations
//!
//! - **Resolve**: batch-load workflows and revisions through an
//!   [`EntityCache`], one storage call per entity kind
//! - **Scope**: per-viewer [`PermissionScope`](flow_actions::PermissionScope)s,
//!   cached for identified viewers
//! - **Format**: action links, descriptions, change sizes and dates
//!
//! # Architecture
//!
//! ```text
//! Storage → BatchLoader → EntityCache
//!                ↓
//!   LinkBuilder + DescriptionFormatter + char_diff → FormattedEntry
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_formatter::{ContributionsFormatter, Formatter, MemoryStorage};
//!
//! let formatter = Arc::new(Formatter::builder(Arc::new(storage)).build());
//! let entries = ContributionsFormatter::new(formatter)
//!     .format_rows(&rows, &viewer)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod chardiff;
pub mod config;
pub mod contributions;
pub mod dates;
pub mod describe;
pub mod error;
pub mod formatter;
pub mod links;
pub mod loader;
pub mod messages;
pub mod permissions;
pub mod storage;
pub mod templating;
pub mod urls;

pub use cache::{CacheStats, EntityCache};
pub use chardiff::{char_diff, CharDiff};
pub use config::FormatterConfig;
pub use contributions::{ContributionRow, ContributionsFormatter, FormattedEntry};
pub use dates::{ChronoLanguage, DateFormats, Language};
pub use describe::DescriptionFormatter;
pub use error::{FormatterError, FormatterResult, StorageError};
pub use formatter::{Formatter, FormatterBuilder};
pub use links::{ActionLinks, Link, LinkBuilder, LinkLabel};
pub use loader::{BatchLoader, ResolvedEntity};
pub use messages::{MessageCatalog, StaticCatalog};
pub use permissions::PermissionResolver;
pub use storage::{MemoryStorage, Storage};
pub use templating::Templating;
pub use urls::{IndexUrlGenerator, UrlGenerator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use flow_actions::Viewer;
    use flow_model::{EntityId, PageTitle, Revision, RevisionKind, UserRef, Workflow};
    use std::sync::Arc;

    #[tokio::test]
    async fn board_feed_end_to_end() {
        let board = Workflow::topic(EntityId::new());
        let title = Revision::builder(RevisionKind::Post, board.id())
            .change_type("new-post")
            .content("Release planning")
            .user(UserRef::new(4, "Bo"))
            .build();
        let storage = MemoryStorage::new();
        storage.insert(board.clone());
        storage.insert(title.clone());

        let formatter = Arc::new(Formatter::builder(Arc::new(storage)).build());
        let entries = ContributionsFormatter::new(Arc::clone(&formatter))
            .format_rows(
                &[ContributionRow::new(board.id(), title.id(), RevisionKind::Post)],
                &Viewer::registered(4, "Bo"),
            )
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert!(entry.description.starts_with("<span class=\"plainlinks\">"));
        assert!(entry.description.contains("Release planning"));
        assert_eq!(
            entry.links.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["topic", "post"]
        );
        assert_eq!(entry.page, PageTitle::new(flow_model::NS_TOPIC, board.id().canonical()).prefixed_text());

        let stats = formatter.loader().cache().stats().await;
        assert_eq!(stats.workflows, 1);
        assert_eq!(stats.revisions, 1);
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
