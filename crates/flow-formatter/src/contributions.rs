//! Contribution feed entries
//!
//! Combines links, description, change size and dates for one revision,
//! after checking that the viewer may see its history.

use crate::chardiff::CharDiff;
use crate::dates::DateFormats;
use crate::error::FormatterResult;
use crate::formatter::Formatter;
use crate::links::ActionLinks;
use flow_actions::Viewer;
use flow_model::{EntityId, PageTitle, Revision, RevisionKind, Workflow};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One contribution to format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRow {
    /// Workflow the revision belongs to
    pub workflow_id: EntityId,
    /// The revision
    pub revision_id: EntityId,
    /// Kind of the revision
    pub revision_kind: RevisionKind,
    /// Predecessor, if any
    pub previous_id: Option<EntityId>,
    /// Block the revision was made in
    pub block_type: String,
}

impl ContributionRow {
    /// Create row for a revision without predecessor
    #[must_use]
    pub fn new(workflow_id: EntityId, revision_id: EntityId, revision_kind: RevisionKind) -> Self {
        let block_type = match revision_kind {
            RevisionKind::Header => "header",
            RevisionKind::Post => "topic",
            RevisionKind::PostSummary => "topicsummary",
        };
        Self {
            workflow_id,
            revision_id,
            revision_kind,
            previous_id: None,
            block_type: block_type.to_string(),
        }
    }

    /// With predecessor revision
    #[inline]
    #[must_use]
    pub fn with_previous(mut self, previous: EntityId) -> Self {
        self.previous_id = Some(previous);
        self
    }
}

/// A formatted feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedEntry {
    /// Revision shown
    pub revision_id: EntityId,
    /// Page the workflow lives on
    pub page: String,
    /// Navigable links
    pub links: ActionLinks,
    /// Html description
    pub description: String,
    /// Change size, when computable
    pub char_diff: Option<CharDiff>,
    /// Timestamp renderings
    pub dates: DateFormats,
    /// History row class
    pub class: String,
}

/// Formats contribution rows
#[derive(Debug, Clone)]
pub struct ContributionsFormatter {
    formatter: Arc<Formatter>,
}

impl ContributionsFormatter {
    /// Create new contributions formatter
    #[inline]
    #[must_use]
    pub fn new(formatter: Arc<Formatter>) -> Self {
        Self { formatter }
    }

    /// Format many rows with one storage call per entity kind
    ///
    /// Rows whose workflow or revision is missing, or which `viewer` may not
    /// see, are left out.
    ///
    /// # Errors
    /// Returns error if storage fails
    pub async fn format_rows(
        &self,
        rows: &[ContributionRow],
        viewer: &Viewer,
    ) -> FormatterResult<Vec<FormattedEntry>> {
        let workflows = self
            .formatter
            .load_workflows(rows.iter().map(|row| row.workflow_id))
            .await?;
        let revisions = self
            .formatter
            .load_revisions(rows.iter().map(|row| {
                let ids: Vec<EntityId> = std::iter::once(row.revision_id).chain(row.previous_id).collect();
                (row.revision_kind, ids)
            }))
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let (Some(workflow), Some(revision)) =
                (workflows.get(&row.workflow_id), revisions.get(&row.revision_id))
            else {
                debug!(revision = %row.revision_id, "skipping row with missing entities");
                continue;
            };
            let previous = row.previous_id.and_then(|id| revisions.get(&id));
            if let Some(entry) =
                self.format_entry(workflow, &row.block_type, revision, previous.map(|p| &**p), viewer)
            {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Format one revision; `None` when `viewer` may not see its history
    #[must_use]
    pub fn format_entry(
        &self,
        workflow: &Workflow,
        block_type: &str,
        revision: &Revision,
        previous: Option<&Revision>,
        viewer: &Viewer,
    ) -> Option<FormattedEntry> {
        if !self.formatter.permissions_for(viewer).is_allowed(revision, "history") {
            debug!(revision = %revision.id(), viewer = viewer.id, "history not allowed");
            return None;
        }

        let change_type = revision.change_type().map(|c| c.as_str());
        let page: &PageTitle = workflow.page();
        let links = self
            .formatter
            .links_for(page, change_type, workflow.id(), revision.post_id())
            .unwrap_or_default();
        let class = change_type
            .and_then(|c| self.formatter.taxonomy().history(c))
            .map(|h| h.class.clone())
            .unwrap_or_default();

        Some(FormattedEntry {
            revision_id: revision.id(),
            page: page.prefixed_text(),
            links,
            description: self.formatter.describe(workflow, block_type, revision),
            char_diff: self.formatter.char_diff(revision, previous),
            dates: self.formatter.date_formats(revision, viewer),
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use flow_model::{ModerationState, UserRef};

    fn setup() -> (ContributionsFormatter, Workflow, Revision, Revision) {
        let workflow = Workflow::topic(EntityId::new());
        let first = Revision::builder(RevisionKind::Post, workflow.id())
            .change_type("new-post")
            .content("Hi")
            .user(UserRef::new(1, "Ann"))
            .build();
        let edit = Revision::builder(RevisionKind::Post, workflow.id())
            .previous(first.id())
            .change_type("edit-title")
            .content("Hello there")
            .user(UserRef::new(1, "Ann"))
            .build();
        let storage = MemoryStorage::new();
        storage.insert(workflow.clone());
        storage.insert(first.clone());
        storage.insert(edit.clone());
        let formatter = Arc::new(Formatter::builder(Arc::new(storage)).build());
        (ContributionsFormatter::new(formatter), workflow, first, edit)
    }

    #[tokio::test]
    async fn formats_rows_in_order() {
        let (contributions, workflow, first, edit) = setup();
        let rows = vec![
            ContributionRow::new(workflow.id(), first.id(), RevisionKind::Post),
            ContributionRow::new(workflow.id(), edit.id(), RevisionKind::Post).with_previous(first.id()),
            ContributionRow::new(workflow.id(), EntityId::new(), RevisionKind::Post),
        ];

        let entries = contributions.format_rows(&rows, &Viewer::anonymous()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revision_id, first.id());
        assert_eq!(entries[1].char_diff.map(|d| d.delta()), Some(9));
        assert_eq!(entries[1].class, "flow-history-edit-title");
        assert!(entries[1].links.contains_key("title-history"));
    }

    #[test]
    fn suppressed_history_hidden_from_anonymous() {
        let (contributions, workflow, _, _) = setup();
        let suppressed = Revision::builder(RevisionKind::Post, workflow.id())
            .change_type("suppress-post")
            .moderated(ModerationState::Suppress, "oversight")
            .build();

        assert!(contributions
            .format_entry(&workflow, "topic", &suppressed, None, &Viewer::anonymous())
            .is_none());

        let oversighter = Viewer::registered(9, "Olga").with_rights(["flow-suppress"]);
        assert!(contributions
            .format_entry(&workflow, "topic", &suppressed, None, &oversighter)
            .is_some());
    }
}
