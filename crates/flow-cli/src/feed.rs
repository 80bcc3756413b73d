//! Contribution feed from an entity dump

use anyhow::{Context, Result};
use flow_formatter::{ContributionRow, FormattedEntry, MemoryStorage};
use flow_model::{EntityId, RevisionKind, StoredEntity};
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const LINE: &str = "line";

/// Read a JSON array of stored entities
pub(crate) fn load_dump(path: &Path) -> Result<Vec<StoredEntity>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading dump {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing dump {}", path.display()))
}

/// Storage holding every entity of the dump
pub(crate) fn storage_of(entities: &[StoredEntity]) -> MemoryStorage {
    let storage = MemoryStorage::new();
    for entity in entities {
        storage.insert(entity.clone());
    }
    storage
}

/// One row per revision in dump order
///
/// Post revisions are attributed to the workflow listing the post, or to
/// the workflow sharing its id (the topic title post).
pub(crate) fn rows_of(entities: &[StoredEntity]) -> Vec<ContributionRow> {
    let mut owners: HashMap<EntityId, EntityId> = HashMap::new();
    for entity in entities {
        if let StoredEntity::Workflow(workflow) = entity {
            owners.insert(workflow.id(), workflow.id());
            for post in workflow.post_ids() {
                owners.insert(*post, workflow.id());
            }
        }
    }

    entities
        .iter()
        .filter_map(|entity| match entity {
            StoredEntity::Revision(revision) => Some(revision),
            StoredEntity::Workflow(_) => None,
        })
        .filter_map(|revision| {
            let owner = match revision.kind() {
                RevisionKind::Header => Some(revision.object_id()),
                RevisionKind::Post | RevisionKind::PostSummary => owners.get(&revision.object_id()).copied(),
            };
            let Some(workflow_id) = owner else {
                warn!(revision = %revision.id(), "revision has no workflow in dump");
                return None;
            };
            let row = ContributionRow::new(workflow_id, revision.id(), revision.kind());
            Some(match revision.previous_id() {
                Some(previous) => row.with_previous(previous),
                None => row,
            })
        })
        .collect()
}

/// Renders entries through a line template
pub(crate) struct LineRenderer {
    registry: Handlebars<'static>,
}

impl LineRenderer {
    /// Compile `template`
    pub(crate) fn new(template: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_template_string(LINE, template)
            .context("compiling line template")?;
        Ok(Self { registry })
    }

    /// Render one entry
    pub(crate) fn render(&self, entry: &FormattedEntry) -> Result<String> {
        let mut data = serde_json::to_value(entry)?;
        if let (Some(diff), Value::Object(map)) = (entry.char_diff, &mut data) {
            map.insert("delta".into(), Value::String(format!("{:+}", diff.delta())));
        }
        debug!(revision = %entry.revision_id, "rendering line");
        self.registry
            .render(LINE, &data)
            .with_context(|| format!("rendering revision {}", entry.revision_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LINE_TEMPLATE;
    use flow_actions::Viewer;
    use flow_formatter::{ContributionsFormatter, Formatter};
    use flow_model::{Revision, Workflow};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;

    fn dump() -> (Workflow, Vec<StoredEntity>) {
        let post = EntityId::new();
        let workflow = Workflow::topic(EntityId::new()).with_posts([post]);
        let first = Revision::builder(RevisionKind::Post, post)
            .change_type("reply")
            .content("Hi")
            .build();
        let edit = Revision::builder(RevisionKind::Post, post)
            .previous(first.id())
            .change_type("edit-post")
            .content("Hi there")
            .build();
        let stray = Revision::builder(RevisionKind::Post, EntityId::new())
            .change_type("reply")
            .build();
        (
            workflow.clone(),
            vec![workflow.into(), first.into(), edit.into(), stray.into()],
        )
    }

    #[test]
    fn rows_follow_dump_order_and_skip_orphans() {
        let (workflow, entities) = dump();
        let rows = rows_of(&entities);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.workflow_id == workflow.id()));
        assert_eq!(rows[0].previous_id, None);
        assert_eq!(rows[1].previous_id, Some(rows[0].revision_id));
    }

    #[test]
    fn load_dump_round_trips_entities() {
        let (_, entities) = dump();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&entities).unwrap()).unwrap();

        assert_eq!(load_dump(file.path()).unwrap(), entities);
        assert!(load_dump(Path::new("/nonexistent/dump.json")).is_err());
    }

    #[tokio::test]
    async fn renders_signed_delta() {
        let (_, entities) = dump();
        let formatter = Arc::new(Formatter::builder(Arc::new(storage_of(&entities))).build());
        let entries = ContributionsFormatter::new(formatter)
            .format_rows(&rows_of(&entities), &Viewer::anonymous())
            .await
            .unwrap();
        let renderer = LineRenderer::new(DEFAULT_LINE_TEMPLATE).unwrap();

        let lines: Vec<String> = entries.iter().map(|e| renderer.render(e).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("(+2)"), "{}", lines[0]);
        assert!(lines[1].contains("(+6)"), "{}", lines[1]);
    }

    #[test]
    fn bad_template_is_reported() {
        assert!(LineRenderer::new("{{#if}}").is_err());
    }
}
