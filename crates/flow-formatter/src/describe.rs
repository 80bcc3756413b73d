//! Description formatter
//!
//! Renders the history message of a revision's change type. Parameter
//! specs are resolved left to right against one fixed [`ParamContext`],
//! then handed to the message catalog. The result is wrapped in a
//! `plainlinks` span so embedded links render inline.

use crate::messages::MessageCatalog;
use flow_actions::{ActionTaxonomy, MessageParam, ParamContext, RenderingContext};
use flow_model::{Revision, Workflow};
use handlebars::html_escape;
use std::sync::Arc;
use tracing::warn;

/// Describes revisions in running text
#[derive(Clone)]
pub struct DescriptionFormatter {
    taxonomy: Arc<ActionTaxonomy>,
    catalog: Arc<dyn MessageCatalog>,
    rendering: Arc<dyn RenderingContext>,
    fallback_key: String,
}

impl std::fmt::Debug for DescriptionFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptionFormatter")
            .field("fallback_key", &self.fallback_key)
            .finish_non_exhaustive()
    }
}

impl DescriptionFormatter {
    /// Create new description formatter
    #[must_use]
    pub fn new(
        taxonomy: Arc<ActionTaxonomy>,
        catalog: Arc<dyn MessageCatalog>,
        rendering: Arc<dyn RenderingContext>,
    ) -> Self {
        Self {
            taxonomy,
            catalog,
            rendering,
            fallback_key: "flow-rev-message-unknown".to_string(),
        }
    }

    /// With message key used for unrecognized change types
    #[must_use]
    pub fn with_fallback_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_key = key.into();
        self
    }

    /// Describe `revision`, made in `block_type` of `workflow`
    ///
    /// Never fails: unrecognized change types render a fallback message.
    #[must_use]
    pub fn describe(&self, workflow: &Workflow, block_type: &str, revision: &Revision) -> String {
        let change_type = revision.change_type().map_or("", |c| c.as_str());

        let message = match self.taxonomy.history(change_type) {
            Some(history) => {
                let ctx = ParamContext {
                    revision,
                    rendering: self.rendering.as_ref(),
                    workflow_id: workflow.id(),
                    block_type,
                };
                let params: Vec<MessageParam> =
                    history.i18n_params.iter().map(|spec| spec.resolve(&ctx)).collect();
                self.catalog.parse(&history.i18n_message, &params)
            }
            None => {
                warn!(change_type, revision = %revision.id(), "no history message for change type");
                self.fallback(change_type)
            }
        };

        format!("<span class=\"plainlinks\">{message}</span>")
    }

    fn fallback(&self, change_type: &str) -> String {
        let rendered = self
            .catalog
            .parse(&self.fallback_key, &[MessageParam::text(change_type)]);
        if rendered.is_empty() {
            html_escape(&self.fallback_key)
        } else {
            rendered
        }
    }
}
