//! Action-link builder
//!
//! Maps a change type to the navigable links shown next to a feed entry.
//! Legacy change-type names are resolved through the taxonomy's alias table
//! before dispatch, so an alias always yields the same links as its target.

use crate::config::FormatterConfig;
use crate::urls::UrlGenerator;
use flow_actions::ActionTaxonomy;
use flow_model::{EntityId, PageTitle};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Link label: a message key, or literal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LinkLabel {
    /// Resolved by the message catalog
    Key(String),
    /// Shown as is
    Text(String),
}

/// Url plus label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Navigable url
    pub url: String,
    /// Human-readable label
    pub label: LinkLabel,
}

/// Ordered mapping link name -> link
pub type ActionLinks = IndexMap<String, Link>;

/// Builds per-entry links from change types
#[derive(Clone)]
pub struct LinkBuilder {
    taxonomy: Arc<ActionTaxonomy>,
    urls: Arc<dyn UrlGenerator>,
    config: FormatterConfig,
}

impl std::fmt::Debug for LinkBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkBuilder")
            .field("taxonomy", &self.taxonomy.len())
            .finish_non_exhaustive()
    }
}

impl LinkBuilder {
    /// Create new link builder
    #[must_use]
    pub fn new(taxonomy: Arc<ActionTaxonomy>, urls: Arc<dyn UrlGenerator>) -> Self {
        Self {
            taxonomy,
            urls,
            config: FormatterConfig::default(),
        }
    }

    /// With label configuration
    #[must_use]
    pub fn with_config(mut self, config: FormatterConfig) -> Self {
        self.config = config;
        self
    }

    /// Links for a change type
    ///
    /// Returns `None` for a missing or unrecognized change type; callers
    /// treat that as "no links". The header family yields an empty map.
    #[must_use]
    pub fn links_for(
        &self,
        page: &PageTitle,
        change_type: Option<&str>,
        workflow_id: EntityId,
        post_id: Option<EntityId>,
    ) -> Option<ActionLinks> {
        let Some(change_type) = change_type else {
            warn!(workflow = %workflow_id, "change has no change type");
            return None;
        };

        let mut links = ActionLinks::new();
        match self.taxonomy.canonical_name(change_type) {
            "reply" | "new-post" | "edit-post" => {
                links.insert("topic".into(), self.topic_link(page, workflow_id));
                if let Some(post) = post_id {
                    links.insert("post".into(), self.post_link(page, workflow_id, post));
                }
            }
            "suppress-post" | "delete-post" | "hide-post" | "restore-post" => {
                links.insert("topic".into(), self.topic_link(page, workflow_id));
                if let Some(post) = post_id {
                    links.insert("post-history".into(), self.post_history_link(page, workflow_id, post));
                }
            }
            "suppress-topic" | "delete-topic" | "hide-topic" | "restore-topic" => {
                links.insert("topic".into(), self.topic_link(page, workflow_id));
                links.insert("topic-history".into(), self.topic_history_link(page, workflow_id));
            }
            "edit-title" => {
                links.insert("topic".into(), self.topic_link(page, workflow_id));
                // the title is the topic's root post
                if let Some(post) = post_id {
                    links.insert("title-history".into(), self.post_history_link(page, workflow_id, post));
                }
            }
            "create-header" | "edit-header" => {}
            other => {
                warn!(change_type = other, workflow = %workflow_id, "unknown change type");
                return None;
            }
        }
        Some(links)
    }

    /// Link to the topic view
    #[must_use]
    pub fn topic_link(&self, page: &PageTitle, workflow_id: EntityId) -> Link {
        Link {
            url: self.urls.build_url(page, "view", &workflow_query(workflow_id, None)),
            label: LinkLabel::Key(self.config.topic_label.clone()),
        }
    }

    /// Link to one post within its topic
    #[must_use]
    pub fn post_link(&self, page: &PageTitle, workflow_id: EntityId, post_id: EntityId) -> Link {
        Link {
            url: self.urls.build_url(page, "view", &workflow_query(workflow_id, Some(post_id))),
            label: LinkLabel::Key(self.config.post_label.clone()),
        }
    }

    /// Link to the topic's history
    #[must_use]
    pub fn topic_history_link(&self, page: &PageTitle, workflow_id: EntityId) -> Link {
        Link {
            url: self.urls.build_url(page, "topic-history", &workflow_query(workflow_id, None)),
            label: LinkLabel::Key(self.config.history_label.clone()),
        }
    }

    /// Link to one post's history
    #[must_use]
    pub fn post_history_link(&self, page: &PageTitle, workflow_id: EntityId, post_id: EntityId) -> Link {
        Link {
            url: self
                .urls
                .build_url(page, "post-history", &workflow_query(workflow_id, Some(post_id))),
            label: LinkLabel::Key(self.config.history_label.clone()),
        }
    }

    /// Link to the board itself, labelled with the page name
    #[must_use]
    pub fn workflow_link(&self, page: &PageTitle) -> Link {
        Link {
            url: self.urls.build_url(page, "view", &[]),
            label: LinkLabel::Text(page.prefixed_text()),
        }
    }
}

/// `workflow=<id>` plus `topic_postId=<id>` for post-scoped links
pub(crate) fn workflow_query(workflow_id: EntityId, post_id: Option<EntityId>) -> Vec<(String, String)> {
    let mut query = vec![("workflow".to_string(), workflow_id.canonical())];
    if let Some(post) = post_id {
        query.push(("topic_postId".to_string(), post.canonical()));
    }
    query
}
