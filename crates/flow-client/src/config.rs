//! Client configuration

use flow_model::NS_TOPIC;
use serde::{Deserialize, Serialize};

/// Names of the templates the client renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateNames {
    /// Full topic, used by the refresh protocol
    pub topic: String,
    /// Board block loop, used after a topic list reload
    pub block_loop: String,
    /// Topic watch link
    pub topic_watch: String,
    /// Board watch link
    pub board_watch: String,
    /// Topic title edit form
    pub edit_title: String,
    /// Moderated topic placeholder
    pub moderated_topic: String,
    /// Moderated post placeholder
    pub moderated_post: String,
}

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            topic: "flow_topiclist_loop.partial".to_string(),
            block_loop: "flow_block_loop".to_string(),
            topic_watch: "flow_topic_titlebar_watch.partial".to_string(),
            board_watch: "flow_board_watch.partial".to_string(),
            edit_title: "flow_edit_topic_title.partial".to_string(),
            moderated_topic: "flow_moderate_topic_confirmation.partial".to_string(),
            moderated_post: "flow_moderate_post_confirmation.partial".to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Namespace id of topic pages
    pub topic_namespace: i32,
    /// Prefixed page name of the board
    pub page: String,
    /// Board workflow id
    pub board_id: Option<String>,
    /// Whether the board is rendered on a single topic page
    pub in_topic_namespace: bool,
    /// Class marking an element with a request in flight
    pub in_progress_class: String,
    /// Class added to a title while its edit form is open
    pub edit_title_active_class: String,
    /// Message wrapping refresh failures
    pub refresh_error_key: String,
    /// Template names
    pub templates: TemplateNames,
}

impl ClientConfig {
    /// Create default configuration for `page`
    #[inline]
    #[must_use]
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..Self::default()
        }
    }

    /// With board workflow id
    #[inline]
    #[must_use]
    pub fn with_board_id(mut self, id: impl Into<String>) -> Self {
        self.board_id = Some(id.into());
        self
    }

    /// With topic namespace flag
    #[inline]
    #[must_use]
    pub fn with_in_topic_namespace(mut self, in_topic: bool) -> Self {
        self.in_topic_namespace = in_topic;
        self
    }

    /// With template names
    #[inline]
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateNames) -> Self {
        self.templates = templates;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            topic_namespace: NS_TOPIC,
            page: String::new(),
            board_id: None,
            in_topic_namespace: false,
            in_progress_class: "flow-api-inprogress".to_string(),
            edit_title_active_class: "flow-topic-title-activate-edit".to_string(),
            refresh_error_key: "flow-error-fetch-after-open-lock".to_string(),
            templates: TemplateNames::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"page": "Talk:Board", "templates": {"topic": "t"}}"#).unwrap();
        assert_eq!(config.page, "Talk:Board");
        assert_eq!(config.topic_namespace, 2600);
        assert_eq!(config.templates.topic, "t");
        assert_eq!(config.templates.block_loop, "flow_block_loop");
    }
}
