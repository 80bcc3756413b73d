//! Formatter configuration

use serde::{Deserialize, Serialize};

/// Formatter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Namespace of single-topic pages
    pub topic_namespace: i32,
    /// Label key of topic links
    pub topic_label: String,
    /// Label key of post links
    pub post_label: String,
    /// Label key of history links
    pub history_label: String,
    /// Message used when a change type has no history entry
    pub fallback_description: String,
    /// Script path for generated urls
    pub script_path: String,
}

impl FormatterConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With topic namespace id
    #[inline]
    #[must_use]
    pub fn with_topic_namespace(mut self, namespace: i32) -> Self {
        self.topic_namespace = namespace;
        self
    }

    /// With fallback description key
    #[inline]
    #[must_use]
    pub fn with_fallback_description(mut self, key: impl Into<String>) -> Self {
        self.fallback_description = key.into();
        self
    }

    /// With url script path
    #[inline]
    #[must_use]
    pub fn with_script_path(mut self, path: impl Into<String>) -> Self {
        self.script_path = path.into();
        self
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            topic_namespace: flow_model::NS_TOPIC,
            topic_label: "flow-link-topic".to_string(),
            post_label: "flow-link-post".to_string(),
            history_label: "flow-link-history".to_string(),
            fallback_description: "flow-rev-message-unknown".to_string(),
            script_path: "/index.php".to_string(),
        }
    }
}
