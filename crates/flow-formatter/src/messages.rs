//! Localization collaborator contract
//!
//! Messages use positional `$1`, `$2`, ... placeholders. [`MessageParam::Text`]
//! values are escaped; `Raw` values are inserted verbatim; `Num` values are
//! formatted as numbers.

use flow_actions::MessageParam;
use handlebars::html_escape;
use std::collections::HashMap;

/// Resolves message keys into rendered strings
pub trait MessageCatalog: Send + Sync {
    /// Render `key` with positional parameters into safe markup
    fn parse(&self, key: &str, params: &[MessageParam]) -> String;

    /// Render `key` as plain text (no markup)
    fn text(&self, key: &str, params: &[MessageParam]) -> String {
        self.parse(key, params)
    }
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    messages: HashMap<String, String>,
}

impl StaticCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the English board messages
    #[must_use]
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, text) in ENGLISH {
            catalog.insert(*key, *text);
        }
        catalog
    }

    /// Add or replace a message
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.messages.insert(key.into(), text.into());
    }

    /// Builder form of [`StaticCatalog::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }

    /// Check if key exists
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }
}

impl MessageCatalog for StaticCatalog {
    fn parse(&self, key: &str, params: &[MessageParam]) -> String {
        let Some(template) = self.messages.get(key) else {
            return format!("&lt;{}&gt;", html_escape(key));
        };
        substitute(template, params, true)
    }

    fn text(&self, key: &str, params: &[MessageParam]) -> String {
        let Some(template) = self.messages.get(key) else {
            return format!("<{key}>");
        };
        substitute(template, params, false)
    }
}

/// Replace `$n` placeholders, right to left so `$10` wins over `$1`
fn substitute(template: &str, params: &[MessageParam], escape: bool) -> String {
    let mut out = template.to_string();
    for (index, param) in params.iter().enumerate().rev() {
        let value = match param {
            MessageParam::Text(text) if escape => html_escape(text),
            MessageParam::Text(text) | MessageParam::Raw(text) => text.clone(),
            MessageParam::Num(n) => n.to_string(),
        };
        out = out.replace(&format!("${}", index + 1), &value);
    }
    out
}

const ENGLISH: &[(&str, &str)] = &[
    ("flow-link-topic", "topic"),
    ("flow-link-post", "post"),
    ("flow-link-history", "history"),
    ("flow-rev-message-new-post", "$1 created the topic \"<a href=\"$3\">$4</a>\""),
    ("flow-rev-message-reply", "$1 <a href=\"$3\">commented</a> on <a href=\"$4\">a topic</a>"),
    ("flow-rev-message-edit-post", "$1 <a href=\"$3\">edited a comment</a> on <a href=\"$4\">a topic</a>"),
    ("flow-rev-message-edit-title", "$1 edited the topic title to \"<a href=\"$3\">$4</a>\""),
    ("flow-rev-message-create-header", "$1 created the board description"),
    ("flow-rev-message-edit-header", "$1 edited the board description"),
    ("flow-rev-message-hid-post", "$1 hid a <a href=\"$3\">comment</a> on <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-deleted-post", "$1 deleted a <a href=\"$3\">comment</a> on <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-suppressed-post", "$1 suppressed a <a href=\"$3\">comment</a> on <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-restored-post", "$1 restored a <a href=\"$3\">comment</a> on <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-hid-topic", "$1 hid <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-deleted-topic", "$1 deleted <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-suppressed-topic", "$1 suppressed <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-restored-topic", "$1 restored <a href=\"$5\">a topic</a> ($4)"),
    ("flow-rev-message-unknown", "Unknown change: $1"),
    ("flow-error-http", "An error occurred while contacting the server."),
    ("flow-error-external", "An error occurred.<br />The error message received was: $1"),
    ("flow-error-fetch-after-open-lock", "An error occurred when requesting the new topic. $1"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_params_are_escaped_raw_are_not() {
        let catalog = StaticCatalog::new().with("k", "$1 and $2 and $3");
        let out = catalog.parse(
            "k",
            &[
                MessageParam::text("<b>"),
                MessageParam::raw("<i>x</i>"),
                MessageParam::Num(12),
            ],
        );
        assert_eq!(out, "&lt;b&gt; and <i>x</i> and 12");
    }

    #[test]
    fn double_digit_placeholders() {
        let template = (1..=10).map(|i| format!("${i}")).collect::<Vec<_>>().join(",");
        let catalog = StaticCatalog::new().with("k", template);
        let params: Vec<_> = (1..=10).map(MessageParam::Num).collect();
        assert_eq!(catalog.parse("k", &params), "1,2,3,4,5,6,7,8,9,10");
    }

    #[test]
    fn missing_key_renders_marker() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.parse("nope", &[]), "&lt;nope&gt;");
        assert_eq!(catalog.text("nope", &[]), "<nope>");
    }

    #[test]
    fn english_has_link_labels() {
        let catalog = StaticCatalog::english();
        assert!(catalog.contains("flow-link-topic"));
        assert_eq!(catalog.text("flow-link-history", &[]), "history");
    }
}
