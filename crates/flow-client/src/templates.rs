//! Templating collaborator
//!
//! A template renders a data context into an element tree. The returned
//! element is a wrapper: its children are the rendered fragment.

use crate::dom::Element;
use crate::error::{ClientError, ClientResult};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Renders named templates
pub trait TemplateEngine: Send + Sync {
    /// Render `name` with `data`; the fragment is the wrapper's children
    ///
    /// # Errors
    /// Returns [`ClientError::Template`] if the template is unknown or fails
    fn render(&self, name: &str, data: &Value) -> ClientResult<Element>;
}

/// Template implemented as a function
pub type TemplateFn = Arc<dyn Fn(&Value) -> ClientResult<Vec<Element>> + Send + Sync>;

/// Engine backed by registered functions
#[derive(Default)]
pub struct TemplateRegistry {
    templates: DashMap<String, TemplateFn>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.len())
            .finish()
    }
}

impl TemplateRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a template
    pub fn register<F>(&self, name: impl Into<String>, template: F)
    where
        F: Fn(&Value) -> ClientResult<Vec<Element>> + Send + Sync + 'static,
    {
        self.templates.insert(name.into(), Arc::new(template));
    }

    /// Builder form of [`TemplateRegistry::register`]
    #[must_use]
    pub fn with<F>(self, name: impl Into<String>, template: F) -> Self
    where
        F: Fn(&Value) -> ClientResult<Vec<Element>> + Send + Sync + 'static,
    {
        self.register(name, template);
        self
    }

    /// Check if a template exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl TemplateEngine for TemplateRegistry {
    fn render(&self, name: &str, data: &Value) -> ClientResult<Element> {
        let template = self
            .templates
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ClientError::Template {
                name: name.to_string(),
                message: "not registered".to_string(),
            })?;
        let children = template(data)?;
        Ok(Element {
            tag: "template".to_string(),
            children,
            ..Element::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_template_wraps_fragment() {
        let engine = TemplateRegistry::new().with("greeting", |data| {
            let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
            Ok(vec![Element::new("p").with_text(format!("hi {name}"))])
        });
        let wrapper = engine.render("greeting", &json!({"name": "Ann"})).unwrap();
        assert_eq!(wrapper.children.len(), 1);
        assert_eq!(wrapper.children[0].text, "hi Ann");
    }

    #[test]
    fn unknown_template_fails() {
        let err = TemplateRegistry::new().render("missing", &Value::Null).unwrap_err();
        assert!(matches!(err, ClientError::Template { .. }));
    }
}
