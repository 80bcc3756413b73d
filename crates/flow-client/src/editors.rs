//! Editing surfaces backing form fields
//!
//! A form textarea may be backed by a richer editor; its submitted content
//! must come from that editor, not from the textarea. Plain textareas are
//! the default surface.

use crate::dom::{Document, NodeId};
use crate::error::{ClientError, ClientResult};
use dashmap::DashMap;
use std::sync::Arc;

/// Format tag of the default surface
pub const DEFAULT_FORMAT: &str = "wikitext";

/// An editing surface
pub trait EditorSurface: Send + Sync {
    /// Content format this surface produces
    fn format(&self) -> &str;

    /// Current raw content of the field
    fn raw_content(&self, document: &Document, field: NodeId) -> String;
}

/// Plain textarea: content is the field's `value`, falling back to its text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextareaEditor;

impl EditorSurface for TextareaEditor {
    fn format(&self) -> &str {
        DEFAULT_FORMAT
    }

    fn raw_content(&self, document: &Document, field: NodeId) -> String {
        document
            .attr(field, "value")
            .or_else(|| document.text(field))
            .unwrap_or_default()
            .to_string()
    }
}

/// Registered surfaces and the fields they back
pub struct EditorRegistry {
    surfaces: DashMap<String, Arc<dyn EditorSurface>>,
    attached: DashMap<NodeId, String>,
    default_format: String,
}

impl std::fmt::Debug for EditorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorRegistry")
            .field("surfaces", &self.surfaces.len())
            .field("attached", &self.attached.len())
            .field("default_format", &self.default_format)
            .finish()
    }
}

impl Default for EditorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorRegistry {
    /// Registry with the textarea surface as default
    #[must_use]
    pub fn new() -> Self {
        let registry = Self {
            surfaces: DashMap::new(),
            attached: DashMap::new(),
            default_format: DEFAULT_FORMAT.to_string(),
        };
        registry.register(Arc::new(TextareaEditor));
        registry
    }

    /// Register a surface under its format tag
    pub fn register(&self, surface: Arc<dyn EditorSurface>) {
        self.surfaces.insert(surface.format().to_string(), surface);
    }

    /// Back `field` with the surface registered for `format`
    ///
    /// # Errors
    /// Returns [`ClientError::UnknownEditor`] if no surface has that format
    pub fn attach(&self, field: NodeId, format: &str) -> ClientResult<()> {
        if !self.surfaces.contains_key(format) {
            return Err(ClientError::UnknownEditor(format.to_string()));
        }
        self.attached.insert(field, format.to_string());
        Ok(())
    }

    /// Release a field
    pub fn detach(&self, field: NodeId) {
        self.attached.remove(&field);
    }

    /// Format new editors use
    #[inline]
    #[must_use]
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Surface backing `field`: the attached one, else the default
    #[must_use]
    pub fn surface_for(&self, field: NodeId) -> Option<Arc<dyn EditorSurface>> {
        let format = self
            .attached
            .get(&field)
            .map_or_else(|| self.default_format.clone(), |f| f.value().clone());
        self.surfaces.get(&format).map(|s| Arc::clone(s.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, Selector};

    struct UpperEditor;

    impl EditorSurface for UpperEditor {
        fn format(&self) -> &str {
            "html"
        }

        fn raw_content(&self, document: &Document, field: NodeId) -> String {
            document.text(field).unwrap_or_default().to_uppercase()
        }
    }

    #[test]
    fn default_and_attached_surfaces() {
        let mut doc = Document::new();
        let area = doc
            .append(doc.root(), Element::new("textarea").with_text("body"))
            .unwrap();
        let registry = EditorRegistry::new();

        let surface = registry.surface_for(area).unwrap();
        assert_eq!(surface.format(), "wikitext");
        assert_eq!(surface.raw_content(&doc, area), "body");

        registry.register(Arc::new(UpperEditor));
        registry.attach(area, "html").unwrap();
        let surface = registry.surface_for(area).unwrap();
        assert_eq!(surface.raw_content(&doc, area), "BODY");

        assert!(registry.attach(area, "visual").is_err());
        assert!(doc.find_first(doc.root(), &Selector::tag("textarea")).is_some());
    }

    #[test]
    fn textarea_value_wins_over_text() {
        let mut doc = Document::new();
        let area = doc
            .append(doc.root(), Element::new("textarea").with_attr("value", "typed").with_text("initial"))
            .unwrap();
        assert_eq!(TextareaEditor.raw_content(&doc, area), "typed");
    }
}
