//! In-memory document model
//!
//! A small arena of elements standing in for the rendered board. Rendered
//! fragments are built as detached subtrees and then swapped into place with
//! [`Document::replace_with`]; node ids stay valid after detaching, so a
//! replaced element can still be inspected.
//!
//! Selectors support tag names, `#id`, `.class`, and the descendant and
//! child (`>`) combinators.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Handle of an element in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Owned element tree, as produced by templates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    /// Tag name
    pub tag: String,
    /// `id` attribute
    pub id: Option<String>,
    /// Class list
    pub classes: Vec<String>,
    /// Other attributes
    pub attrs: BTreeMap<String, String>,
    /// Attached data values
    pub data: BTreeMap<String, Value>,
    /// Text content
    pub text: String,
    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create element with a tag
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// With id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With an extra class
    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// With attribute
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// With data value
    #[inline]
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// With text content
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// With child element
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Check class membership
    #[inline]
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    data: BTreeMap<String, Value>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed element tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create document with an empty `body` root
    #[must_use]
    pub fn new() -> Self {
        Self::from_element(Element::new("body"))
    }

    /// Create document rooted at `root`
    #[must_use]
    pub fn from_element(root: Element) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.build(root);
        doc
    }

    /// Root element
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Materialize `element` as a detached subtree
    pub fn build(&mut self, element: Element) -> NodeId {
        let Element {
            tag,
            id,
            classes,
            attrs,
            data,
            text,
            children,
        } = element;
        let node = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag,
            id,
            classes,
            attrs,
            data,
            text,
            parent: None,
            children: Vec::new(),
        });
        for child in children {
            let child = self.build(child);
            self.nodes[child.0].parent = Some(node);
            self.nodes[node.0].children.push(child);
        }
        node
    }

    /// Build `element` and append it to `parent`
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `parent`
    pub fn append(&mut self, parent: NodeId, element: Element) -> ClientResult<NodeId> {
        self.node(parent)?;
        let node = self.build(element);
        self.attach(parent, node, None);
        Ok(node)
    }

    /// Build `element` and insert it as first child of `parent`
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `parent`
    pub fn prepend(&mut self, parent: NodeId, element: Element) -> ClientResult<NodeId> {
        self.node(parent)?;
        let node = self.build(element);
        self.attach(parent, node, Some(0));
        Ok(node)
    }

    /// Move existing nodes to the end of `parent`
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown ids
    pub fn append_nodes(&mut self, parent: NodeId, nodes: &[NodeId]) -> ClientResult<()> {
        self.node(parent)?;
        for &node in nodes {
            self.detach(node)?;
            self.attach(parent, node, None);
        }
        Ok(())
    }

    /// Detach `node` from its parent; it stays addressable
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn detach(&mut self, node: NodeId) -> ClientResult<()> {
        if let Some(parent) = self.node(node)?.parent {
            self.nodes[parent.0].children.retain(|&c| c != node);
            self.nodes[node.0].parent = None;
        }
        Ok(())
    }

    /// Remove all children of `node`
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn clear_children(&mut self, node: NodeId) -> ClientResult<()> {
        let children = std::mem::take(&mut self.node_mut(node)?.children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        Ok(())
    }

    /// Put `replacements` where `target` is and detach `target`
    ///
    /// A detached `target` has no position; the call is then a no-op.
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown ids
    pub fn replace_with(&mut self, target: NodeId, replacements: &[NodeId]) -> ClientResult<()> {
        for &node in replacements {
            self.node(node)?;
        }
        let Some(parent) = self.node(target)?.parent else {
            return Ok(());
        };
        for &node in replacements {
            if node != target {
                self.detach(node)?;
            }
        }
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == target)
            .unwrap_or(self.nodes[parent.0].children.len());
        for (offset, &node) in replacements.iter().filter(|&&n| n != target).enumerate() {
            self.attach(parent, node, Some(position + offset));
        }
        if !replacements.contains(&target) {
            self.detach(target)?;
        }
        Ok(())
    }

    /// Parent element
    #[inline]
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Child elements
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| n.children.as_slice())
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.tag.as_str())
    }

    /// `id` attribute
    #[must_use]
    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.id.as_deref())
    }

    /// Check class membership
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(node.0)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    /// Add a class (no-op if present)
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn add_class(&mut self, node: NodeId, class: &str) -> ClientResult<()> {
        let node = self.node_mut(node)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Remove a class; returns whether it was present
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> ClientResult<bool> {
        let node = self.node_mut(node)?;
        let before = node.classes.len();
        node.classes.retain(|c| c != class);
        Ok(node.classes.len() != before)
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        self.nodes
            .get(node.0)
            .and_then(|n| n.attrs.get(key))
            .map(String::as_str)
    }

    /// Set attribute
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn set_attr(&mut self, node: NodeId, key: &str, value: impl Into<String>) -> ClientResult<()> {
        self.node_mut(node)?.attrs.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Data value
    #[must_use]
    pub fn data(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.nodes.get(node.0).and_then(|n| n.data.get(key))
    }

    /// Data value rendered as a string (numbers are stringified)
    #[must_use]
    pub fn data_str(&self, node: NodeId, key: &str) -> Option<String> {
        match self.data(node, key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Set data value
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn set_data(&mut self, node: NodeId, key: &str, value: impl Into<Value>) -> ClientResult<()> {
        self.node_mut(node)?.data.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Remove and return a data value
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn remove_data(&mut self, node: NodeId, key: &str) -> ClientResult<Option<Value>> {
        Ok(self.node_mut(node)?.data.remove(key))
    }

    /// Text content
    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.text.as_str())
    }

    /// Set text content
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for unknown `node`
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> ClientResult<()> {
        self.node_mut(node)?.text = text.into();
        Ok(())
    }

    /// Whether `node` is reachable from the root
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.root {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Check `node` against a selector
    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// `node` itself or its nearest ancestor matching `selector`
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = self.nodes.get(node.0).map(|_| node);
        while let Some(n) = current {
            if selector.matches(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Descendants of `scope` matching `selector`, in document order
    #[must_use]
    pub fn find(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                found.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        found
    }

    /// First descendant of `scope` matching `selector`
    #[must_use]
    pub fn find_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.find(scope, selector).into_iter().next()
    }

    /// Attached element with the given `id` attribute
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_first(self.root, &Selector::id(id))
    }

    /// Owned copy of the subtree at `node`
    #[must_use]
    pub fn snapshot(&self, node: NodeId) -> Option<Element> {
        let n = self.nodes.get(node.0)?;
        Some(Element {
            tag: n.tag.clone(),
            id: n.id.clone(),
            classes: n.classes.clone(),
            attrs: n.attrs.clone(),
            data: n.data.clone(),
            text: n.text.clone(),
            children: n.children.iter().filter_map(|&c| self.snapshot(c)).collect(),
        })
    }

    fn attach(&mut self, parent: NodeId, node: NodeId, position: Option<usize>) {
        self.nodes[node.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match position {
            Some(at) if at <= children.len() => children.insert(at, node),
            _ => children.push(node),
        }
    }

    fn node(&self, node: NodeId) -> ClientResult<&Node> {
        self.nodes.get(node.0).ok_or(ClientError::NoSuchNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> ClientResult<&mut Node> {
        self.nodes.get_mut(node.0).ok_or(ClientError::NoSuchNode(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(n) = doc.nodes.get(node.0) else {
            return false;
        };
        self.tag.as_ref().map_or(true, |t| *t == n.tag)
            && self.id.as_ref().map_or(true, |id| n.id.as_ref() == Some(id))
            && self.classes.iter().all(|c| n.classes.contains(c))
    }

    fn parse(token: &str) -> Option<Self> {
        let mut compound = Self::default();
        let mut rest = token;

        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        if tag_end > 0 {
            compound.tag = Some(rest[..tag_end].to_string());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '#' => compound.id = Some(name.to_string()),
                _ => compound.classes.push(name.to_string()),
            }
            rest = &body[end..];
        }
        Some(compound)
    }
}

/// Parsed css-like selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// Parse a selector
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidSelector`] for empty or malformed input
    pub fn parse(source: &str) -> ClientResult<Self> {
        let invalid = || ClientError::InvalidSelector(source.to_string());
        let spaced = source.replace('>', " > ");
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;
        let mut pending_child = false;

        for token in spaced.split_whitespace() {
            if token == ">" {
                if steps.is_empty() || pending_child {
                    return Err(invalid());
                }
                combinator = Combinator::Child;
                pending_child = true;
                continue;
            }
            let compound = Compound::parse(token).ok_or_else(invalid)?;
            steps.push((combinator, compound));
            combinator = Combinator::Descendant;
            pending_child = false;
        }

        if steps.is_empty() || pending_child {
            return Err(invalid());
        }
        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    /// Selector matching an element id verbatim
    #[must_use]
    pub fn id(id: &str) -> Self {
        Self {
            source: format!("#{id}"),
            steps: vec![(
                Combinator::Descendant,
                Compound {
                    id: Some(id.to_string()),
                    ..Compound::default()
                },
            )],
        }
    }

    /// Selector matching one class verbatim
    #[must_use]
    pub fn class(class: &str) -> Self {
        Self {
            source: format!(".{class}"),
            steps: vec![(
                Combinator::Descendant,
                Compound {
                    classes: vec![class.to_string()],
                    ..Compound::default()
                },
            )],
        }
    }

    /// Selector matching a tag name
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            source: tag.to_string(),
            steps: vec![(
                Combinator::Descendant,
                Compound {
                    tag: Some(tag.to_string()),
                    ..Compound::default()
                },
            )],
        }
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_step(doc, node, self.steps.len() - 1)
    }

    fn matches_step(&self, doc: &Document, node: NodeId, step: usize) -> bool {
        let (combinator, compound) = &self.steps[step];
        if !compound.matches(doc, node) {
            return false;
        }
        if step == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches_step(doc, p, step - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_step(doc, ancestor, step - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

impl FromStr for Selector {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn board() -> Document {
        Document::from_element(
            Element::new("div").with_class("flow-board").with_child(
                Element::new("div")
                    .with_id("flow-topic-T1")
                    .with_class("flow-topic")
                    .with_child(Element::new("div").with_class("flow-topic-titlebar").with_text("Title"))
                    .with_child(
                        Element::new("div")
                            .with_id("flow-post-P1")
                            .with_class("flow-post")
                            .with_child(Element::new("div").with_class("flow-post-main").with_text("Body"))
                            .with_child(
                                Element::new("form").with_child(Element::new("textarea").with_attr("name", "content")),
                            ),
                    ),
            ),
        )
    }

    #[test]
    fn selector_parsing() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("> .a").is_err());
        assert!(Selector::parse(".a >").is_err());
        assert!(Selector::parse(".a > > .b").is_err());
        assert!(Selector::parse(".").is_err());
        assert_eq!(sel("div.a.b#c").to_string(), "div.a.b#c");
    }

    #[test]
    fn find_with_child_combinator() {
        let doc = board();
        let mains = doc.find(doc.root(), &sel("#flow-post-P1 > .flow-post-main"));
        assert_eq!(mains.len(), 1);
        assert_eq!(doc.text(mains[0]), Some("Body"));
        assert!(doc.find(doc.root(), &sel("#flow-topic-T1 > .flow-post-main")).is_empty());
        assert_eq!(doc.find(doc.root(), &sel("#flow-topic-T1 .flow-post-main")).len(), 1);
    }

    #[test]
    fn closest_includes_self() {
        let doc = board();
        let textarea = doc.find_first(doc.root(), &sel("textarea")).unwrap();
        let form = doc.closest(textarea, &sel("form")).unwrap();
        assert_eq!(doc.tag(form), Some("form"));
        assert_eq!(doc.closest(form, &sel("form")), Some(form));
        let topic = doc.closest(textarea, &sel(".flow-topic")).unwrap();
        assert_eq!(doc.element_id(topic), Some("flow-topic-T1"));
    }

    #[test]
    fn replace_keeps_position_and_detaches_target() {
        let mut doc = board();
        let topic = doc.get_by_id("flow-topic-T1").unwrap();
        let titlebar = doc.find_first(topic, &sel(".flow-topic-titlebar")).unwrap();
        let replacement = doc.build(Element::new("div").with_class("flow-topic-titlebar").with_text("New"));

        doc.replace_with(titlebar, &[replacement]).unwrap();

        assert_eq!(doc.children(topic)[0], replacement);
        assert!(!doc.is_attached(titlebar));
        assert!(doc.is_attached(replacement));
        assert_eq!(doc.text(titlebar), Some("Title"));
    }

    #[test]
    fn replacing_detached_target_is_noop() {
        let mut doc = board();
        let loose = doc.build(Element::new("div"));
        let other = doc.build(Element::new("span"));
        doc.replace_with(loose, &[other]).unwrap();
        assert!(!doc.is_attached(other));
    }

    #[test]
    fn classes_and_data() {
        let mut doc = board();
        let form = doc.find_first(doc.root(), &sel("form")).unwrap();
        doc.add_class(form, "flow-api-inprogress").unwrap();
        doc.add_class(form, "flow-api-inprogress").unwrap();
        assert!(doc.remove_class(form, "flow-api-inprogress").unwrap());
        assert!(!doc.remove_class(form, "flow-api-inprogress").unwrap());

        doc.set_data(form, "flow-prev-revision", "R1").unwrap();
        assert_eq!(doc.data_str(form, "flow-prev-revision").as_deref(), Some("R1"));
        assert_eq!(doc.remove_data(form, "flow-prev-revision").unwrap(), Some(Value::from("R1")));
        assert_eq!(doc.data_str(form, "flow-prev-revision"), None);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let mut doc = Document::new();
        let bogus = NodeId(99);
        assert!(matches!(doc.add_class(bogus, "x"), Err(ClientError::NoSuchNode(_))));
        assert!(doc.children(bogus).is_empty());
        assert!(!doc.has_class(bogus, "x"));
    }

    #[test]
    fn snapshot_round_trips_structure() {
        let doc = board();
        let snap = doc.snapshot(doc.root()).unwrap();
        assert_eq!(snap.children[0].id.as_deref(), Some("flow-topic-T1"));
        assert_eq!(snap.children[0].children.len(), 2);
    }
}
