//! Client mutation dispatcher
//!
//! Before a query is sent, it runs through the global pre-handlers in
//! registration order and then through the pre-handler registered for the
//! action, if any. Each pre-handler takes the query so far and returns the
//! query to continue with; it may extend it or replace it entirely.

use crate::api::QueryMap;
use crate::dom::{Document, NodeId, Selector};
use crate::editors::EditorRegistry;
use crate::error::ApiFailure;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Data key holding a form's pending revision marker
pub const PREV_REVISION_KEY: &str = "flow-prev-revision";

/// What pre-handlers see
pub struct PreHandlerContext<'a> {
    /// Board document
    pub document: &'a mut Document,
    /// Element that triggered the submission
    pub element: NodeId,
    /// Editing surfaces
    pub editors: &'a EditorRegistry,
}

/// Query transform run before submission
pub type PreHandler = Arc<dyn Fn(&mut PreHandlerContext<'_>, QueryMap) -> QueryMap + Send + Sync>;

/// A user action to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Handler name (`activateEditTitle`, `moderatePost`, ...)
    pub action: String,
    /// Element the user interacted with
    pub element: NodeId,
    /// Element the request is about; defaults to `element`
    pub target: NodeId,
    /// Query before pre-handlers
    pub query: QueryMap,
}

impl Submission {
    /// Create submission targeting the triggering element
    #[must_use]
    pub fn new(action: impl Into<String>, element: NodeId, query: QueryMap) -> Self {
        Self {
            action: action.into(),
            element,
            target: element,
            query,
        }
    }

    /// With a distinct target element
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = target;
        self
    }
}

/// Pre-handler chain
#[derive(Default, Clone)]
pub struct MutationDispatcher {
    global: Vec<(String, PreHandler)>,
    actions: HashMap<String, PreHandler>,
}

impl std::fmt::Debug for MutationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationDispatcher")
            .field("global", &self.global.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MutationDispatcher {
    /// Create dispatcher without pre-handlers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with the board's pre-handlers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.add_global("prepareEditor", prepare_editor);
        dispatcher.add_global("prepareEditConflict", prepare_edit_conflict);
        dispatcher.on_action("activateEditTitle", activate_edit_title);
        dispatcher.on_action("watchItem", watch_item);
        dispatcher
    }

    /// Append a global pre-handler
    pub fn add_global<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut PreHandlerContext<'_>, QueryMap) -> QueryMap + Send + Sync + 'static,
    {
        self.global.push((name.into(), Arc::new(handler)));
    }

    /// Set the pre-handler of an action
    pub fn on_action<F>(&mut self, action: impl Into<String>, handler: F)
    where
        F: Fn(&mut PreHandlerContext<'_>, QueryMap) -> QueryMap + Send + Sync + 'static,
    {
        self.actions.insert(action.into(), Arc::new(handler));
    }

    /// Run the chain for `action`
    pub fn prepare(&self, ctx: &mut PreHandlerContext<'_>, action: &str, query: QueryMap) -> QueryMap {
        let mut query = query;
        for (name, handler) in &self.global {
            query = handler(ctx, query);
            debug!(handler = %name, action, "applied global pre-handler");
        }
        if let Some(handler) = self.actions.get(action) {
            query = handler(ctx, query);
            debug!(action, "applied action pre-handler");
        }
        query
    }

    /// Remember the server's revision after an edit conflict
    ///
    /// The marker is stored on the form enclosing `element` and consumed by
    /// the next submission of that form.
    pub fn record_failure(document: &mut Document, element: NodeId, failure: &ApiFailure) {
        let Some(revision) = failure.conflict_revision() else {
            return;
        };
        let Some(form) = document.closest(element, &Selector::tag("form")) else {
            return;
        };
        if document.set_data(form, PREV_REVISION_KEY, revision).is_ok() {
            info!(%form, revision, "stored edit conflict revision");
        }
    }
}

/// Take submitted content from the editing surface backing each textarea
pub fn prepare_editor(ctx: &mut PreHandlerContext<'_>, query: QueryMap) -> QueryMap {
    let Some(form) = ctx.document.closest(ctx.element, &Selector::tag("form")) else {
        return query;
    };
    let mut overrides = QueryMap::new();
    for field in ctx.document.find(form, &Selector::tag("textarea")) {
        let (Some(name), Some(surface)) = (ctx.document.attr(field, "name"), ctx.editors.surface_for(field))
        else {
            continue;
        };
        overrides.set(name, surface.raw_content(ctx.document, field));
        overrides.set("flow_format", surface.format());
    }
    query.merged(overrides)
}

/// Bind a retry after an edit conflict to the revision the server reported
pub fn prepare_edit_conflict(ctx: &mut PreHandlerContext<'_>, query: QueryMap) -> QueryMap {
    let Some(form) = ctx.document.closest(ctx.element, &Selector::tag("form")) else {
        return query;
    };
    let Some(revision) = ctx.document.data_str(form, PREV_REVISION_KEY) else {
        return query;
    };
    if let Err(err) = ctx.document.remove_data(form, PREV_REVISION_KEY) {
        tracing::warn!(error = %err, "could not clear edit conflict marker");
    }
    query.with("flow_prev_revision", revision)
}

/// Fetch only the title post of the topic through `view-post`
pub fn activate_edit_title(ctx: &mut PreHandlerContext<'_>, query: QueryMap) -> QueryMap {
    let post_id = ctx
        .document
        .closest(ctx.element, &Selector::class("flow-topic"))
        .and_then(|topic| ctx.document.data_str(topic, "flow-id"));
    let mut query = query
        .with("submodule", "view-post")
        .with("vpformat", ctx.editors.default_format());
    if let Some(post_id) = post_id {
        query.set("vppostId", post_id);
    }
    query
}

/// Use the global watch action with a watch token
pub fn watch_item(_ctx: &mut PreHandlerContext<'_>, query: QueryMap) -> QueryMap {
    let mut params = QueryMap::new()
        .with("action", "watch")
        .with("titles", query.get("page").unwrap_or_default())
        .with_token_type("watch");
    if query.submodule() == Some("unwatch") {
        params.set("unwatch", "1");
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn topic_doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let topic = doc
            .append(
                doc.root(),
                Element::new("div").with_class("flow-topic").with_data("flow-id", "T1"),
            )
            .unwrap();
        let form = doc.append(topic, Element::new("form")).unwrap();
        doc.append(
            form,
            Element::new("textarea")
                .with_attr("name", "topic_content")
                .with_attr("value", "new text"),
        )
        .unwrap();
        let button = doc.append(form, Element::new("button")).unwrap();
        (doc, form, button)
    }

    #[test]
    fn editor_content_and_format_are_injected() {
        let (mut doc, _, button) = topic_doc();
        let editors = EditorRegistry::new();
        let mut ctx = PreHandlerContext {
            document: &mut doc,
            element: button,
            editors: &editors,
        };
        let query = prepare_editor(&mut ctx, QueryMap::flow("edit-post", "Topic:T1").with("topic_content", "stale"));
        assert_eq!(query.get("topic_content"), Some("new text"));
        assert_eq!(query.get("flow_format"), Some("wikitext"));
    }

    #[test]
    fn conflict_marker_is_consumed_once() {
        let (mut doc, form, button) = topic_doc();
        let failure = ApiFailure::new(
            "prev_revision",
            json!({"error": {"prev_revision": {"extra": {"revision_id": "R1"}}}}),
        );
        MutationDispatcher::record_failure(&mut doc, button, &failure);
        assert_eq!(doc.data_str(form, PREV_REVISION_KEY).as_deref(), Some("R1"));

        let editors = EditorRegistry::new();
        let dispatcher = MutationDispatcher::with_defaults();
        let mut ctx = PreHandlerContext {
            document: &mut doc,
            element: button,
            editors: &editors,
        };
        let first = dispatcher
            .prepare(&mut ctx, "editPost", QueryMap::flow("edit-post", "Topic:T1"))
            .into_wire();
        assert_eq!(first.get("epprev_revision"), Some("R1"));

        let second = dispatcher.prepare(&mut ctx, "editPost", QueryMap::flow("edit-post", "Topic:T1"));
        assert!(!second.contains("flow_prev_revision"));
    }

    #[test]
    fn activate_edit_title_redirects_to_view_post() {
        let (mut doc, _, button) = topic_doc();
        let editors = EditorRegistry::new();
        let mut ctx = PreHandlerContext {
            document: &mut doc,
            element: button,
            editors: &editors,
        };
        let query = activate_edit_title(&mut ctx, QueryMap::flow("view-topic", "Topic:T1"));
        assert_eq!(query.submodule(), Some("view-post"));
        assert_eq!(query.get("vppostId"), Some("T1"));
        assert_eq!(query.get("vpformat"), Some("wikitext"));
    }

    #[test]
    fn watch_item_replaces_query() {
        let (mut doc, _, button) = topic_doc();
        let editors = EditorRegistry::new();
        let mut ctx = PreHandlerContext {
            document: &mut doc,
            element: button,
            editors: &editors,
        };
        let watch = watch_item(&mut ctx, QueryMap::flow("watch", "Topic:T1").with("extra", "x"));
        assert_eq!(watch.action(), Some("watch"));
        assert_eq!(watch.get("titles"), Some("Topic:T1"));
        assert_eq!(watch.token_type(), "watch");
        assert!(!watch.contains("unwatch"));
        assert!(!watch.contains("extra"));

        let unwatch = watch_item(&mut ctx, QueryMap::flow("unwatch", "Topic:T1"));
        assert_eq!(unwatch.get("unwatch"), Some("1"));
    }

    #[test]
    fn globals_run_before_action_handler() {
        let (mut doc, _, button) = topic_doc();
        let editors = EditorRegistry::new();
        let mut dispatcher = MutationDispatcher::new();
        dispatcher.add_global("a", |_, q| {
            let seen = q.get("order").unwrap_or_default().to_string();
            q.with("order", format!("{seen}a"))
        });
        dispatcher.on_action("act", |_, q| {
            let seen = q.get("order").unwrap_or_default().to_string();
            q.with("order", format!("{seen}b"))
        });
        let mut ctx = PreHandlerContext {
            document: &mut doc,
            element: button,
            editors: &editors,
        };
        assert_eq!(dispatcher.prepare(&mut ctx, "act", QueryMap::new()).get("order"), Some("ab"));
        assert_eq!(dispatcher.prepare(&mut ctx, "other", QueryMap::new()).get("order"), Some("a"));
    }
}
