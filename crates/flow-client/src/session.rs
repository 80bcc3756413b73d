//! Board session
//!
//! A [`BoardSession`] owns everything one rendered board needs: the
//! document, the mirror model, the notification bus, the pre-handler chain
//! and the result handlers registered by action name. Handlers live exactly
//! as long as the session that registered them.
//!
//! Locks on the document and the mirror are never held across an `.await`.

use crate::api::{ApiResponse, QueryMap, RemoteApi};
use crate::config::ClientConfig;
use crate::dispatcher::{MutationDispatcher, PreHandlerContext, Submission};
use crate::dom::{Document, Element, NodeId, Selector};
use crate::editors::EditorRegistry;
use crate::error::{ApiFailure, ClientError, ClientResult, HTTP_FAILURE_CODE};
use crate::events::{ClientEvent, EventBus};
use crate::handlers::{self, ApiHandler, HandlerInfo};
use crate::mirror::{MirrorModel, TopicTree};
use crate::progress::InProgressTracker;
use crate::templates::TemplateEngine;
use flow_actions::MessageParam;
use flow_formatter::{MessageCatalog, StaticCatalog};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Class of inline error boxes
pub const ERROR_CLASS: &str = "flow-errors";

/// Runs when a form is cancelled
pub type CancelCallback = Box<dyn FnOnce(&mut Document) + Send>;

/// One rendered board and its client state
pub struct BoardSession {
    config: ClientConfig,
    document: Arc<Mutex<Document>>,
    mirror: Mutex<MirrorModel>,
    events: EventBus,
    api: Arc<dyn RemoteApi>,
    templates: Arc<dyn TemplateEngine>,
    catalog: Arc<dyn MessageCatalog>,
    editors: EditorRegistry,
    progress: Arc<InProgressTracker>,
    dispatcher: MutationDispatcher,
    handlers: HashMap<String, Arc<dyn ApiHandler>>,
    topic_titles: Arc<Mutex<BTreeMap<String, String>>>,
    cancel_callbacks: Mutex<HashMap<NodeId, Vec<CancelCallback>>>,
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BoardSession`]
pub struct BoardSessionBuilder {
    config: ClientConfig,
    api: Arc<dyn RemoteApi>,
    templates: Arc<dyn TemplateEngine>,
    document: Document,
    catalog: Arc<dyn MessageCatalog>,
    editors: EditorRegistry,
    dispatcher: MutationDispatcher,
    handlers: HashMap<String, Arc<dyn ApiHandler>>,
}

impl BoardSessionBuilder {
    /// With an existing document
    #[must_use]
    pub fn document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }

    /// With message catalog
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// With editor registry
    #[must_use]
    pub fn editors(mut self, editors: EditorRegistry) -> Self {
        self.editors = editors;
        self
    }

    /// With pre-handler chain
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: MutationDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Register or replace the result handler of `action`
    #[must_use]
    pub fn handler(mut self, action: impl Into<String>, handler: Arc<dyn ApiHandler>) -> Self {
        self.handlers.insert(action.into(), handler);
        self
    }

    /// Build the session
    #[must_use]
    pub fn build(self) -> BoardSession {
        let topic_titles = Arc::new(Mutex::new(BTreeMap::new()));
        let events = EventBus::new();

        let titles = Arc::clone(&topic_titles);
        events.on("populate", move |event| {
            if let ClientEvent::Populate { topic_titles_by_id } = event {
                titles.lock().extend(topic_titles_by_id.clone());
            }
        });

        let progress = Arc::new(InProgressTracker::new(self.config.in_progress_class.clone()));
        BoardSession {
            config: self.config,
            document: Arc::new(Mutex::new(self.document)),
            mirror: Mutex::new(MirrorModel::new()),
            events,
            api: self.api,
            templates: self.templates,
            catalog: self.catalog,
            editors: self.editors,
            progress,
            dispatcher: self.dispatcher,
            handlers: self.handlers,
            topic_titles,
            cancel_callbacks: Mutex::new(HashMap::new()),
        }
    }
}

impl BoardSession {
    /// Start building a session with the default pre-handlers and result handlers
    #[must_use]
    pub fn builder(
        config: ClientConfig,
        api: Arc<dyn RemoteApi>,
        templates: Arc<dyn TemplateEngine>,
    ) -> BoardSessionBuilder {
        BoardSessionBuilder {
            config,
            api,
            templates,
            document: Document::new(),
            catalog: Arc::new(StaticCatalog::english()),
            editors: EditorRegistry::new(),
            dispatcher: MutationDispatcher::with_defaults(),
            handlers: handlers::defaults()
                .into_iter()
                .map(|(name, handler)| (name.to_string(), handler))
                .collect(),
        }
    }

    /// Submit a user action
    ///
    /// Marks the target in progress, runs the pre-handler chain, issues the
    /// call and hands the outcome to the action's result handler. The
    /// marker is cleared once, after the handler finished, whatever the
    /// outcome.
    ///
    /// # Errors
    /// - [`ClientError::InProgress`] if the target already has a request in
    ///   flight; nothing is sent
    /// - [`ClientError::Api`] if the call failed
    /// - any error of the result handler
    pub async fn submit(&self, submission: Submission) -> ClientResult<Value> {
        let Submission {
            action,
            element,
            target,
            query,
        } = submission;
        let guard = self.progress.begin(&self.document, target)?;

        let query = {
            let mut document = self.document.lock();
            let mut ctx = PreHandlerContext {
                document: &mut document,
                element,
                editors: &self.editors,
            };
            self.dispatcher.prepare(&mut ctx, &action, query)
        };
        let query = query.into_wire();
        debug!(action = %action, submodule = ?query.submodule(), params = query.len(), "submitting");

        let outcome = self.api.call(query).await;
        if let Err(failure) = &outcome {
            error!(action = %action, code = %failure.code, "submission failed");
            let message = self.api_error_message(failure);
            let mut document = self.document.lock();
            MutationDispatcher::record_failure(&mut document, element, failure);
            let container = document
                .closest(element, &Selector::tag("form"))
                .unwrap_or(target);
            remove_error(&mut document, container);
            show_error(&mut document, container, &message)?;
        }

        let info = HandlerInfo {
            action,
            element,
            target,
        };
        let handled = match self.handlers.get(&info.action) {
            Some(handler) => handler.handle(self, &info, &outcome).await,
            None => Ok(()),
        };
        drop(guard);

        handled?;
        outcome.map_err(ClientError::from)
    }

    /// Populate the mirror and announce the topic titles
    ///
    /// Uses the data embedded in the page when it carries blocks and a
    /// table of contents, else fetches the topic list and header.
    ///
    /// # Errors
    /// Returns error if the topic list cannot be fetched or parsed
    pub async fn initialize(&self, embedded: Option<&Value>) -> ClientResult<BTreeMap<String, String>> {
        let embedded = embedded.filter(|data| data.get("blocks").is_some() && data.get("toc").is_some());
        let titles = match embedded {
            Some(data) => {
                let mut mirror = self.mirror.lock();
                if let Some(list) = data.pointer("/blocks/topiclist") {
                    mirror.populate_topics(&TopicTree::from_value(list)?);
                }
                if let Some(header) = data.pointer("/blocks/header") {
                    mirror.populate_description(header)?;
                }
                if let Some(toc) = data.get("toc") {
                    mirror.populate_topics(&TopicTree::from_value(toc)?);
                }
                mirror.titles().clone()
            }
            None => self.fetch_board().await?,
        };

        info!(page = %self.config.page, topics = titles.len(), "board populated");
        self.events.emit(&ClientEvent::Populate {
            topic_titles_by_id: titles.clone(),
        });
        Ok(titles)
    }

    async fn fetch_board(&self) -> ClientResult<BTreeMap<String, String>> {
        let body = self
            .api
            .call(QueryMap::flow("view-topiclist", &self.config.page).into_wire())
            .await?;
        let list = ApiResponse(&body)
            .result("view-topiclist")
            .and_then(|result| result.get("topiclist"))
            .ok_or_else(|| ClientError::MalformedResponse("flow.view-topiclist.result.topiclist".into()))?;
        let list = TopicTree::from_value(list)?;

        let header = match self
            .api
            .call(QueryMap::flow("view-header", &self.config.page).into_wire())
            .await
        {
            Ok(body) => ApiResponse(&body)
                .result("view-header")
                .and_then(|result| result.get("header"))
                .cloned(),
            Err(failure) => {
                warn!(code = %failure.code, "board description unavailable");
                None
            }
        };

        let mut mirror = self.mirror.lock();
        mirror.populate_topics(&list);
        if let Some(header) = header {
            mirror.populate_description(&header)?;
        }
        Ok(mirror.titles().clone())
    }

    /// Register a callback run when `form` is cancelled
    pub fn on_form_cancel<F>(&self, form: NodeId, callback: F)
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        self.cancel_callbacks
            .lock()
            .entry(form)
            .or_default()
            .push(Box::new(callback));
    }

    /// Close a form
    ///
    /// Runs the registered cancel callbacks; a form without callbacks is
    /// simply detached.
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] for an unknown form
    pub fn cancel_form(&self, form: NodeId) -> ClientResult<()> {
        let callbacks = self.cancel_callbacks.lock().remove(&form).unwrap_or_default();
        {
            let mut document = self.document.lock();
            if callbacks.is_empty() {
                document.detach(form)?;
            } else {
                for callback in callbacks {
                    callback(&mut document);
                }
            }
        }
        self.events.emit(&ClientEvent::FormCancelled { form });
        Ok(())
    }

    /// User-facing text for a failed call
    #[must_use]
    pub fn api_error_message(&self, failure: &ApiFailure) -> String {
        if let Some(info) = failure.info() {
            return info.to_string();
        }
        if failure.code == HTTP_FAILURE_CODE {
            return self.catalog.text("flow-error-http", &[]);
        }
        self.catalog
            .text("flow-error-external", &[MessageParam::text(failure.code.clone())])
    }

    /// Render `template` and build its fragment as detached nodes
    ///
    /// # Errors
    /// Returns error if the template fails
    pub fn render_fragment(&self, template: &str, data: &Value) -> ClientResult<Vec<NodeId>> {
        let wrapper = self.templates.render(template, data)?;
        let mut document = self.document.lock();
        Ok(build_fragment(&mut document, wrapper))
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.document
    }

    /// Lock the mirror model; do not hold across an `.await`
    #[inline]
    pub fn mirror(&self) -> MutexGuard<'_, MirrorModel> {
        self.mirror.lock()
    }

    /// Notification bus
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Remote API
    #[inline]
    #[must_use]
    pub fn api(&self) -> &Arc<dyn RemoteApi> {
        &self.api
    }

    /// Template engine
    #[inline]
    #[must_use]
    pub fn templates(&self) -> &Arc<dyn TemplateEngine> {
        &self.templates
    }

    /// Message catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn MessageCatalog> {
        &self.catalog
    }

    /// Editing surfaces
    #[inline]
    #[must_use]
    pub fn editors(&self) -> &EditorRegistry {
        &self.editors
    }

    /// In-progress tracker
    #[inline]
    #[must_use]
    pub fn progress(&self) -> &Arc<InProgressTracker> {
        &self.progress
    }

    /// Topic titles announced through `populate`
    #[must_use]
    pub fn topic_titles(&self) -> BTreeMap<String, String> {
        self.topic_titles.lock().clone()
    }
}

/// Build the children of a rendered wrapper as detached nodes
pub fn build_fragment(document: &mut Document, wrapper: Element) -> Vec<NodeId> {
    wrapper
        .children
        .into_iter()
        .map(|child| document.build(child))
        .collect()
}

/// Show `message` at the top of `container`
///
/// # Errors
/// Returns [`ClientError::NoSuchNode`] for an unknown container
pub fn show_error(document: &mut Document, container: NodeId, message: &str) -> ClientResult<NodeId> {
    document.prepend(
        container,
        Element::new("div")
            .with_class(ERROR_CLASS)
            .with_class("errorbox")
            .with_text(message),
    )
}

/// Remove error boxes inside `container`
pub fn remove_error(document: &mut Document, container: NodeId) {
    for node in document.find(container, &Selector::class(ERROR_CLASS)) {
        if let Err(err) = document.detach(node) {
            warn!(%node, error = %err, "could not remove error box");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateRegistry;
    use async_trait::async_trait;
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    mock! {
        Api {}

        #[async_trait]
        impl RemoteApi for Api {
            async fn call(&self, query: QueryMap) -> Result<Value, ApiFailure>;
        }
    }

    fn session(api: MockApi) -> BoardSession {
        BoardSession::builder(
            ClientConfig::new("Talk:Board"),
            Arc::new(api),
            Arc::new(TemplateRegistry::new()),
        )
        .build()
    }

    #[test]
    fn error_messages_prefer_info() {
        let board = session(MockApi::new());
        let with_info = ApiFailure::new("badtoken", json!({"error": {"info": "Bad token"}}));
        assert_eq!(board.api_error_message(&with_info), "Bad token");
        assert_eq!(
            board.api_error_message(&ApiFailure::http()),
            "An error occurred while contacting the server."
        );
        assert_eq!(
            board.api_error_message(&ApiFailure::new("readonly", Value::Null)),
            "An error occurred.<br />The error message received was: readonly"
        );
    }

    #[tokio::test]
    async fn initialize_from_embedded_data_skips_api() {
        let mut api = MockApi::new();
        api.expect_call().never();
        let board = session(api);

        let data = json!({
            "blocks": {
                "topiclist": {
                    "roots": ["T1"],
                    "posts": {"T1": ["R1"]},
                    "revisions": {"R1": {"revisionId": "R1", "content": {"content": "Hello"}}}
                },
                "header": {"revision": {"revisionId": "H1", "content": {"content": "About"}}}
            },
            "toc": {
                "roots": ["T2"],
                "posts": {"T2": ["R2"]},
                "revisions": {"R2": {"revisionId": "R2", "content": {"content": "Older"}}}
            }
        });
        let titles = board.initialize(Some(&data)).await.unwrap();

        assert_eq!(titles.len(), 2);
        assert_eq!(board.topic_titles(), titles);
        assert_eq!(board.events().count("populate"), 1);
        assert!(board.mirror().description().is_some());
    }

    #[tokio::test]
    async fn initialize_fetches_topic_list_without_embedded_data() {
        let mut api = MockApi::new();
        api.expect_call()
            .withf(|q| q.submodule() == Some("view-topiclist") && q.get("page") == Some("Talk:Board"))
            .times(1)
            .returning(|_| {
                Ok(json!({"flow": {"view-topiclist": {"result": {"topiclist": {
                    "roots": ["T1"],
                    "posts": {"T1": ["R1"]},
                    "revisions": {"R1": {"revisionId": "R1", "content": {"content": "Fetched"}}}
                }}}}}))
            });
        api.expect_call()
            .withf(|q| q.submodule() == Some("view-header"))
            .times(1)
            .returning(|_| Err(ApiFailure::http()));
        let board = session(api);

        let titles = board.initialize(Some(&json!({"blocks": {}}))).await.unwrap();
        assert_eq!(titles.get("T1").map(String::as_str), Some("Fetched"));
        assert!(board.mirror().description().is_none());
    }

    #[test]
    fn cancel_form_runs_callbacks_or_detaches() {
        let board = session(MockApi::new());
        let (plain, with_callback) = {
            let mut doc = board.document().lock();
            let root = doc.root();
            (
                doc.append(root, Element::new("form")).unwrap(),
                doc.append(root, Element::new("form").with_class("edit")).unwrap(),
            )
        };
        board.on_form_cancel(with_callback, move |doc| {
            doc.remove_class(with_callback, "edit").unwrap();
        });

        board.cancel_form(plain).unwrap();
        board.cancel_form(with_callback).unwrap();

        let doc = board.document().lock();
        assert!(!doc.is_attached(plain));
        assert!(doc.is_attached(with_callback));
        assert!(!doc.has_class(with_callback, "edit"));
        assert_eq!(board.events().count("cancelForm"), 2);
    }

    #[test]
    fn errors_replace_previous_errors() {
        let mut doc = Document::new();
        let root = doc.root();
        show_error(&mut doc, root, "first").unwrap();
        remove_error(&mut doc, root);
        show_error(&mut doc, root, "second").unwrap();

        let boxes = doc.find(root, &Selector::class(ERROR_CLASS));
        assert_eq!(boxes.len(), 1);
        assert_eq!(doc.text(boxes[0]), Some("second"));
    }
}
