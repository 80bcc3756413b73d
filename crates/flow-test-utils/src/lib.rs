//! Testing utilities for the Flow workspace
//!
//! Shared fakes, fixtures, and board templates.

#![allow(missing_docs)]

use async_trait::async_trait;
use flow_client::{
    ApiFailure, ClientError, ClientResult, Document, Element, QueryMap, RemoteApi, Selector,
    TemplateEngine, TemplateNames, TemplateRegistry, TopicTree,
};
use flow_formatter::{MemoryStorage, Storage, StorageError};
use flow_model::{EntityId, EntityKind, Revision, RevisionKind, StoredEntity, UserRef, Workflow};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Memory storage that records every multi-get
#[derive(Debug, Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    calls: Mutex<Vec<(EntityKind, Vec<EntityId>)>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: impl IntoIterator<Item = StoredEntity>) -> Self {
        Self {
            inner: entities.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, entity: impl Into<StoredEntity>) {
        self.inner.insert(entity);
    }

    pub fn calls(&self) -> Vec<(EntityKind, Vec<EntityId>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, kind: EntityKind) -> usize {
        self.calls.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get_multi(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<StoredEntity>, StorageError> {
        self.calls.lock().push((kind, ids.to_vec()));
        self.inner.get_multi(kind, ids).await
    }
}

// ---------------------------------------------------------------------------
// Entity fixtures
// ---------------------------------------------------------------------------

pub fn test_user() -> UserRef {
    UserRef::new(7, "Tester")
}

pub fn post_revision(workflow: &Workflow, change_type: &str, content: &str) -> Revision {
    Revision::builder(RevisionKind::Post, workflow.id())
        .change_type(change_type)
        .content(content)
        .user(test_user())
        .build()
}

/// A topic with a title revision and `replies` reply revisions
pub fn topic_with_replies(replies: usize) -> (Workflow, Vec<Revision>) {
    let workflow = Workflow::topic(EntityId::new());
    let mut revisions = vec![post_revision(&workflow, "new-post", "Topic title")];
    for n in 0..replies {
        let post = EntityId::new();
        revisions.push(
            Revision::builder(RevisionKind::Post, post)
                .change_type("reply")
                .content(format!("reply {n}"))
                .user(test_user())
                .build(),
        );
    }
    (workflow, revisions)
}

// ---------------------------------------------------------------------------
// Remote API
// ---------------------------------------------------------------------------

type Reply = Result<Value, ApiFailure>;

/// Remote API answering from per-call scripts
///
/// Calls are keyed by submodule for `action=flow`, else by action.
/// Unscripted calls fail with an `http` failure.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    sent: Mutex<Vec<QueryMap>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for calls with `key`
    pub fn reply(&self, key: &str, reply: Reply) -> &Self {
        self.scripts
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Hold calls with `key` until the returned gate is notified
    pub fn hold(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(key.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn sent(&self) -> Vec<QueryMap> {
        self.sent.lock().clone()
    }

    pub fn sent_for(&self, key: &str) -> Vec<QueryMap> {
        self.sent
            .lock()
            .iter()
            .filter(|q| call_key(q) == key)
            .cloned()
            .collect()
    }
}

fn call_key(query: &QueryMap) -> String {
    match (query.action(), query.submodule()) {
        (Some("flow"), Some(submodule)) => submodule.to_string(),
        (Some(action), _) => action.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn call(&self, query: QueryMap) -> Result<Value, ApiFailure> {
        let key = call_key(&query);
        self.sent.lock().push(query);

        let gate = self.gates.lock().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.scripts
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ApiFailure::http()))
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

/// A reply post of a topic fixture
#[derive(Debug, Clone)]
pub struct PostFixture {
    pub post_id: String,
    pub revision_id: String,
    pub content: String,
    pub moderated: bool,
}

impl PostFixture {
    pub fn new(post_id: &str, revision_id: &str, content: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            revision_id: revision_id.to_string(),
            content: content.to_string(),
            moderated: false,
        }
    }

    pub fn moderated(mut self) -> Self {
        self.moderated = true;
        self
    }
}

/// Topic in the API's normalized shape
pub fn topic_json(topic_id: &str, title_revision: &str, title: &str, posts: &[PostFixture]) -> Value {
    let mut post_map = serde_json::Map::new();
    let mut revisions = serde_json::Map::new();
    post_map.insert(topic_id.to_string(), json!([title_revision]));
    revisions.insert(
        title_revision.to_string(),
        json!({
            "revisionId": title_revision,
            "postId": topic_id,
            "content": {"content": title, "format": "wikitext"},
            "isModerated": false,
            "replies": posts.iter().map(|p| p.post_id.clone()).collect::<Vec<_>>(),
        }),
    );
    for post in posts {
        post_map.insert(post.post_id.clone(), json!([post.revision_id]));
        let mut revision = json!({
            "revisionId": post.revision_id,
            "postId": post.post_id,
            "content": {"content": post.content, "format": "html"},
            "isModerated": post.moderated,
            "replies": [],
        });
        if post.moderated {
            revision["moderateState"] = json!("hide");
        }
        revisions.insert(post.revision_id.clone(), revision);
    }
    json!({"roots": [topic_id], "posts": post_map, "revisions": revisions})
}

pub fn view_topic_response(topic: &Value) -> Value {
    json!({"flow": {"view-topic": {"result": {"topic": topic}}}})
}

pub fn view_post_response(topic: &Value) -> Value {
    json!({"flow": {"view-post": {"result": {"topic": topic}}}})
}

pub fn moderation_response(submodule: &str, workflow: &str, revision_id: &str) -> Value {
    json!({"flow": {submodule: {
        "workflow": workflow,
        "committed": {"topic": {"post-revision-id": revision_id}},
    }}})
}

pub fn edit_conflict(revision_id: &str) -> ApiFailure {
    ApiFailure::new(
        "prev_revision",
        json!({"error": {
            "code": "prev_revision",
            "info": "The topic was changed by someone else",
            "prev_revision": {"extra": {"revision_id": revision_id}},
        }}),
    )
}

// ---------------------------------------------------------------------------
// Templates and documents
// ---------------------------------------------------------------------------

fn template_error(name: &str, err: impl std::fmt::Display) -> ClientError {
    ClientError::Template {
        name: name.to_string(),
        message: err.to_string(),
    }
}

fn str_at<'a>(data: &'a Value, pointer: &str) -> &'a str {
    data.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

/// `div.flow-topic` elements for every root of `topic`
pub fn render_topics(topic: &TopicTree) -> Vec<Element> {
    topic
        .roots
        .iter()
        .map(|root| {
            let mut element = Element::new("div")
                .with_id(format!("flow-topic-{root}"))
                .with_class("flow-topic")
                .with_data("flow-id", root.as_str())
                .with_child(
                    Element::new("div").with_class("flow-topic-titlebar").with_child(
                        Element::new("h2")
                            .with_class("flow-topic-title")
                            .with_text(topic.title(root).unwrap_or_default()),
                    ),
                );
            let replies = topic
                .current_revision(root)
                .map(|rev| rev.replies.clone())
                .unwrap_or_default();
            for post_id in replies {
                let content = topic
                    .current_revision(&post_id)
                    .map(|rev| rev.content.content.clone())
                    .unwrap_or_default();
                element = element.with_child(
                    Element::new("div")
                        .with_id(format!("flow-post-{post_id}"))
                        .with_class("flow-post")
                        .with_child(Element::new("div").with_class("flow-post-main").with_text(content)),
                );
            }
            element
        })
        .collect()
}

fn watch_link(data: &Value, watch_type: &str) -> Vec<Element> {
    let watched = data.get("isWatched").and_then(Value::as_bool).unwrap_or(false);
    let (class, url) = if watched {
        ("flow-unwatch", str_at(data, &format!("/links/unwatch-{watch_type}/url")))
    } else {
        ("flow-watch", str_at(data, &format!("/links/watch-{watch_type}/url")))
    };
    let mut container = Element::new("div").with_class("flow-watch-link");
    if watch_type == "topic" {
        container = container.with_class("flow-topic-watchlist");
    }
    vec![container.with_child(Element::new("a").with_class(class).with_attr("href", url))]
}

/// Structural renderings of every board template
pub fn board_templates() -> TemplateRegistry {
    let names = TemplateNames::default();
    let topic_name = names.topic.clone();
    let loop_name = names.block_loop.clone();
    TemplateRegistry::new()
        .with(names.topic, move |data| {
            let topic = TopicTree::from_value(data).map_err(|err| template_error(&topic_name, err))?;
            Ok(render_topics(&topic))
        })
        .with(names.block_loop, move |data| {
            let mut board = Element::new("div").with_class("flow-board-topics");
            for block in data.get("blocks").and_then(Value::as_array).into_iter().flatten() {
                if let Some(list) = block.get("topiclist") {
                    let topic = TopicTree::from_value(list).map_err(|err| template_error(&loop_name, err))?;
                    for element in render_topics(&topic) {
                        board = board.with_child(element);
                    }
                }
            }
            Ok(vec![board])
        })
        .with(names.topic_watch, |data| Ok(watch_link(data, "topic")))
        .with(names.board_watch, |data| Ok(watch_link(data, "board")))
        .with(names.edit_title, |data| {
            Ok(vec![Element::new("form")
                .with_class("flow-edit-title-form")
                .with_attr("action", str_at(data, "/actions/edit/url"))
                .with_data("flow-prev-revision-hint", str_at(data, "/revisionId"))
                .with_child(
                    Element::new("input")
                        .with_attr("name", "flow_content")
                        .with_attr("value", str_at(data, "/content/content")),
                )])
        })
        .with(names.moderated_topic, |data| {
            Ok(vec![Element::new("div")
                .with_id(format!("flow-topic-{}", str_at(data, "/postId")))
                .with_class("flow-moderated-topic-confirmation")
                .with_data("revision-id", str_at(data, "/revisionId"))])
        })
        .with(names.moderated_post, |data| {
            Ok(vec![Element::new("div")
                .with_class("flow-moderated-post-confirmation")
                .with_data("revision-id", str_at(data, "/revisionId"))])
        })
}

/// Document with a `.flow-board` holding the rendering of `topic`
pub fn board_document(topic: &Value) -> ClientResult<Document> {
    let mut document = Document::new();
    let board = document.append(document.root(), Element::new("div").with_class("flow-board"))?;
    let wrapper = board_templates().render(&TemplateNames::default().topic, topic)?;
    for element in wrapper.children {
        document.append(board, element)?;
    }
    Ok(document)
}

/// First node matching `selector`, anywhere in the document
pub fn select(document: &Document, selector: &str) -> Option<flow_client::NodeId> {
    let selector = Selector::parse(selector).ok()?;
    document.find_first(document.root(), &selector)
}
