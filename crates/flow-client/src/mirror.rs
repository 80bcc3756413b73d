//! Client-side mirror of server topic state
//!
//! The mirror holds one [`TopicTree`] per topic. A refreshed topic replaces
//! its tree wholesale; trees are never patched in place.

use crate::error::ClientResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Revision content and format
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentView {
    /// Raw content
    #[serde(default)]
    pub content: String,
    /// Content format
    #[serde(default)]
    pub format: String,
}

/// A revision as the API renders it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionView {
    /// Revision id
    pub revision_id: String,
    /// Post the revision belongs to
    #[serde(default)]
    pub post_id: String,
    /// Content
    #[serde(default)]
    pub content: ContentView,
    /// Whether the revision is moderated
    #[serde(default)]
    pub is_moderated: bool,
    /// Moderation state name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderate_state: Option<String>,
    /// Reply post ids
    #[serde(default)]
    pub replies: Vec<String>,
    /// Fields the client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Topics, posts and revisions in the API's normalized shape
///
/// `posts` maps a post id to its revision ids, newest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopicTree {
    /// Root post ids (topic ids)
    #[serde(default)]
    pub roots: Vec<String>,
    /// Post id → revision ids
    #[serde(default)]
    pub posts: BTreeMap<String, Vec<String>>,
    /// Revision id → revision
    #[serde(default)]
    pub revisions: BTreeMap<String, RevisionView>,
}

impl TopicTree {
    /// Parse from a response value
    ///
    /// # Errors
    /// Returns error if the value does not have the expected shape
    pub fn from_value(value: &Value) -> ClientResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Current revision of a post
    #[must_use]
    pub fn current_revision(&self, post_id: &str) -> Option<&RevisionView> {
        let revision_id = self.posts.get(post_id)?.first()?;
        self.revisions.get(revision_id)
    }

    /// Revision of the first root post (the topic title)
    #[must_use]
    pub fn root_revision(&self) -> Option<&RevisionView> {
        self.current_revision(self.roots.first()?)
    }

    /// Title of topic `topic_id`
    #[must_use]
    pub fn title(&self, topic_id: &str) -> Option<&str> {
        self.current_revision(topic_id)
            .map(|rev| rev.content.content.as_str())
    }

    /// Titles of all roots
    #[must_use]
    pub fn titles(&self) -> BTreeMap<String, String> {
        self.roots
            .iter()
            .filter_map(|root| Some((root.clone(), self.title(root)?.to_string())))
            .collect()
    }

    /// Posts and revisions reachable from `root` through replies
    #[must_use]
    pub fn subtree(&self, root: &str) -> TopicTree {
        let mut tree = TopicTree {
            roots: vec![root.to_string()],
            ..TopicTree::default()
        };
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([root.to_string()]);

        while let Some(post_id) = queue.pop_front() {
            if !seen.insert(post_id.clone()) {
                continue;
            }
            let Some(revision_ids) = self.posts.get(&post_id) else {
                continue;
            };
            tree.posts.insert(post_id.clone(), revision_ids.clone());
            for revision_id in revision_ids {
                if let Some(revision) = self.revisions.get(revision_id) {
                    queue.extend(revision.replies.iter().cloned());
                    tree.revisions.insert(revision_id.clone(), revision.clone());
                }
            }
        }
        tree
    }
}

/// A confirmed topic state, ready to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct TopicUpdate {
    /// Workflow id of the topic
    pub workflow_id: String,
    /// Parsed topic
    pub topic: TopicTree,
    /// Topic as received, for templates and observers
    pub raw: Value,
}

impl TopicUpdate {
    /// Build from a `view-topic` result topic
    ///
    /// # Errors
    /// Returns error if the topic does not have the expected shape
    pub fn from_topic(workflow_id: impl Into<String>, raw: Value) -> ClientResult<Self> {
        Ok(Self {
            workflow_id: workflow_id.into(),
            topic: TopicTree::from_value(&raw)?,
            raw,
        })
    }
}

/// Local reconstruction of the board
#[derive(Debug, Clone, Default)]
pub struct MirrorModel {
    topics: IndexMap<String, TopicTree>,
    description: Option<RevisionView>,
    titles: BTreeMap<String, String>,
    revision: u64,
}

impl MirrorModel {
    /// Create empty mirror
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the topics of a topic list; returns their titles
    pub fn populate_topics(&mut self, list: &TopicTree) -> BTreeMap<String, String> {
        let titles = list.titles();
        for root in &list.roots {
            self.topics.insert(root.clone(), list.subtree(root));
        }
        self.titles.extend(titles.clone());
        self.revision += 1;
        debug!(topics = list.roots.len(), "populated topics");
        titles
    }

    /// Set the board description from a header block (`{revision: ...}`)
    ///
    /// # Errors
    /// Returns error if the revision does not have the expected shape
    pub fn populate_description(&mut self, header: &Value) -> ClientResult<()> {
        self.description = match header.get("revision") {
            Some(revision) if !revision.is_null() => Some(RevisionView::deserialize(revision)?),
            _ => None,
        };
        self.revision += 1;
        Ok(())
    }

    /// Replace one topic with confirmed server state
    pub fn apply(&mut self, update: &TopicUpdate) {
        if let Some(title) = update.topic.title(&update.workflow_id) {
            self.titles.insert(update.workflow_id.clone(), title.to_string());
        }
        self.topics
            .insert(update.workflow_id.clone(), update.topic.clone());
        self.revision += 1;
    }

    /// Topic by id
    #[inline]
    #[must_use]
    pub fn topic(&self, id: &str) -> Option<&TopicTree> {
        self.topics.get(id)
    }

    /// Topic ids in board order
    pub fn topic_ids(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    /// Board description revision
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&RevisionView> {
        self.description.as_ref()
    }

    /// Known topic titles
    #[inline]
    #[must_use]
    pub fn titles(&self) -> &BTreeMap<String, String> {
        &self.titles
    }

    /// Bumped on every change
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
