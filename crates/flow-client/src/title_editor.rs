//! Topic title editor
//!
//! Loads the title post of a topic in wikitext and saves a new title bound
//! to the revision it loaded, so a concurrent rename surfaces as an edit
//! conflict instead of being overwritten.

use crate::api::{ApiResponse, QueryMap, RemoteApi};
use crate::editors::DEFAULT_FORMAT;
use crate::error::{ApiFailure, ClientError, ClientResult};
use crate::mirror::TopicTree;
use flow_actions::MessageParam;
use flow_formatter::MessageCatalog;
use flow_model::PageTitle;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Title editing state of one topic
pub struct TopicTitleEditor {
    api: Arc<dyn RemoteApi>,
    catalog: Arc<dyn MessageCatalog>,
    page: String,
    topic_id: String,
    current_revision: Option<String>,
    content: String,
    error: Option<String>,
}

impl std::fmt::Debug for TopicTitleEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicTitleEditor")
            .field("page", &self.page)
            .field("current_revision", &self.current_revision)
            .field("content", &self.content)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl TopicTitleEditor {
    /// Create editor for topic `topic_id` in namespace `topic_namespace`
    #[must_use]
    pub fn new(
        api: Arc<dyn RemoteApi>,
        catalog: Arc<dyn MessageCatalog>,
        topic_namespace: i32,
        topic_id: impl Into<String>,
    ) -> Self {
        let topic_id = topic_id.into();
        Self {
            api,
            catalog,
            page: PageTitle::new(topic_namespace, &topic_id).prefixed_db(),
            topic_id,
            current_revision: None,
            content: String::new(),
            error: None,
        }
    }

    /// Fetch the current title
    ///
    /// # Errors
    /// Returns error if the call fails or the topic has no title revision;
    /// the user-facing text is kept in [`TopicTitleEditor::error`]
    pub async fn load(&mut self) -> ClientResult<()> {
        let query = QueryMap::flow("view-post", &self.page)
            .with("flow_postId", self.topic_id.as_str())
            .with("flow_format", DEFAULT_FORMAT)
            .into_wire();
        let body = match self.api.call(query).await {
            Ok(body) => body,
            Err(failure) => {
                self.error = Some(
                    self.catalog
                        .text("flow-error-external", &[MessageParam::text(failure.code.clone())]),
                );
                warn!(topic = %self.topic_id, code = %failure.code, "could not load title");
                return Err(failure.into());
            }
        };

        let topic = ApiResponse(&body)
            .topic("view-post")
            .ok_or_else(|| ClientError::MalformedResponse("flow.view-post.result.topic".into()))?;
        let tree = TopicTree::from_value(topic)?;
        let revision = tree
            .root_revision()
            .ok_or_else(|| ClientError::MalformedResponse("topic root revision".into()))?;

        self.current_revision = Some(revision.revision_id.clone());
        self.content = revision.content.content.clone();
        self.error = None;
        Ok(())
    }

    /// Save `title`; returns the topic's workflow id
    ///
    /// # Errors
    /// Returns error if the call fails; the user-facing text is kept in
    /// [`TopicTitleEditor::error`]
    pub async fn save(&mut self, title: impl Into<String>) -> ClientResult<String> {
        let title = title.into();
        let mut query = QueryMap::flow("edit-title", &self.page).with("flow_content", title.as_str());
        if let Some(revision) = &self.current_revision {
            query.set("flow_prev_revision", revision.as_str());
        }

        match self.api.call(query.into_wire()).await {
            Ok(body) => {
                let workflow = ApiResponse(&body)
                    .workflow("edit-title")
                    .unwrap_or(&self.topic_id)
                    .to_string();
                self.content = title;
                self.error = None;
                info!(topic = %self.topic_id, "title saved");
                Ok(workflow)
            }
            Err(failure) => {
                self.error = Some(save_error_text(&failure));
                warn!(topic = %self.topic_id, code = %failure.code, "could not save title");
                Err(failure.into())
            }
        }
    }

    /// Revision the next save is bound to
    #[inline]
    #[must_use]
    pub fn current_revision(&self) -> Option<&str> {
        self.current_revision.as_deref()
    }

    /// Title as last loaded or saved
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Text of the last failure
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn save_error_text(failure: &ApiFailure) -> String {
    failure
        .info()
        .or_else(|| failure.body.get("exception").and_then(Value::as_str))
        .unwrap_or(&failure.code)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flow_formatter::StaticCatalog;
    use flow_model::NS_TOPIC;
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

    fn editor(api: MockApi) -> TopicTitleEditor {
        TopicTitleEditor::new(Arc::new(api), Arc::new(StaticCatalog::english()), NS_TOPIC, "t1")
    }

    #[tokio::test]
    async fn load_then_save_binds_revision() {
        let mut api = MockApi::new();
        api.expect_call()
            .withf(|q| {
                q.submodule() == Some("view-post")
                    && q.get("page") == Some("Topic:t1")
                    && q.get("vppostId") == Some("t1")
                    && q.get("vpformat") == Some("wikitext")
            })
            .times(1)
            .returning(|_| {
                Ok(json!({"flow": {"view-post": {"result": {"topic": {
                    "roots": ["t1"],
                    "posts": {"t1": ["r7"]},
                    "revisions": {"r7": {"revisionId": "r7", "content": {"content": "Old title", "format": "wikitext"}}}
                }}}}}))
            });
        api.expect_call()
            .withf(|q| {
                q.submodule() == Some("edit-title")
                    && q.get("etprev_revision") == Some("r7")
                    && q.get("etcontent") == Some("New title")
            })
            .times(1)
            .returning(|_| Ok(json!({"flow": {"edit-title": {"workflow": "t1"}}})));

        let mut editor = editor(api);
        editor.load().await.unwrap();
        assert_eq!(editor.current_revision(), Some("r7"));
        assert_eq!(editor.content(), "Old title");

        assert_eq!(editor.save("New title").await.unwrap(), "t1");
        assert_eq!(editor.content(), "New title");
        assert!(editor.error().is_none());
    }

    #[tokio::test]
    async fn failures_keep_error_text() {
        let mut api = MockApi::new();
        api.expect_call()
            .withf(|q| q.submodule() == Some("view-post"))
            .returning(|_| Err(ApiFailure::new("nosuchtopic", Value::Null)));
        api.expect_call()
            .withf(|q| q.submodule() == Some("edit-title"))
            .returning(|_| Err(ApiFailure::new("prev_revision", json!({"error": {"info": "Edit conflict"}}))));

        let mut editor = editor(api);
        assert!(editor.load().await.is_err());
        assert_eq!(
            editor.error(),
            Some("An error occurred.<br />The error message received was: nosuchtopic")
        );

        assert!(editor.save("Renamed").await.is_err());
        assert_eq!(editor.error(), Some("Edit conflict"));
        assert_eq!(editor.content(), "");
    }
}
