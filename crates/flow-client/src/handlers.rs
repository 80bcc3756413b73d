//! Result handlers, run with the outcome of a submission
//!
//! Handlers receive the failure as well as the success; the ones below act
//! on success only, since the session already reported the failure.

use crate::api::ApiResponse;
use crate::dom::{NodeId, Selector};
use crate::error::{ApiFailure, ClientError, ClientResult};
use crate::events::ClientEvent;
use crate::mirror::TopicTree;
use crate::session::{build_fragment, BoardSession};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Data key naming the element a dialog form belongs to
pub const DIALOG_OWNER_KEY: &str = "flow-dialog-owner";

/// What a handler knows about the submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    /// Action name
    pub action: String,
    /// Element the user interacted with
    pub element: NodeId,
    /// Element that carried the in-progress marker
    pub target: NodeId,
}

/// Reacts to the outcome of an action
#[async_trait]
pub trait ApiHandler: Send + Sync {
    /// Handle one outcome
    ///
    /// # Errors
    /// Returns error if the follow-up work fails
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()>;
}

/// Handlers registered on every new session
#[must_use]
pub fn defaults() -> Vec<(&'static str, Arc<dyn ApiHandler>)> {
    let handlers: [(&'static str, Arc<dyn ApiHandler>); 6] = [
        ("board", Arc::new(BoardHandler)),
        ("submitTopicTitle", Arc::new(SubmitTopicTitleHandler)),
        ("watchItem", Arc::new(WatchItemHandler)),
        ("activateEditTitle", Arc::new(ActivateEditTitleHandler)),
        ("moderateTopic", Arc::new(ModerateHandler::new(ModerationTarget::Topic))),
        ("moderatePost", Arc::new(ModerateHandler::new(ModerationTarget::Post))),
    ];
    handlers.into()
}

fn malformed(path: &str) -> ClientError {
    ClientError::MalformedResponse(path.to_string())
}

/// Re-renders the block loop after a topic list reload
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardHandler;

#[async_trait]
impl ApiHandler for BoardHandler {
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()> {
        let Ok(body) = outcome else {
            return Ok(());
        };
        let result = ApiResponse(body)
            .result("view-topiclist")
            .ok_or_else(|| malformed("flow.view-topiclist.result"))?;

        let titles = match result.get("topiclist") {
            Some(list) => Some(session.mirror().populate_topics(&TopicTree::from_value(list)?)),
            None => None,
        };

        let wrapper = session
            .templates()
            .render(&session.config().templates.block_loop, &json!({ "blocks": [result] }))?;
        let nodes = {
            let mut document = session.document().lock();
            let container = document
                .closest(info.target, &Selector::class("flow-board"))
                .or_else(|| document.find_first(document.root(), &Selector::class("flow-board")))
                .unwrap_or_else(|| document.root());
            document.clear_children(container)?;
            let nodes = build_fragment(&mut document, wrapper);
            document.append_nodes(container, &nodes)?;
            nodes
        };

        session
            .events()
            .emit(&ClientEvent::MakeContentInteractive { nodes });
        if let Some(topic_titles_by_id) = titles {
            session
                .events()
                .emit(&ClientEvent::Populate { topic_titles_by_id });
        }
        Ok(())
    }
}

/// Refreshes the title bar after a title edit
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitTopicTitleHandler;

#[async_trait]
impl ApiHandler for SubmitTopicTitleHandler {
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()> {
        let Ok(body) = outcome else {
            return Ok(());
        };
        let workflow = ApiResponse(body)
            .workflow("edit-title")
            .ok_or_else(|| malformed("flow.edit-title.workflow"))?;
        session
            .refresh_topic(info.element, workflow, Some(&Selector::class("flow-topic-titlebar")))
            .await?;
        Ok(())
    }
}

/// Swaps a watch link for its opposite
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchItemHandler;

#[async_trait]
impl ApiHandler for WatchItemHandler {
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()> {
        let Ok(body) = outcome else {
            return Ok(());
        };
        let watched = ApiResponse(body).watched();

        let (href, region, watch_type) = {
            let document = session.document().lock();
            let href = document.attr(info.element, "href").unwrap_or_default().to_string();
            let region = document
                .closest(info.element, &Selector::class("flow-watch-link"))
                .unwrap_or(info.element);
            let watch_type = if document.has_class(region, "flow-topic-watchlist") {
                "topic"
            } else {
                "board"
            };
            (href, region, watch_type)
        };

        let (watch_url, unwatch_url) = if watched {
            (href.clone(), href.replacen("watch", "unwatch", 1))
        } else {
            (href.replacen("unwatch", "watch", 1), href.clone())
        };
        let data = json!({
            "isWatched": watched,
            "links": {
                format!("unwatch-{watch_type}"): {"url": unwatch_url},
                format!("watch-{watch_type}"): {"url": watch_url},
            },
            "watchable": true,
        });
        let templates = &session.config().templates;
        let template = if watch_type == "topic" {
            &templates.topic_watch
        } else {
            &templates.board_watch
        };

        let nodes = session.render_fragment(template, &data)?;
        session.document().lock().replace_with(region, &nodes)?;
        debug!(watched, watch_type, "watch link replaced");

        session.events().emit(&ClientEvent::MakeContentInteractive {
            nodes: nodes.clone(),
        });
        if let (true, Some(&node)) = (watched, nodes.first()) {
            session.events().emit(&ClientEvent::ShowSubscribedTooltip {
                node,
                watch_type: watch_type.to_string(),
            });
        }
        Ok(())
    }
}

/// Opens the title edit form with the current title revision
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivateEditTitleHandler;

#[async_trait]
impl ApiHandler for ActivateEditTitleHandler {
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()> {
        let Ok(body) = outcome else {
            return Ok(());
        };
        let topic = ApiResponse(body)
            .topic("view-post")
            .ok_or_else(|| malformed("flow.view-post.result.topic"))?;
        let tree = TopicTree::from_value(topic)?;
        let revision = tree
            .root_revision()
            .ok_or_else(|| malformed("topic root revision"))?;

        let (titlebar, href) = {
            let document = session.document().lock();
            let topic = document
                .closest(info.element, &Selector::class("flow-topic"))
                .unwrap_or(info.target);
            let titlebar = document
                .find_first(topic, &Selector::class("flow-topic-titlebar"))
                .unwrap_or(topic);
            if document.find_first(titlebar, &Selector::tag("form")).is_some() {
                debug!(%titlebar, "title edit form already open");
                return Ok(());
            }
            let href = document.attr(info.element, "href").unwrap_or_default().to_string();
            (titlebar, href)
        };

        let data = json!({
            "actions": {"edit": {"url": href}},
            "content": {"content": revision.content.content},
            "revisionId": revision.revision_id,
        });
        let wrapper = session
            .templates()
            .render(&session.config().templates.edit_title, &data)?;
        let active_class = session.config().edit_title_active_class.clone();

        let forms = {
            let mut document = session.document().lock();
            document.add_class(titlebar, &active_class)?;
            let mut forms = Vec::with_capacity(wrapper.children.len());
            for element in wrapper.children.into_iter().rev() {
                forms.push(document.prepend(titlebar, element)?);
            }
            forms.reverse();
            forms
        };

        let inserted = forms.clone();
        session.on_form_cancel(forms.first().copied().unwrap_or(titlebar), move |document| {
            if let Err(err) = document.remove_class(titlebar, &active_class) {
                warn!(error = %err, "could not deactivate title bar");
            }
            for form in inserted {
                if let Err(err) = document.detach(form) {
                    warn!(error = %err, "could not remove title edit form");
                }
            }
        });
        session
            .events()
            .emit(&ClientEvent::MakeContentInteractive { nodes: forms });
        Ok(())
    }
}

/// What a moderation action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationTarget {
    /// Whole topic
    Topic,
    /// Single post
    Post,
}

impl ModerationTarget {
    /// API submodule of the action
    #[must_use]
    pub fn submodule(self) -> &'static str {
        match self {
            Self::Topic => "moderate-topic",
            Self::Post => "moderate-post",
        }
    }
}

/// Refreshes the topic, then swaps the moderated region for a confirmation
#[derive(Debug, Clone, Copy)]
pub struct ModerateHandler {
    target: ModerationTarget,
}

impl ModerateHandler {
    /// Create handler for `target`
    #[inline]
    #[must_use]
    pub fn new(target: ModerationTarget) -> Self {
        Self { target }
    }

    fn region<'s>(
        &self,
        session: &'s BoardSession,
        post_id: &str,
    ) -> ClientResult<Option<(Selector, &'s str)>> {
        let templates = &session.config().templates;
        Ok(match self.target {
            ModerationTarget::Topic if session.config().in_topic_namespace => None,
            ModerationTarget::Topic => Some((
                Selector::id(&format!("flow-topic-{post_id}")),
                templates.moderated_topic.as_str(),
            )),
            ModerationTarget::Post => Some((
                Selector::parse(&format!("#flow-post-{post_id} > .flow-post-main"))?,
                templates.moderated_post.as_str(),
            )),
        })
    }
}

#[async_trait]
impl ApiHandler for ModerateHandler {
    async fn handle(
        &self,
        session: &BoardSession,
        info: &HandlerInfo,
        outcome: &Result<Value, ApiFailure>,
    ) -> ClientResult<()> {
        let Ok(body) = outcome else {
            return Ok(());
        };
        let submodule = self.target.submodule();
        let response = ApiResponse(body);
        let revision_id = response
            .committed_revision(submodule)
            .ok_or_else(|| malformed("committed post-revision-id"))?;
        let workflow = response
            .workflow(submodule)
            .ok_or_else(|| malformed("workflow"))?;

        let (form, owner) = {
            let document = session.document().lock();
            let form = document
                .closest(info.element, &Selector::tag("form"))
                .unwrap_or(info.element);
            let owner = document
                .data(form, DIALOG_OWNER_KEY)
                .and_then(|value| serde_json::from_value::<NodeId>(value.clone()).ok())
                .unwrap_or(form);
            (form, owner)
        };

        let update = session.refresh_topic(owner, workflow, None).await?;

        match update.topic.revisions.get(revision_id) {
            Some(revision) if revision.is_moderated => {
                if let Some((selector, template)) = self.region(session, &revision.post_id)? {
                    let nodes = session.render_fragment(template, &serde_json::to_value(revision)?)?;
                    let replaced = {
                        let mut document = session.document().lock();
                        match document.find_first(document.root(), &selector) {
                            Some(region) => {
                                document.replace_with(region, &nodes)?;
                                true
                            }
                            None => false,
                        }
                    };
                    if replaced {
                        session
                            .events()
                            .emit(&ClientEvent::MakeContentInteractive { nodes });
                    } else {
                        warn!(selector = %selector, "moderated region not found");
                    }
                }
            }
            Some(_) => debug!(revision = revision_id, "revision not moderated"),
            None => warn!(revision = revision_id, "moderated revision missing from refreshed topic"),
        }

        session.cancel_form(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handlers_cover_board_actions() {
        let names: Vec<_> = defaults().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "board",
                "submitTopicTitle",
                "watchItem",
                "activateEditTitle",
                "moderateTopic",
                "moderatePost"
            ]
        );
    }

    #[test]
    fn moderation_submodules() {
        assert_eq!(ModerationTarget::Topic.submodule(), "moderate-topic");
        assert_eq!(ModerationTarget::Post.submodule(), "moderate-post");
    }
}
