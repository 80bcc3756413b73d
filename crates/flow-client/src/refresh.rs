//! Conflict-aware topic refresh
//!
//! After a mutation succeeds the whole topic is fetched again through
//! `view-topic`. Only the confirmed state is rendered: the fetched topic
//! replaces the topic's subtree (or the part matched by a selector), then
//! the mirror commits it and `refreshTopic` is emitted.

use crate::api::{ApiResponse, QueryMap};
use crate::dom::{NodeId, Selector};
use crate::error::{ClientError, ClientResult};
use crate::events::ClientEvent;
use crate::mirror::TopicUpdate;
use crate::session::{build_fragment, remove_error, show_error, BoardSession};
use flow_actions::MessageParam;
use flow_model::PageTitle;
use tracing::{info, warn};

impl BoardSession {
    /// Re-fetch topic `workflow_id` and re-render it around `element`
    ///
    /// With a selector, only the matching region of the topic is replaced.
    /// The topic is the closest `.flow-topic` around `element`, else the
    /// rendered `#flow-topic-<id>`; when neither exists the document is left
    /// alone but the mirror is still updated.
    /// The in-progress marker of `element` is kept until the refresh ends;
    /// if a caller already holds it, that caller clears it.
    ///
    /// # Errors
    /// - [`ClientError::Api`] if the fetch failed; an error box is shown
    ///   on the topic
    /// - [`ClientError::MalformedResponse`] if the response has no topic
    /// - template errors
    pub async fn refresh_topic(
        &self,
        element: NodeId,
        workflow_id: &str,
        selector: Option<&Selector>,
    ) -> ClientResult<TopicUpdate> {
        let target = {
            let document = self.document().lock();
            document
                .closest(element, &Selector::class("flow-topic"))
                .or_else(|| {
                    document.find_first(document.root(), &Selector::id(&format!("flow-topic-{workflow_id}")))
                })
        };
        let _guard = self.progress().try_begin(self.document(), element)?;

        let page = PageTitle::new(self.config().topic_namespace, workflow_id).prefixed_db();
        let outcome = self
            .api()
            .call(QueryMap::flow("view-topic", &page).into_wire())
            .await;

        let body = match outcome {
            Ok(body) => body,
            Err(failure) => {
                let detail = self.api_error_message(&failure);
                let message = self
                    .catalog()
                    .text(&self.config().refresh_error_key, &[MessageParam::raw(detail)]);
                {
                    let mut document = self.document().lock();
                    let error_target = target.unwrap_or(element);
                    remove_error(&mut document, error_target);
                    show_error(&mut document, error_target, &message)?;
                }
                warn!(workflow = workflow_id, code = %failure.code, "topic refresh failed");
                return Err(failure.into());
            }
        };

        let raw = ApiResponse(&body)
            .topic("view-topic")
            .cloned()
            .ok_or_else(|| ClientError::MalformedResponse("flow.view-topic.result.topic".into()))?;
        let update = TopicUpdate::from_topic(workflow_id, raw)?;
        let wrapper = self.templates().render(&self.config().templates.topic, &update.raw)?;

        let inserted = if let Some(target) = target {
            let mut document = self.document().lock();
            let fragment = build_fragment(&mut document, wrapper);
            match selector {
                None => {
                    document.replace_with(target, &fragment)?;
                    fragment
                }
                Some(selector) => {
                    let replacement: Vec<NodeId> = fragment
                        .iter()
                        .flat_map(|&node| document.find(node, selector))
                        .collect();
                    let regions = document.find(target, selector);
                    match regions.split_first() {
                        Some((&first, rest)) => {
                            document.replace_with(first, &replacement)?;
                            for &region in rest {
                                document.detach(region)?;
                            }
                        }
                        None => warn!(selector = %selector, "refreshed region not found in topic"),
                    }
                    replacement
                }
            }
        } else {
            warn!(workflow = workflow_id, "topic not rendered, skipping replacement");
            Vec::new()
        };

        self.events()
            .emit(&ClientEvent::MakeContentInteractive { nodes: inserted });
        self.mirror().apply(&update);
        self.events().emit(&ClientEvent::RefreshTopic {
            workflow_id: update.workflow_id.clone(),
            topic: update.raw.clone(),
        });
        info!(workflow = workflow_id, "topic refreshed");
        Ok(update)
    }
}
