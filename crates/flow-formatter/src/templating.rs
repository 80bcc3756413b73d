//! Rendering services handed to message parameter callbacks

use crate::links::workflow_query;
use crate::urls::UrlGenerator;
use flow_actions::RenderingContext;
use flow_model::{EntityId, PageTitle, UserRef, NS_TOPIC, NS_USER};
use handlebars::html_escape;
use std::sync::Arc;

/// Url and user-link rendering for descriptions
#[derive(Clone)]
pub struct Templating {
    urls: Arc<dyn UrlGenerator>,
    topic_namespace: i32,
}

impl std::fmt::Debug for Templating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templating")
            .field("topic_namespace", &self.topic_namespace)
            .finish_non_exhaustive()
    }
}

impl Templating {
    /// Create new templating services
    #[inline]
    #[must_use]
    pub fn new(urls: Arc<dyn UrlGenerator>) -> Self {
        Self {
            urls,
            topic_namespace: NS_TOPIC,
        }
    }

    /// With topic namespace id
    #[inline]
    #[must_use]
    pub fn with_topic_namespace(mut self, namespace: i32) -> Self {
        self.topic_namespace = namespace;
        self
    }

    /// Url generator in use
    #[inline]
    #[must_use]
    pub fn url_generator(&self) -> &Arc<dyn UrlGenerator> {
        &self.urls
    }
}

impl RenderingContext for Templating {
    fn url(&self, action: &str, workflow_id: EntityId, post_id: Option<EntityId>) -> String {
        let page = PageTitle::new(self.topic_namespace, workflow_id.canonical());
        self.urls.build_url(&page, action, &workflow_query(workflow_id, post_id))
    }

    fn user_link(&self, user: &UserRef) -> String {
        let name = html_escape(&user.name);
        if user.is_anonymous() {
            return format!("<span class=\"mw-userlink mw-anonuserlink\">{name}</span>");
        }
        let page = PageTitle::new(NS_USER, user.name.clone());
        let url = html_escape(&self.urls.build_url(&page, "view", &[]));
        format!("<a href=\"{url}\" class=\"mw-userlink\">{name}</a>")
    }
}
