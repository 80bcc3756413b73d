//! Message parameters and how they resolve against a revision
//!
//! Each history entry lists its message parameters in order. A parameter is
//! either a literal or a callback evaluated against a fixed
//! [`ParamContext`] right before the message is rendered. Callbacks must be
//! pure: evaluation order is not part of the contract.

use flow_model::{EntityId, Revision, UserRef};
use std::fmt;
use std::sync::Arc;

/// A positional message parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageParam {
    /// Plain text, escaped by the catalog
    Text(String),
    /// Pre-rendered markup, inserted verbatim
    Raw(String),
    /// Number, formatted for the user language
    Num(i64),
}

impl MessageParam {
    /// Plain text parameter
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Raw markup parameter
    #[inline]
    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }
}

/// Host services available to parameter callbacks
pub trait RenderingContext: Send + Sync {
    /// Url for `action` on a workflow, optionally scoped to a post
    fn url(&self, action: &str, workflow_id: EntityId, post_id: Option<EntityId>) -> String;

    /// Rendered link to a user's page
    fn user_link(&self, user: &UserRef) -> String;
}

/// Fixed argument tuple handed to every callback
#[derive(Clone, Copy)]
pub struct ParamContext<'a> {
    /// Revision being described
    pub revision: &'a Revision,
    /// Host rendering services
    pub rendering: &'a dyn RenderingContext,
    /// Workflow the revision belongs to
    pub workflow_id: EntityId,
    /// Block the revision was made in (`topic`, `header`, ...)
    pub block_type: &'a str,
}

impl fmt::Debug for ParamContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamContext")
            .field("revision", &self.revision.id())
            .field("workflow_id", &self.workflow_id)
            .field("block_type", &self.block_type)
            .finish_non_exhaustive()
    }
}

/// Callback producing a parameter from the context
pub type ParamCallback = Arc<dyn Fn(&ParamContext<'_>) -> MessageParam + Send + Sync>;

/// Literal value or callback
#[derive(Clone)]
pub enum ParamSpec {
    /// Used as is
    Literal(MessageParam),
    /// Evaluated per description
    Callback(ParamCallback),
}

impl ParamSpec {
    /// Literal parameter
    #[inline]
    #[must_use]
    pub fn literal(param: MessageParam) -> Self {
        Self::Literal(param)
    }

    /// Callback parameter
    #[inline]
    #[must_use]
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&ParamContext<'_>) -> MessageParam + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Resolve against a context
    #[must_use]
    pub fn resolve(&self, ctx: &ParamContext<'_>) -> MessageParam {
        match self {
            Self::Literal(param) => param.clone(),
            Self::Callback(f) => f(ctx),
        }
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(param) => f.debug_tuple("Literal").field(param).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Parameter callbacks shared by the default taxonomy
pub mod builtin {
    use super::{MessageParam, ParamSpec};

    /// Link to the author's user page (raw)
    #[must_use]
    pub fn user_links() -> ParamSpec {
        ParamSpec::callback(|ctx| MessageParam::Raw(ctx.rendering.user_link(ctx.revision.user())))
    }

    /// Author name, for gender-aware messages
    #[must_use]
    pub fn user_text() -> ParamSpec {
        ParamSpec::callback(|ctx| MessageParam::Text(ctx.revision.user().name.clone()))
    }

    /// Url of the topic (raw)
    #[must_use]
    pub fn workflow_url() -> ParamSpec {
        ParamSpec::callback(|ctx| MessageParam::Raw(ctx.rendering.url("view", ctx.workflow_id, None)))
    }

    /// Url of the revision's post, falling back to the topic (raw)
    #[must_use]
    pub fn post_url() -> ParamSpec {
        ParamSpec::callback(|ctx| {
            MessageParam::Raw(ctx.rendering.url("view", ctx.workflow_id, ctx.revision.post_id()))
        })
    }

    /// Revision content as plain text (topic titles)
    #[must_use]
    pub fn content() -> ParamSpec {
        ParamSpec::callback(|ctx| MessageParam::Text(ctx.revision.content_raw().to_string()))
    }

    /// Moderation reason, empty when none was given
    #[must_use]
    pub fn moderated_reason() -> ParamSpec {
        ParamSpec::callback(|ctx| {
            MessageParam::Text(ctx.revision.moderated_reason().unwrap_or_default().to_string())
        })
    }

    /// Block type the revision was made in
    #[must_use]
    pub fn block_type() -> ParamSpec {
        ParamSpec::callback(|ctx| MessageParam::Text(ctx.block_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_model::RevisionKind;

    struct PlainUrls;

    impl RenderingContext for PlainUrls {
        fn url(&self, action: &str, workflow_id: EntityId, post_id: Option<EntityId>) -> String {
            match post_id {
                Some(post) => format!("/{action}/{workflow_id}#{post}"),
                None => format!("/{action}/{workflow_id}"),
            }
        }

        fn user_link(&self, user: &UserRef) -> String {
            format!("<a>{}</a>", user.name)
        }
    }

    #[test]
    fn literal_and_callback_resolve() {
        let workflow = EntityId::new();
        let revision = Revision::builder(RevisionKind::Post, EntityId::new())
            .user(UserRef::new(1, "Ann"))
            .build();
        let ctx = ParamContext {
            revision: &revision,
            rendering: &PlainUrls,
            workflow_id: workflow,
            block_type: "topic",
        };

        assert_eq!(
            ParamSpec::literal(MessageParam::Num(3)).resolve(&ctx),
            MessageParam::Num(3)
        );
        assert_eq!(builtin::user_links().resolve(&ctx), MessageParam::raw("<a>Ann</a>"));
        assert_eq!(
            builtin::post_url().resolve(&ctx),
            MessageParam::Raw(format!("/view/{workflow}#{}", revision.object_id()))
        );
        assert_eq!(builtin::block_type().resolve(&ctx), MessageParam::text("topic"));
    }
}
