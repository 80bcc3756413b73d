//! Flow Client
//!
//! Client half of a Flow board: submits user actions to the remote API and
//! keeps the rendered board and its mirror model in step with confirmed
//! server state.
//!
//! # Core Operations
//!
//! - **Submit**: [`BoardSession::submit`] marks the target in progress, runs
//!   the [`MutationDispatcher`] pre-handlers and hands the outcome to the
//!   action's [`ApiHandler`]
//! - **Refresh**: [`BoardSession::refresh_topic`] re-fetches a topic after a
//!   mutation and replaces its rendering, then updates the [`MirrorModel`]
//! - **Notify**: observers subscribe to [`ClientEvent`]s on the session's
//!   [`EventBus`]
//!
//! # Architecture
//!
//! ```text
//! Submission → pre-handlers → RemoteApi → ApiHandler
//!                                             ↓
//!                   view-topic → Document → MirrorModel → refreshTopic
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_client::{BoardSession, ClientConfig, QueryMap, Submission};
//!
//! let session = BoardSession::builder(ClientConfig::new("Talk:Board"), api, templates).build();
//! session.initialize(None).await?;
//! session
//!     .submit(Submission::new("moderatePost", button, QueryMap::flow("moderate-post", "Topic:T1")))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod dom;
pub mod editors;
pub mod error;
pub mod events;
pub mod handlers;
pub mod mirror;
pub mod progress;
pub mod refresh;
pub mod session;
pub mod templates;
pub mod title_editor;

pub use api::{submodule_prefix, ApiResponse, QueryMap, RemoteApi};
pub use config::{ClientConfig, TemplateNames};
pub use dispatcher::{MutationDispatcher, PreHandler, PreHandlerContext, Submission, PREV_REVISION_KEY};
pub use dom::{Document, Element, NodeId, Selector};
pub use editors::{EditorRegistry, EditorSurface, TextareaEditor};
pub use error::{ApiFailure, ClientError, ClientResult};
pub use events::{ClientEvent, EventBus, EventHandler};
pub use handlers::{ApiHandler, HandlerInfo, ModerateHandler, ModerationTarget};
pub use mirror::{ContentView, MirrorModel, RevisionView, TopicTree, TopicUpdate};
pub use progress::{InProgressGuard, InProgressTracker, ProgressStats};
pub use session::{BoardSession, BoardSessionBuilder};
pub use templates::{TemplateEngine, TemplateRegistry};
pub use title_editor::TopicTitleEditor;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[derive(Default)]
    struct EchoApi {
        sent: Mutex<Vec<QueryMap>>,
    }

    #[async_trait]
    impl RemoteApi for EchoApi {
        async fn call(&self, query: QueryMap) -> Result<Value, ApiFailure> {
            self.sent.lock().push(query);
            Ok(json!({"flow": {"reply": {"status": "ok"}}}))
        }
    }

    #[tokio::test]
    async fn submission_without_handler_returns_body() {
        let api = Arc::new(EchoApi::default());
        let mut document = Document::new();
        let form = document.append(document.root(), Element::new("form")).unwrap();
        document
            .append(
                form,
                Element::new("textarea")
                    .with_attr("name", "flow_content")
                    .with_attr("value", "Thanks!"),
            )
            .unwrap();

        let session = BoardSession::builder(
            ClientConfig::new("Topic:T1"),
            Arc::clone(&api) as Arc<dyn RemoteApi>,
            Arc::new(TemplateRegistry::new()),
        )
        .document(document)
        .build();

        let body = session
            .submit(Submission::new("reply", form, QueryMap::flow("reply", "Topic:T1")))
            .await
            .unwrap();

        assert_eq!(body.pointer("/flow/reply/status"), Some(&json!("ok")));
        let sent = api.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get("repcontent"), Some("Thanks!"));
        assert_eq!(sent[0].get("repformat"), Some("wikitext"));
        assert!(!session.document().lock().has_class(form, "flow-api-inprogress"));
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
