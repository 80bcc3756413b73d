//! Notification channel for board observers
//!
//! Handlers are registered by event name on the session's bus and run
//! synchronously in registration order.

use crate::dom::NodeId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Events published by the board client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A topic was re-fetched and re-rendered
    RefreshTopic {
        /// Workflow id of the topic
        workflow_id: String,
        /// `view-topic` result topic
        topic: Value,
    },
    /// The mirror model was populated; carries topic titles by id
    Populate {
        /// Topic titles keyed by topic id
        topic_titles_by_id: BTreeMap<String, String>,
    },
    /// Freshly inserted nodes need their interactive behavior attached
    MakeContentInteractive {
        /// Inserted nodes
        nodes: Vec<NodeId>,
    },
    /// A topic was watched; the subscription tooltip should show
    ShowSubscribedTooltip {
        /// New watch link
        node: NodeId,
        /// `topic` or `board`
        watch_type: String,
    },
    /// A form was closed
    FormCancelled {
        /// The form
        form: NodeId,
    },
}

impl ClientEvent {
    /// Event name used for subscriptions
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshTopic { .. } => "refreshTopic",
            Self::Populate { .. } => "populate",
            Self::MakeContentInteractive { .. } => "makeContentInteractive",
            Self::ShowSubscribedTooltip { .. } => "showSubscribedTooltip",
            Self::FormCancelled { .. } => "cancelForm",
        }
    }
}

/// Callback type for event handlers
pub type EventHandler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Named publish/subscribe channel
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<&'static str, Vec<EventHandler>>>,
    event_counts: RwLock<HashMap<&'static str, u64>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_counts", &*self.event_counts.read())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events named `name`
    pub fn on<F>(&self, name: &'static str, handler: F)
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(name)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Publish an event; returns how many handlers ran
    pub fn emit(&self, event: &ClientEvent) -> usize {
        let name = event.name();
        *self.event_counts.write().entry(name).or_insert(0) += 1;

        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler(event);
        }
        tracing::trace!(event = name, handlers = handlers.len(), "emitted");
        handlers.len()
    }

    /// Number of times `name` was emitted
    #[must_use]
    pub fn count(&self, name: &str) -> u64 {
        self.event_counts.read().get(name).copied().unwrap_or(0)
    }

    /// Number of handlers subscribed to `name`
    #[must_use]
    pub fn subscribers(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn handlers_run_in_order_and_are_counted() {
        let bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.on("refreshTopic", move |event| {
                if let ClientEvent::RefreshTopic { workflow_id, .. } = event {
                    seen.lock().push(format!("{tag}:{workflow_id}"));
                }
            });
        }

        let ran = bus.emit(&ClientEvent::RefreshTopic {
            workflow_id: "T1".into(),
            topic: Value::Null,
        });

        assert_eq!(ran, 2);
        assert_eq!(*seen.lock(), vec!["first:T1", "second:T1"]);
        assert_eq!(bus.count("refreshTopic"), 1);
        assert_eq!(bus.count("populate"), 0);
    }

    #[test]
    fn events_without_handlers_still_count() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.on("populate", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.emit(&ClientEvent::FormCancelled { form: crate::dom::Document::new().root() }), 0);
        assert_eq!(bus.count("cancelForm"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscribers("populate"), 1);
    }
}
