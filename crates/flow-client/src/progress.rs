//! In-progress markers
//!
//! While a request runs against an element, the element carries the
//! in-progress class. [`InProgressTracker::begin`] applies the class and
//! returns a guard; dropping the guard removes it. Every exit path of a
//! request therefore clears the marker exactly once.

use crate::dom::{Document, NodeId};
use crate::error::{ClientError, ClientResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    /// Markers applied
    pub started: u64,
    /// Markers removed
    pub cleared: u64,
    /// Submissions refused because a marker was present
    pub rejected: u64,
}

/// Tracks which elements have a request in flight
#[derive(Debug)]
pub struct InProgressTracker {
    class: String,
    active: DashMap<NodeId, u64>,
    next_ticket: AtomicU64,
    stats: Mutex<ProgressStats>,
}

impl InProgressTracker {
    /// Create tracker using `class` as marker
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            active: DashMap::new(),
            next_ticket: AtomicU64::new(1),
            stats: Mutex::new(ProgressStats::default()),
        }
    }

    /// Mark `node` as in progress
    ///
    /// Must not be called while `document` is locked.
    ///
    /// # Errors
    /// - [`ClientError::InProgress`] if `node` is already marked; the
    ///   existing marker is left alone
    /// - [`ClientError::NoSuchNode`] if `node` is not in the document
    pub fn begin(
        self: &Arc<Self>,
        document: &Arc<Mutex<Document>>,
        node: NodeId,
    ) -> ClientResult<InProgressGuard> {
        match self.try_begin(document, node)? {
            Some(guard) => Ok(guard),
            None => {
                self.stats.lock().rejected += 1;
                warn!(%node, "request already in progress");
                Err(ClientError::InProgress { node })
            }
        }
    }

    /// Mark `node` unless it is already marked
    ///
    /// `None` means another holder owns the marker and will clear it.
    ///
    /// # Errors
    /// Returns [`ClientError::NoSuchNode`] if `node` is not in the document
    pub fn try_begin(
        self: &Arc<Self>,
        document: &Arc<Mutex<Document>>,
        node: NodeId,
    ) -> ClientResult<Option<InProgressGuard>> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        match self.active.entry(node) {
            Entry::Occupied(_) => return Ok(None),
            Entry::Vacant(slot) => {
                slot.insert(ticket);
            }
        }
        if let Err(err) = document.lock().add_class(node, &self.class) {
            self.active.remove(&node);
            return Err(err);
        }
        self.stats.lock().started += 1;
        debug!(%node, ticket, "marked in progress");
        Ok(Some(InProgressGuard {
            tracker: Arc::clone(self),
            document: Arc::clone(document),
            node,
            ticket,
        }))
    }

    /// Whether `node` currently has a marker
    #[inline]
    #[must_use]
    pub fn is_active(&self, node: NodeId) -> bool {
        self.active.contains_key(&node)
    }

    /// Marker class
    #[inline]
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        *self.stats.lock()
    }

    fn finish(&self, document: &Mutex<Document>, node: NodeId, ticket: u64) {
        if self.active.remove_if(&node, |_, t| *t == ticket).is_none() {
            return;
        }
        if let Err(err) = document.lock().remove_class(node, &self.class) {
            warn!(%node, error = %err, "could not clear in-progress marker");
        }
        self.stats.lock().cleared += 1;
        debug!(%node, ticket, "cleared in-progress marker");
    }
}

/// Removes the marker when dropped
#[derive(Debug)]
#[must_use = "the marker is removed as soon as the guard is dropped"]
pub struct InProgressGuard {
    tracker: Arc<InProgressTracker>,
    document: Arc<Mutex<Document>>,
    node: NodeId,
    ticket: u64,
}

impl InProgressGuard {
    /// Marked element
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.document, self.node, self.ticket);
    }
}
