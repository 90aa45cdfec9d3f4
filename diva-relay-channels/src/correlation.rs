//! Correlation table for pending replies
//!
//! Maps a conversation id (`thread_id`) to the completer of the one request
//! currently waiting on it. Every operation is a single critical section on
//! a synchronous mutex that is never held across an `.await`, so a lookup
//! and its removal can never interleave with another task's mutation.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::waiter::{waiter, Completer, Waiter};

/// A waiting request: the message id that registered it plus its completer
#[derive(Debug)]
struct PendingEntry {
    message_id: String,
    completer: Completer,
}

/// Result of routing a reply to the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The reply reached the waiting request
    Delivered { message_id: String },
    /// An entry existed but its waiter had already gone away
    WaiterGone { message_id: String },
    /// Nobody is waiting on this thread id
    NoWaiter,
}

/// Correlation table owned by one channel adapter
#[derive(Debug, Default)]
pub struct PendingReplies {
    entries: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingReplies {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new waiter for `thread_id`.
    ///
    /// Any entry already present for the same thread id is replaced and its
    /// completer dropped, which abandons the older waiter. The message id of
    /// the replaced entry is returned so the caller can report it.
    pub fn register(&self, thread_id: &str, message_id: &str) -> (Waiter, Option<String>) {
        let (completer, waiter) = waiter();
        let entry = PendingEntry {
            message_id: message_id.to_string(),
            completer,
        };

        let replaced = self.entries.lock().insert(thread_id.to_string(), entry);
        (waiter, replaced.map(|old| old.message_id))
    }

    /// Pop the entry for `thread_id` and complete it with `text`
    pub fn resolve(&self, thread_id: &str, text: &str) -> Resolution {
        let entry = self.entries.lock().remove(thread_id);

        match entry {
            Some(PendingEntry {
                message_id,
                completer,
            }) => {
                if completer.complete(text) {
                    Resolution::Delivered { message_id }
                } else {
                    Resolution::WaiterGone { message_id }
                }
            }
            None => Resolution::NoWaiter,
        }
    }

    /// Remove the entry for `thread_id` only if it still belongs to `message_id`.
    ///
    /// A newer request on the same thread id keeps its entry. Returns whether
    /// an entry was removed.
    pub fn remove_if(&self, thread_id: &str, message_id: &str) -> bool {
        let mut entries = self.entries.lock();
        let owned = entries
            .get(thread_id)
            .is_some_and(|entry| entry.message_id == message_id);
        if owned {
            entries.remove(thread_id);
        }
        owned
    }

    /// Drop every entry, abandoning all waiters. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        if !drained.is_empty() {
            debug!("Abandoned {} pending replies", drained.len());
        }
        drained.len()
    }

    /// Whether a request is waiting on `thread_id`
    pub fn contains(&self, thread_id: &str) -> bool {
        self.entries.lock().contains_key(thread_id)
    }

    /// Number of waiting requests
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no request is waiting
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
