//! Change coalescing for the invalidation path.
//!
//! Rapid repeated changes to the same identity collapse to a single
//! re-parse of the latest content: each change restarts a per-identity
//! deadline, and only entries whose deadline has elapsed are drained by
//! [`ChangeDebouncer::poll`]. Intermediate document states are never
//! surfaced to queries. [`ChangeDebouncer::flush`] drains everything
//! synchronously, for correctness-critical bulk queries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Soft cap on distinct pending identities. In practice the map is
/// bounded by vault size; past the cap we keep accepting changes
/// (dropping one would desynchronize the store) and warn once per burst.
const PENDING_WARN_THRESHOLD: usize = 10_000;

#[derive(Debug)]
struct PendingChange {
    /// Latest content; `None` means the document was deleted.
    content: Option<String>,
    deadline: Instant,
    sequence: u64,
}

/// Per-identity cancellable-timer debouncer.
#[derive(Debug)]
pub struct ChangeDebouncer {
    pending: HashMap<String, PendingChange>,
    window: Duration,
    // Monotonic arrival counter: drain order is deadline, then arrival,
    // so replays are deterministic.
    sequence: u64,
}

impl ChangeDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
            sequence: 0,
        }
    }

    /// Register a change. A change for an already-pending identity
    /// replaces its content and restarts its deadline.
    pub fn record(&mut self, identity: &str, content: Option<String>, now: Instant) {
        if self.pending.len() >= PENDING_WARN_THRESHOLD && !self.pending.contains_key(identity) {
            tracing::warn!(
                pending = self.pending.len(),
                "Pending change backlog is unusually large"
            );
        }
        self.sequence += 1;
        self.pending.insert(
            identity.to_string(),
            PendingChange {
                content,
                deadline: now + self.window,
                sequence: self.sequence,
            },
        );
    }

    /// Drain entries whose debounce window has elapsed, oldest deadline
    /// first.
    pub fn poll(&mut self, now: Instant) -> Vec<(String, Option<String>)> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        self.take(due)
    }

    /// Drain all pending entries regardless of deadline.
    pub fn flush(&mut self) -> Vec<(String, Option<String>)> {
        let all: Vec<String> = self.pending.keys().cloned().collect();
        self.take(all)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self, mut identities: Vec<String>) -> Vec<(String, Option<String>)> {
        let mut drained: Vec<(String, Option<String>, Instant, u64)> = identities
            .drain(..)
            .filter_map(|id| {
                self.pending
                    .remove(&id)
                    .map(|p| (id, p.content, p.deadline, p.sequence))
            })
            .collect();
        drained.sort_by(|a, b| a.2.cmp(&b.2).then(a.3.cmp(&b.3)));
        drained
            .into_iter()
            .map(|(id, content, _, _)| (id, content))
            .collect()
    }
}
