//! The task engine: single-writer wiring of parser, store, and change
//! debouncing behind the query surface.
//!
//! All mutations funnel through `apply_change`, one at a time, so derived
//! indexes never expose a partial update. Queries are read-only against
//! the current snapshot; a query issued before [`TaskEngine::initial_scan`]
//! completes fails with [`EngineError::NotReady`] rather than silently
//! returning a partial result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::{Config, Vocabularies};
use crate::filter::{Condition, Conjunction, Field, FilterValue, Operator, QueryError};
use crate::invalidate::ChangeDebouncer;
use crate::parser::{ParseOutcome, Parser};
use crate::query::{group_and_sort, Query, QueryGroup};
use crate::record::Record;
use crate::store::{RecordStore, StoreStats};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store is not ready: the initial scan has not completed")]
    NotReady,
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("no record with identity '{0}'")]
    UnknownRecord(String),
    #[error("record '{0}' has no recurrence rule")]
    NotRecurring(String),
}

/// Event categories a consumer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    StoreReady,
    RecordUpserted,
    RecordRemoved,
    /// Coarse signal for full-refresh consumers; fires alongside every
    /// observable mutation.
    StoreChanged,
}

/// Typed store events with explicit payloads, so consumers can apply
/// minimal incremental updates instead of refreshing everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StoreReady,
    RecordUpserted(String),
    RecordRemoved(String),
    StoreChanged,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StoreReady => EventKind::StoreReady,
            Event::RecordUpserted(_) => EventKind::RecordUpserted,
            Event::RecordRemoved(_) => EventKind::RecordRemoved,
            Event::StoreChanged => EventKind::StoreChanged,
        }
    }
}

/// Handle returned by [`TaskEngine::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&Event) + Send>;

struct Subscriber {
    id: u64,
    kind: EventKind,
    callback: Callback,
}

pub struct TaskEngine {
    vocab: Vocabularies,
    parser: Parser,
    store: RecordStore,
    debouncer: ChangeDebouncer,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    ready: bool,
}

impl Default for TaskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskEngine {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            vocab: config.vocabularies(),
            parser: Parser::new(config.identifying_tag_or_default()),
            store: RecordStore::new(),
            debouncer: ChangeDebouncer::new(Duration::from_millis(
                config.debounce_ms_or_default(),
            )),
            subscribers: Vec::new(),
            next_subscription: 0,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocab
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Ingest the full document listing. Per-record events are not
    /// emitted during the scan; consumers wait for `StoreReady`.
    pub fn initial_scan<I, S>(&mut self, docs: I)
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        for (identity, content) in docs {
            self.apply_change(identity.as_ref(), Some(content.as_ref()), false);
        }
        self.ready = true;
        tracing::info!(records = self.store.len(), "Initial scan complete");
        self.emit(&Event::StoreReady);
    }

    /// Drop the index and replay a fresh document listing. The index is
    /// a rebuildable cache; this must converge to the same record set as
    /// the equivalent change sequence.
    pub fn rebuild<I, S>(&mut self, docs: I)
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        self.store = RecordStore::new();
        self.debouncer.flush();
        self.ready = false;
        self.initial_scan(docs);
    }

    /// External change notification: create/modify with content, delete
    /// with `None`. Renames arrive as delete+create pairs. The change is
    /// debounced; call [`TaskEngine::poll`] or [`TaskEngine::flush_pending`]
    /// to apply.
    pub fn on_document_changed(&mut self, identity: &str, content: Option<&str>) {
        self.debouncer
            .record(identity, content.map(str::to_string), Instant::now());
    }

    /// Apply pending changes whose debounce window has elapsed.
    pub fn poll(&mut self) {
        let due = self.debouncer.poll(Instant::now());
        for (identity, content) in due {
            self.apply_change(&identity, content.as_deref(), true);
        }
    }

    /// Synchronously drain every pending change, elapsed or not. Used
    /// before correctness-critical bulk queries.
    pub fn flush_pending(&mut self) {
        let pending = self.debouncer.flush();
        for (identity, content) in pending {
            self.apply_change(&identity, content.as_deref(), true);
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.debouncer.is_idle()
    }

    pub fn get_record(&self, identity: &str) -> Option<Arc<Record>> {
        self.store.get(identity)
    }

    /// Last parse error for an identity, if its latest parse failed.
    pub fn parse_error(&self, identity: &str) -> Option<&crate::parser::ParseError> {
        self.store.malformed(identity)
    }

    /// Run a query against the current snapshot: validate, pick
    /// candidates (derived index when the filter pins one), evaluate the
    /// filter tree, group and sort.
    pub fn query(&self, query: &Query) -> Result<Vec<QueryGroup>, EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        query.validate()?;

        let candidates = self
            .index_candidates(&query.filter, query.observation_date.is_some())
            .unwrap_or_else(|| self.store.all_records().cloned().collect());

        let matched: Vec<Arc<Record>> = candidates
            .into_iter()
            .filter(|r| query.filter.evaluate(r, &self.vocab, query.observation_date))
            .collect();

        Ok(group_and_sort(matched, query, &self.vocab, &|label| {
            self.store.resolve_project(label)
        }))
    }

    /// Records whose project references resolve to the given record, by
    /// title or path stem. One level deep: members of members are not
    /// followed.
    pub fn project_members(&self, identity: &str) -> Result<Vec<Arc<Record>>, EngineError> {
        let record = self
            .store
            .get(identity)
            .ok_or_else(|| EngineError::UnknownRecord(identity.to_string()))?;
        Ok(self.store.project_members(&record))
    }

    /// Toggle per-date completion on a recurring record. Returns whether
    /// the date is complete after the toggle. The Override Set is edited
    /// one date at a time; history for other dates is untouched.
    pub fn toggle_recurrence_completion(
        &mut self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<bool, EngineError> {
        let record = self
            .store
            .get(identity)
            .ok_or_else(|| EngineError::UnknownRecord(identity.to_string()))?;
        if !record.is_recurring() {
            return Err(EngineError::NotRecurring(identity.to_string()));
        }

        let mut updated = (*record).clone();
        let now_complete = if updated.complete_instances.remove(&date) {
            false
        } else {
            updated.complete_instances.insert(date);
            true
        };
        self.store.upsert(updated);
        self.emit(&Event::RecordUpserted(identity.to_string()));
        self.emit(&Event::StoreChanged);
        Ok(now_complete)
    }

    /// Replace the status/priority vocabularies. Canonicalization of all
    /// subsequent evaluations uses the new vocabularies.
    pub fn reconfigure(&mut self, vocab: Vocabularies) {
        self.vocab = vocab;
        self.emit(&Event::StoreChanged);
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + 'static,
    {
        self.next_subscription += 1;
        let id = self.next_subscription;
        self.subscribers.push(Subscriber {
            id,
            kind,
            callback: Box::new(callback),
        });
        SubscriptionId(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id.0);
        self.subscribers.len() < before
    }

    fn emit(&self, event: &Event) {
        for sub in &self.subscribers {
            if sub.kind == event.kind() {
                (sub.callback)(event);
            }
        }
    }

    /// Apply one coalesced change to the store, emitting events for
    /// observable transitions.
    fn apply_change(&mut self, identity: &str, content: Option<&str>, emit: bool) {
        match content {
            None => {
                if self.store.remove(identity).is_some() && emit {
                    self.emit(&Event::RecordRemoved(identity.to_string()));
                    self.emit(&Event::StoreChanged);
                }
            }
            Some(text) => match self.parser.parse(identity, text) {
                ParseOutcome::Record(record) => {
                    self.store.upsert(*record);
                    if emit {
                        self.emit(&Event::RecordUpserted(identity.to_string()));
                        self.emit(&Event::StoreChanged);
                    }
                }
                ParseOutcome::NotARecord => {
                    // The identifying marker is gone: the record is
                    // destroyed even though the document still exists.
                    if self.store.remove(identity).is_some() && emit {
                        self.emit(&Event::RecordRemoved(identity.to_string()));
                        self.emit(&Event::StoreChanged);
                    }
                }
                ParseOutcome::Malformed(error) => {
                    // Keeps any previously-good record; no observable
                    // change, so no events.
                    self.store.mark_malformed(identity, error);
                }
            },
        }
    }

    /// When a top-level leaf pins a maintained index, start from that
    /// index instead of scanning every record. Narrowing must be
    /// semantics-preserving: the literal due-day index is skipped for
    /// date-scoped queries, where recurring records answer `due` leaves
    /// by projection instead of the indexed literal field.
    fn index_candidates(
        &self,
        condition: &Condition,
        date_scoped: bool,
    ) -> Option<Vec<Arc<Record>>> {
        match condition {
            Condition::Leaf {
                field,
                operator,
                value,
            } => match (field, operator, value) {
                (Field::Tags, Operator::HasMember, FilterValue::Text(m)) => {
                    Some(self.store.by_tag(m))
                }
                (Field::Contexts, Operator::HasMember, FilterValue::Text(m)) => {
                    Some(self.store.by_context(m))
                }
                (Field::Projects, Operator::HasMember, FilterValue::Text(m)) => {
                    Some(self.store.by_project(m))
                }
                (Field::Due, Operator::On, FilterValue::Date(d)) if !date_scoped => {
                    Some(self.store.due_on(*d))
                }
                _ => None,
            },
            Condition::Group {
                conjunction: Conjunction::And,
                negate: false,
                children,
            } => children
                .iter()
                .filter(|c| matches!(c, Condition::Leaf { .. }))
                .find_map(|c| self.index_candidates(c, date_scoped)),
            _ => None,
        }
    }
}
