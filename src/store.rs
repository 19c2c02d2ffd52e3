//! In-memory record store with incrementally-maintained derived indexes.
//!
//! The store is the sole owner of record state; every other component
//! receives `Arc` views or requests mutations through it. All mutations
//! are serialized by the caller (single logical writer), and derived
//! indexes are consistent with the record map before any mutation
//! returns — read-after-write within the store.
//!
//! The index is a rebuildable cache: the authoritative data lives in the
//! external document store, and replaying the document sequence through
//! the parser reproduces the same store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::parser::ParseError;
use crate::record::Record;

/// Store statistics, for `tasq stats` and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub records: usize,
    pub malformed: usize,
    pub tags: usize,
    pub contexts: usize,
    pub projects: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Arc<Record>>,
    // Derived indexes, keyed by lowercased label. Maintained on every
    // upsert/remove, never recomputed per query.
    by_tag: HashMap<String, BTreeSet<String>>,
    by_context: HashMap<String, BTreeSet<String>>,
    by_project: HashMap<String, BTreeSet<String>>,
    by_due_day: BTreeMap<NaiveDate, BTreeSet<String>>,
    // Resolution indexes for project references: a reference label
    // resolves to a record by title first, then by path stem.
    by_title: HashMap<String, BTreeSet<String>>,
    by_stem: HashMap<String, BTreeSet<String>>,
    // Identities whose latest parse failed. A previously-good record
    // stays cached until the parse confirms deletion or not-a-record,
    // so a transient invalid edit never makes the record flicker out.
    malformed: HashMap<String, ParseError>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> Option<Arc<Record>> {
        self.records.get(identity).cloned()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.records.contains_key(identity)
    }

    /// Insert or replace the record for its identity. Old index entries
    /// are unwound before the new ones are written, so one record never
    /// appears under stale labels.
    pub fn upsert(&mut self, record: Record) -> Arc<Record> {
        let identity = record.identity.clone();
        if let Some(old) = self.records.remove(&identity) {
            self.unindex(&old);
        }
        let record = Arc::new(record);
        self.index(&record);
        self.records.insert(identity.clone(), Arc::clone(&record));
        self.malformed.remove(&identity);
        tracing::debug!(identity = %identity, "Record upserted");
        record
    }

    /// Remove the record and all of its index entries. Also clears any
    /// malformed marker for the identity.
    pub fn remove(&mut self, identity: &str) -> Option<Arc<Record>> {
        self.malformed.remove(identity);
        let old = self.records.remove(identity)?;
        self.unindex(&old);
        tracing::debug!(identity = %identity, "Record removed");
        Some(old)
    }

    /// Record a parse failure for the identity without touching any
    /// previously cached record.
    pub fn mark_malformed(&mut self, identity: &str, error: ParseError) {
        tracing::warn!(identity = %identity, error = %error, "Document is malformed, keeping cached record");
        self.malformed.insert(identity.to_string(), error);
    }

    pub fn malformed(&self, identity: &str) -> Option<&ParseError> {
        self.malformed.get(identity)
    }

    /// Restartable iteration over all records. Order is unspecified;
    /// the query layer imposes deterministic ordering.
    pub fn all_records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.values()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<Arc<Record>> {
        self.lookup(&self.by_tag, tag)
    }

    pub fn by_context(&self, context: &str) -> Vec<Arc<Record>> {
        self.lookup(&self.by_context, context)
    }

    pub fn by_project(&self, project: &str) -> Vec<Arc<Record>> {
        self.lookup(&self.by_project, project)
    }

    /// Resolve a project reference to its target record: by title first,
    /// then by path stem, case-insensitively. Ambiguous labels resolve to
    /// the smallest identity so resolution is deterministic. `None` means
    /// the reference dangles — an expected transient state, not a fault.
    pub fn resolve_project(&self, label: &str) -> Option<Arc<Record>> {
        let key = label.to_lowercase();
        let ids = self.by_title.get(&key).or_else(|| self.by_stem.get(&key))?;
        ids.iter().next().and_then(|id| self.records.get(id).cloned())
    }

    /// Records whose project references resolve to `project`, one level
    /// deep: references spelled as its title or its path stem, provided
    /// they actually resolve to this record and not an ambiguous twin.
    pub fn project_members(&self, project: &Record) -> Vec<Arc<Record>> {
        let mut ids: BTreeSet<&String> = BTreeSet::new();
        for key in [project.title.to_lowercase(), identity_stem(&project.identity)] {
            let resolves_here = self
                .resolve_project(&key)
                .map_or(false, |r| r.identity == project.identity);
            if !resolves_here {
                continue;
            }
            if let Some(members) = self.by_project.get(&key) {
                ids.extend(members.iter());
            }
        }
        ids.into_iter()
            .filter(|id| *id != &project.identity)
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    /// Records whose literal due date falls on `date`. Recurrence
    /// projection is the query layer's job; this index is literal.
    pub fn due_on(&self, date: NaiveDate) -> Vec<Arc<Record>> {
        self.by_due_day
            .get(&date)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            records: self.records.len(),
            malformed: self.malformed.len(),
            tags: self.by_tag.len(),
            contexts: self.by_context.len(),
            projects: self.by_project.len(),
        }
    }

    fn lookup(
        &self,
        index: &HashMap<String, BTreeSet<String>>,
        label: &str,
    ) -> Vec<Arc<Record>> {
        index
            .get(&label.to_lowercase())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn index(&mut self, record: &Record) {
        for tag in &record.tags {
            self.by_tag
                .entry(tag.to_lowercase())
                .or_default()
                .insert(record.identity.clone());
        }
        for context in &record.contexts {
            self.by_context
                .entry(context.to_lowercase())
                .or_default()
                .insert(record.identity.clone());
        }
        for project in &record.projects {
            self.by_project
                .entry(project.to_lowercase())
                .or_default()
                .insert(record.identity.clone());
        }
        if let Some(due) = record.due {
            self.by_due_day
                .entry(due.date)
                .or_default()
                .insert(record.identity.clone());
        }
        self.by_title
            .entry(record.title.to_lowercase())
            .or_default()
            .insert(record.identity.clone());
        self.by_stem
            .entry(identity_stem(&record.identity))
            .or_default()
            .insert(record.identity.clone());
    }

    fn unindex(&mut self, record: &Record) {
        for tag in &record.tags {
            remove_entry(&mut self.by_tag, &tag.to_lowercase(), &record.identity);
        }
        for context in &record.contexts {
            remove_entry(&mut self.by_context, &context.to_lowercase(), &record.identity);
        }
        for project in &record.projects {
            remove_entry(&mut self.by_project, &project.to_lowercase(), &record.identity);
        }
        if let Some(due) = record.due {
            if let Some(ids) = self.by_due_day.get_mut(&due.date) {
                ids.remove(&record.identity);
                if ids.is_empty() {
                    self.by_due_day.remove(&due.date);
                }
            }
        }
        remove_entry(&mut self.by_title, &record.title.to_lowercase(), &record.identity);
        remove_entry(&mut self.by_stem, &identity_stem(&record.identity), &record.identity);
    }
}

fn identity_stem(identity: &str) -> String {
    Path::new(identity)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(identity)
        .to_lowercase()
}

fn remove_entry(index: &mut HashMap<String, BTreeSet<String>>, key: &str, identity: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(identity);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
