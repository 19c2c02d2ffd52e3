//! Query types and the grouping/sorting layer.
//!
//! Results are deterministic: the sort comparator always tie-breaks on
//! identity and group ordering is fixed per group key (vocabulary order
//! for status/priority, lexicographic for set-valued keys, chronological
//! for due dates, synthetic groups last), so repeated queries over
//! unchanged data return the same order — required for UI diffing.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::Vocabularies;
use crate::filter::{Condition, QueryError};
use crate::record::{DateValue, Record};
use crate::recurrence;

/// Synthetic label for records missing the group key's value.
pub const UNCATEGORIZED: &str = "uncategorized";
/// Synthetic label for records without a due date under due-date grouping.
pub const UNDATED: &str = "undated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKey {
    #[default]
    None,
    Status,
    Priority,
    Context,
    Project,
    Tag,
    DueDate,
}

impl FromStr for GroupKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(GroupKey::None),
            "status" => Ok(GroupKey::Status),
            "priority" => Ok(GroupKey::Priority),
            "context" | "contexts" => Ok(GroupKey::Context),
            "project" | "projects" => Ok(GroupKey::Project),
            "tag" | "tags" => Ok(GroupKey::Tag),
            "due" | "due-date" => Ok(GroupKey::DueDate),
            other => Err(QueryError::UnknownGroupKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Due,
    Scheduled,
    Priority,
    Title,
    Created,
    Modified,
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "due" => Ok(SortKey::Due),
            "scheduled" => Ok(SortKey::Scheduled),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            "created" => Ok(SortKey::Created),
            "modified" => Ok(SortKey::Modified),
            other => Err(QueryError::UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A complete query: filter tree, sort, grouping, and the optional
/// observation date that recurrence projection is evaluated against.
#[derive(Debug, Clone)]
pub struct Query {
    pub filter: Condition,
    pub sort: SortKey,
    pub direction: Direction,
    pub group: GroupKey,
    pub observation_date: Option<NaiveDate>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Condition::all(),
            sort: SortKey::Due,
            direction: Direction::Ascending,
            group: GroupKey::None,
            observation_date: None,
        }
    }
}

impl Query {
    /// Validate the filter tree against the field-type table and the
    /// observation-date requirement. Callers get errors here, at query
    /// construction, not mid-evaluation.
    pub fn validate(&self) -> Result<(), QueryError> {
        self.filter.validate(self.observation_date.is_some())
    }
}

/// One ordered group of an ordered query result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryGroup {
    pub label: String,
    pub records: Vec<Arc<Record>>,
}

/// Resolves a project reference label to its target record, when one
/// exists. Project grouping groups under resolved targets; the store
/// provides the canonical implementation.
pub type ProjectResolver<'a> = &'a dyn Fn(&str) -> Option<Arc<Record>>;

/// Partition and order filtered records per the query's group and sort
/// keys. Input order is irrelevant; output order is fully determined by
/// the query, the vocabularies, and record content.
pub fn group_and_sort(
    mut records: Vec<Arc<Record>>,
    query: &Query,
    vocab: &Vocabularies,
    resolve_project: ProjectResolver,
) -> Vec<QueryGroup> {
    records.sort_by(|a, b| compare_records(a, b, query, vocab));

    // Partition. One record may land in several groups when the group
    // key is multi-valued; membership order inside each group is the
    // overall sort order because `records` is already sorted.
    let mut order: HashMap<String, GroupOrder> = HashMap::new();
    let mut buckets: HashMap<String, Vec<Arc<Record>>> = HashMap::new();
    for record in &records {
        for slot in group_slots(record, query, vocab, resolve_project) {
            buckets
                .entry(slot.label.clone())
                .or_default()
                .push(Arc::clone(record));
            order.entry(slot.label).or_insert(slot.order);
        }
    }

    let mut groups: Vec<QueryGroup> = buckets
        .into_iter()
        .map(|(label, records)| QueryGroup { label, records })
        .collect();
    groups.sort_by(|a, b| {
        let oa = &order[&a.label];
        let ob = &order[&b.label];
        oa.rank()
            .cmp(&ob.rank())
            .then_with(|| a.label.cmp(&b.label))
    });
    groups
}

/// Sort position of a group label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOrder {
    /// Vocabulary position (status/priority groups).
    Position(usize),
    /// Lexicographic by label (set-valued groups).
    Lexical,
    /// Chronological (due-date groups).
    Date(NaiveDate),
    /// Synthetic groups (uncategorized/undated) sort last.
    Last,
}

impl GroupOrder {
    fn rank(&self) -> (u8, usize, i64) {
        match self {
            GroupOrder::Position(p) => (0, *p, 0),
            GroupOrder::Lexical => (0, 0, 0),
            GroupOrder::Date(d) => (0, 0, d.num_days_from_ce() as i64),
            GroupOrder::Last => (1, 0, 0),
        }
    }
}

struct GroupSlot {
    label: String,
    order: GroupOrder,
}

fn group_slots(
    record: &Record,
    query: &Query,
    vocab: &Vocabularies,
    resolve_project: ProjectResolver,
) -> Vec<GroupSlot> {
    match query.group {
        GroupKey::None => vec![GroupSlot {
            label: "all".to_string(),
            order: GroupOrder::Lexical,
        }],
        GroupKey::Status => {
            let raw = match query.observation_date {
                Some(date) => recurrence::effective_status(record, date, vocab),
                None => record.status.clone(),
            };
            let slot = raw
                .as_deref()
                .and_then(|r| vocab.resolve_status(r))
                .map(|def| GroupSlot {
                    label: def.value.clone(),
                    order: GroupOrder::Position(
                        vocab.status_position(&def.value).unwrap_or(usize::MAX),
                    ),
                });
            vec![slot.unwrap_or_else(uncategorized)]
        }
        GroupKey::Priority => {
            let slot = record
                .priority
                .as_deref()
                .and_then(|r| vocab.resolve_priority(r))
                .map(|def| GroupSlot {
                    label: def.value.clone(),
                    order: GroupOrder::Position(
                        vocab.priority_position(&def.value).unwrap_or(usize::MAX),
                    ),
                });
            vec![slot.unwrap_or_else(uncategorized)]
        }
        GroupKey::Context => set_slots(&record.contexts),
        GroupKey::Project => {
            // References group under their resolved target record. A
            // dangling reference resolves to no group at all; a record
            // whose references all dangle lands in the synthetic group,
            // same as one with no references.
            let mut labels: Vec<String> = record
                .projects
                .iter()
                .filter_map(|label| resolve_project(label))
                .map(|target| target.title.clone())
                .collect();
            labels.sort();
            labels.dedup();
            if labels.is_empty() {
                return vec![uncategorized()];
            }
            labels
                .into_iter()
                .map(|label| GroupSlot {
                    label,
                    order: GroupOrder::Lexical,
                })
                .collect()
        }
        GroupKey::Tag => set_slots(&record.tags),
        GroupKey::DueDate => {
            let day = match (&record.recurrence, query.observation_date) {
                // Date-scoped: a recurring record belongs to the
                // observation day iff it is due then.
                (Some(rule), Some(date)) => rule.is_due(date).then_some(date),
                _ => record.due.map(|d| d.date),
            };
            vec![match day {
                Some(day) => GroupSlot {
                    label: day.format("%Y-%m-%d").to_string(),
                    order: GroupOrder::Date(day),
                },
                None => GroupSlot {
                    label: UNDATED.to_string(),
                    order: GroupOrder::Last,
                },
            }]
        }
    }
}

fn set_slots(members: &[String]) -> Vec<GroupSlot> {
    if members.is_empty() {
        return vec![uncategorized()];
    }
    let mut labels: Vec<String> = members.iter().map(|m| m.to_lowercase()).collect();
    labels.sort();
    labels.dedup();
    labels
        .into_iter()
        .map(|label| GroupSlot {
            label,
            order: GroupOrder::Lexical,
        })
        .collect()
}

fn uncategorized() -> GroupSlot {
    GroupSlot {
        label: UNCATEGORIZED.to_string(),
        order: GroupOrder::Last,
    }
}

/// Primary key per the query, missing values last regardless of
/// direction, identity as the final tie-break.
fn compare_records(
    a: &Record,
    b: &Record,
    query: &Query,
    vocab: &Vocabularies,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let ka = sort_value(a, query.sort, vocab);
    let kb = sort_value(b, query.sort, vocab);
    let primary = match (ka, kb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.cmp(&y);
            match query.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
    };
    primary.then_with(|| a.identity.cmp(&b.identity))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Date(DateValue),
    Number(i64),
    Text(String),
}

fn sort_value(record: &Record, key: SortKey, vocab: &Vocabularies) -> Option<SortValue> {
    match key {
        SortKey::Due => record
            .due
            .or_else(|| {
                // Recurring records without a literal due date sort at
                // their anchor (their first due date).
                record
                    .recurrence
                    .map(|rule| DateValue::date_only(rule.anchor))
            })
            .map(SortValue::Date),
        SortKey::Scheduled => record.scheduled.map(SortValue::Date),
        SortKey::Created => record.created.map(SortValue::Date),
        SortKey::Modified => record.modified.map(SortValue::Date),
        SortKey::Priority => record
            .priority
            .as_deref()
            .and_then(|raw| vocab.priority_weight(raw))
            .map(SortValue::Number),
        SortKey::Title => Some(SortValue::Text(record.title.to_lowercase())),
    }
}
