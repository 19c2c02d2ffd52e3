//! tasq - a queryable task index over a markdown vault
//!
//! Task documents are markdown files whose YAML frontmatter carries an
//! identifying marker (`task: true` or a configurable tag). The engine
//! parses them into records, keeps an in-memory store with derived
//! indexes, coalesces rapid document changes, and answers filtered,
//! grouped, sorted queries — including recurring tasks projected onto an
//! observation date.
//!
//! The index is a cache: the markdown documents stay authoritative, and
//! the store can always be rebuilt by replaying them.

pub mod config;
pub mod engine;
pub mod filter;
pub mod invalidate;
pub mod parser;
pub mod query;
pub mod record;
pub mod recurrence;
pub mod store;

pub use config::{Config, PriorityDef, StatusDef, Vocabularies};
pub use engine::{EngineError, Event, EventKind, SubscriptionId, TaskEngine};
pub use filter::{Condition, Field, FilterValue, Operator, QueryError};
pub use parser::{ParseError, ParseOutcome, Parser};
pub use query::{Direction, GroupKey, Query, QueryGroup, SortKey};
pub use record::{DateValue, Record, TimeEntry};
pub use recurrence::{Frequency, RecurrenceError, RecurrenceRule};
pub use store::{RecordStore, StoreStats};
