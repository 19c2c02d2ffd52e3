//! The Record type — the normalized in-memory representation of one
//! task-like document.
//!
//! Records are owned by the [`RecordStore`](crate::store::RecordStore) and
//! handed out as `Arc` views. Status and priority are kept as the raw
//! strings found in the document; resolution against the configured
//! vocabularies happens at evaluation time so that unresolvable values
//! survive round trips instead of being rejected.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::recurrence::RecurrenceRule;

/// A calendar date with an optional time-of-day part.
///
/// Filter comparisons normalize to the date part; the time part only
/// matters for sorting ties and for callers that explicitly want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DateValue {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl DateValue {
    pub fn date_only(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]`, or RFC 3339.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::date_only(date));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Self {
                    date: dt.date(),
                    time: Some(dt.time()),
                });
            }
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            let naive = dt.naive_local();
            return Some(Self {
                date: naive.date(),
                time: Some(naive.time()),
            });
        }
        None
    }
}

impl std::fmt::Display for DateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.time {
            Some(time) => write!(f, "{}T{}", self.date, time.format("%H:%M")),
            None => write!(f, "{}", self.date),
        }
    }
}

/// One time-tracking entry. Open entries (no `end`) contribute nothing to
/// [`Record::tracked_minutes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeEntry {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

/// A parsed task record.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Stable identity: vault-relative document path. Unique across the store.
    pub identity: String,
    pub title: String,
    /// Raw status string; resolved against the status vocabulary at
    /// evaluation time. `None` means the document carries no status field.
    pub status: Option<String>,
    /// Raw priority string, same resolution policy as `status`.
    pub priority: Option<String>,
    pub contexts: Vec<String>,
    pub tags: Vec<String>,
    /// Project references with wikilink brackets stripped. May dangle;
    /// dangling references are an expected transient state, not a fault.
    pub projects: Vec<String>,
    pub due: Option<DateValue>,
    pub scheduled: Option<DateValue>,
    /// Estimated effort in minutes.
    pub time_estimate: Option<i64>,
    pub time_entries: Vec<TimeEntry>,
    pub recurrence: Option<RecurrenceRule>,
    /// The Override Set: dates whose completion was explicitly toggled.
    /// Mutated only via toggle, never bulk-replaced.
    pub complete_instances: BTreeSet<NaiveDate>,
    pub archived: bool,
    pub created: Option<DateValue>,
    pub modified: Option<DateValue>,
}

impl Record {
    /// An empty record with the given identity and title. Field defaults
    /// match a document whose frontmatter carries only the task marker.
    pub fn new(identity: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            title: title.into(),
            status: None,
            priority: None,
            contexts: Vec::new(),
            tags: Vec::new(),
            projects: Vec::new(),
            due: None,
            scheduled: None,
            time_estimate: None,
            time_entries: Vec::new(),
            recurrence: None,
            complete_instances: BTreeSet::new(),
            archived: false,
            created: None,
            modified: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Total minutes across closed time entries.
    pub fn tracked_minutes(&self) -> i64 {
        self.time_entries
            .iter()
            .filter_map(|e| e.end.map(|end| (end - e.start).num_minutes().max(0)))
            .sum()
    }

    /// Case-insensitive set-membership check used by tag/context/project
    /// filters and index keys.
    pub fn set_contains(values: &[String], member: &str) -> bool {
        values.iter().any(|v| v.eq_ignore_ascii_case(member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_value_parse_date_only() {
        let v = DateValue::parse("2025-01-01").unwrap();
        assert_eq!(v.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(v.time.is_none());
    }

    #[test]
    fn test_date_value_parse_datetime() {
        let v = DateValue::parse("2025-01-01T09:30").unwrap();
        assert_eq!(v.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(v.time, NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn test_date_value_parse_rfc3339() {
        let v = DateValue::parse("2025-06-15T08:00:00+00:00").unwrap();
        assert_eq!(v.date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert!(v.time.is_some());
    }

    #[test]
    fn test_date_value_parse_garbage() {
        assert!(DateValue::parse("next tuesday").is_none());
        assert!(DateValue::parse("").is_none());
    }

    #[test]
    fn test_date_value_ordering_date_only_before_timed() {
        let a = DateValue::parse("2025-01-01").unwrap();
        let b = DateValue::parse("2025-01-01T00:30").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_tracked_minutes_ignores_open_entries() {
        let start = NaiveDateTime::parse_from_str("2025-01-01T09:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        let end = NaiveDateTime::parse_from_str("2025-01-01T09:45:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        let mut record = Record::new("a.md", "a");
        record.time_entries = vec![
            TimeEntry {
                start,
                end: Some(end),
            },
            TimeEntry { start, end: None },
        ];
        assert_eq!(record.tracked_minutes(), 45);
    }

    #[test]
    fn test_set_contains_case_insensitive() {
        let values = vec!["Home".to_string(), "errand".to_string()];
        assert!(Record::set_contains(&values, "home"));
        assert!(Record::set_contains(&values, "ERRAND"));
        assert!(!Record::set_contains(&values, "work"));
    }
}
