//! Record parser — converts one raw document into a typed [`Record`],
//! or signals "not a record" / "malformed".
//!
//! A document is a record iff its YAML frontmatter carries the
//! identifying marker: `task: true` or the configured identifying tag in
//! `tags`. Pure function of (identity, text); no shared state.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::record::{DateValue, Record, TimeEntry};
use crate::recurrence::{RecurrenceError, RecurrenceRule};

/// Pre-compiled regex for the first markdown heading (title fallback)
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+?)\s*$").expect("valid regex"));

/// Pre-compiled regex for wikilink project references: [[Target]]
static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\[([^\]]+)\]\]$").expect("valid regex"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid frontmatter: {0}")]
    Frontmatter(String),
    #[error("invalid {field} value '{value}'")]
    Field { field: &'static str, value: String },
    #[error("invalid recurrence expression '{expr}': {source}")]
    Recurrence {
        expr: String,
        source: RecurrenceError,
    },
}

/// Result of parsing one document.
#[derive(Debug)]
pub enum ParseOutcome {
    /// The document parsed as a record.
    Record(Box<Record>),
    /// The document carries no identifying marker. Not an error.
    NotARecord,
    /// The document looks like a record but is structurally invalid.
    /// The store retains any previously-good cached record.
    Malformed(ParseError),
}

/// Frontmatter fields as they appear on disk, before interpretation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDoc {
    task: Option<bool>,
    title: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    contexts: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    tags: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    projects: Vec<String>,
    due: Option<String>,
    scheduled: Option<String>,
    time_estimate: Option<i64>,
    time_entries: Vec<RawTimeEntry>,
    recurrence: Option<String>,
    complete_instances: Vec<String>,
    archived: Option<bool>,
    created: Option<String>,
    modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTimeEntry {
    start: String,
    #[serde(default)]
    end: Option<String>,
}

/// Accept both `tags: home` and `tags: [home, errand]`.
fn one_or_many<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(de)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Stateless record parser, configured with the identifying tag.
#[derive(Debug, Clone)]
pub struct Parser {
    identifying_tag: String,
}

impl Parser {
    pub fn new(identifying_tag: impl Into<String>) -> Self {
        Self {
            identifying_tag: identifying_tag.into(),
        }
    }

    /// Parse one document. `identity` is the vault-relative path.
    pub fn parse(&self, identity: &str, text: &str) -> ParseOutcome {
        let Some((frontmatter, body)) = split_frontmatter(text) else {
            return ParseOutcome::NotARecord;
        };

        let raw: RawDoc = match serde_yaml::from_str(frontmatter) {
            Ok(raw) => raw,
            Err(e) => {
                // Unparseable YAML: malformed when the block plausibly
                // carries the marker, otherwise not a record at all.
                if self.mentions_marker(frontmatter) {
                    return ParseOutcome::Malformed(ParseError::Frontmatter(e.to_string()));
                }
                return ParseOutcome::NotARecord;
            }
        };

        let tags: Vec<String> = raw
            .tags
            .iter()
            .map(|t| t.trim_start_matches('#').to_string())
            .collect();
        let is_record = raw.task.unwrap_or(false)
            || tags.iter().any(|t| t.eq_ignore_ascii_case(&self.identifying_tag));
        if !is_record {
            return ParseOutcome::NotARecord;
        }

        match self.build_record(identity, raw, tags, body) {
            Ok(record) => ParseOutcome::Record(Box::new(record)),
            Err(e) => ParseOutcome::Malformed(e),
        }
    }

    fn build_record(
        &self,
        identity: &str,
        raw: RawDoc,
        tags: Vec<String>,
        body: &str,
    ) -> Result<Record, ParseError> {
        let due = parse_date_field("due", raw.due.as_deref())?;
        let scheduled = parse_date_field("scheduled", raw.scheduled.as_deref())?;
        let created = parse_date_field("created", raw.created.as_deref())?;
        let modified = parse_date_field("modified", raw.modified.as_deref())?;

        let recurrence = match raw.recurrence.as_deref() {
            Some(expr) => {
                let anchor = scheduled
                    .map(|d| d.date)
                    .or(due.map(|d| d.date))
                    .or(created.map(|d| d.date));
                Some(
                    RecurrenceRule::parse(expr, anchor).map_err(|source| {
                        ParseError::Recurrence {
                            expr: expr.to_string(),
                            source,
                        }
                    })?,
                )
            }
            None => None,
        };

        let mut complete_instances = BTreeSet::new();
        for raw_date in &raw.complete_instances {
            let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d").map_err(|_| {
                ParseError::Field {
                    field: "complete_instances",
                    value: raw_date.clone(),
                }
            })?;
            complete_instances.insert(date);
        }

        let mut time_entries = Vec::with_capacity(raw.time_entries.len());
        for entry in &raw.time_entries {
            let start = parse_datetime(&entry.start).ok_or_else(|| ParseError::Field {
                field: "time_entries",
                value: entry.start.clone(),
            })?;
            let end = match entry.end.as_deref() {
                Some(raw_end) => Some(parse_datetime(raw_end).ok_or_else(|| ParseError::Field {
                    field: "time_entries",
                    value: raw_end.to_string(),
                })?),
                None => None,
            };
            time_entries.push(TimeEntry { start, end });
        }

        // The identifying tag is a marker, not a label: it does not
        // surface as a tag on the record.
        let tags = tags
            .into_iter()
            .filter(|t| !t.eq_ignore_ascii_case(&self.identifying_tag))
            .collect();

        let projects = raw
            .projects
            .iter()
            .map(|p| strip_wikilink(p))
            .filter(|p| !p.is_empty())
            .collect();

        let title = raw
            .title
            .clone()
            .or_else(|| first_heading(body))
            .unwrap_or_else(|| file_stem(identity));

        Ok(Record {
            identity: identity.to_string(),
            title,
            status: raw.status,
            priority: raw.priority,
            contexts: raw.contexts,
            tags,
            projects,
            due,
            scheduled,
            time_estimate: raw.time_estimate,
            time_entries,
            recurrence,
            complete_instances,
            archived: raw.archived.unwrap_or(false),
            created,
            modified,
        })
    }

    /// Whether broken frontmatter plausibly carries the identifying
    /// marker: a `task:` key at the start of a line, or the identifying
    /// tag as a standalone word. Anchored, so `subtask:` or tags that
    /// merely embed the marker text stay NotARecord.
    fn mentions_marker(&self, frontmatter: &str) -> bool {
        frontmatter
            .lines()
            .any(|line| line.trim_start().starts_with("task:"))
            || contains_word(frontmatter, &self.identifying_tag)
    }
}

/// Case-insensitive whole-word search; `-` and `_` count as word
/// characters, so "task" does not match inside "sub-task".
fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let word = word.to_lowercase();
    let is_word_char = |c: char| c.is_alphanumeric() || c == '-' || c == '_';
    let mut search = haystack.as_str();
    let mut offset = 0;
    while let Some(pos) = search.find(&word) {
        let start = offset + pos;
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        if !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char) {
            return true;
        }
        offset = end;
        search = &haystack[end..];
    }
    false
}

/// Split a document into (frontmatter, body). The frontmatter block is
/// delimited by a `---` first line and a closing `---`/`...` line.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    for marker in ["\n---\n", "\n---\r\n", "\n...\n"] {
        if let Some(pos) = rest.find(marker) {
            return Some((&rest[..pos], &rest[pos + marker.len()..]));
        }
    }
    // Closing delimiter at end of file without trailing newline.
    for marker in ["\n---", "\n..."] {
        if let Some(stripped) = rest.strip_suffix(marker) {
            return Some((stripped, ""));
        }
    }
    None
}

fn parse_date_field(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateValue>, ParseError> {
    match raw {
        None => Ok(None),
        Some(raw) => DateValue::parse(raw)
            .map(Some)
            .ok_or_else(|| ParseError::Field {
                field,
                value: raw.to_string(),
            }),
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DateValue::parse(raw).map(|v| {
        NaiveDateTime::new(
            v.date,
            v.time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight")),
        )
    })
}

fn strip_wikilink(raw: &str) -> String {
    let raw = raw.trim();
    match WIKILINK_RE.captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => raw.to_string(),
    }
}

fn first_heading(body: &str) -> Option<String> {
    HEADING_RE
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
}

fn file_stem(identity: &str) -> String {
    Path::new(identity)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}
