//! Configuration file support for tasq
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/tasq/config.toml` (user defaults)
//! 2. `.tasq.toml` in the vault root (vault overrides)
//!
//! Status and priority vocabularies are ordered: group ordering and
//! priority sort weights follow the order and weights configured here.
//! All canonicalization uses the vocabulary in effect at evaluation time.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of the status vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDef {
    /// Canonical value compared by filters (e.g. "open").
    pub value: String,
    /// Display label used for group headers.
    pub label: String,
    /// Whether records in this status count as completed.
    #[serde(default)]
    pub completed: bool,
}

/// One entry of the priority vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityDef {
    pub value: String,
    pub label: String,
    /// Sort weight; descending priority sort puts the highest weight first.
    pub weight: i64,
}

/// The status/priority vocabularies in effect for an engine.
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub statuses: Vec<StatusDef>,
    pub priorities: Vec<PriorityDef>,
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            statuses: vec![
                status("open", "Open", false),
                status("in-progress", "In progress", false),
                status("done", "Done", true),
                status("cancelled", "Cancelled", true),
            ],
            priorities: vec![
                priority("none", "None", 0),
                priority("low", "Low", 1),
                priority("normal", "Normal", 2),
                priority("high", "High", 3),
            ],
        }
    }
}

fn status(value: &str, label: &str, completed: bool) -> StatusDef {
    StatusDef {
        value: value.to_string(),
        label: label.to_string(),
        completed,
    }
}

fn priority(value: &str, label: &str, weight: i64) -> PriorityDef {
    PriorityDef {
        value: value.to_string(),
        label: label.to_string(),
        weight,
    }
}

impl Vocabularies {
    /// Resolve a raw status string against the vocabulary, matching the
    /// canonical value or the display label, case-insensitively.
    pub fn resolve_status(&self, raw: &str) -> Option<&StatusDef> {
        self.statuses
            .iter()
            .find(|s| s.value.eq_ignore_ascii_case(raw) || s.label.eq_ignore_ascii_case(raw))
    }

    pub fn resolve_priority(&self, raw: &str) -> Option<&PriorityDef> {
        self.priorities
            .iter()
            .find(|p| p.value.eq_ignore_ascii_case(raw) || p.label.eq_ignore_ascii_case(raw))
    }

    /// Canonical form used for comparisons: the vocabulary value when the
    /// raw string resolves, the raw string verbatim otherwise (unresolvable
    /// values are preserved, not rejected).
    pub fn canonical_status(&self, raw: &str) -> String {
        self.resolve_status(raw)
            .map(|s| s.value.clone())
            .unwrap_or_else(|| raw.to_string())
    }

    pub fn canonical_priority(&self, raw: &str) -> String {
        self.resolve_priority(raw)
            .map(|p| p.value.clone())
            .unwrap_or_else(|| raw.to_string())
    }

    /// The first completed status in vocabulary order, used as the
    /// effective status of recurrence-completed instances.
    pub fn completed_status(&self) -> Option<&StatusDef> {
        self.statuses.iter().find(|s| s.completed)
    }

    /// Whether a raw status string resolves to a completed status.
    pub fn is_completed(&self, raw: &str) -> bool {
        self.resolve_status(raw).map(|s| s.completed).unwrap_or(false)
    }

    /// Position in vocabulary order, for deterministic group ordering.
    pub fn status_position(&self, value: &str) -> Option<usize> {
        self.statuses
            .iter()
            .position(|s| s.value.eq_ignore_ascii_case(value))
    }

    pub fn priority_position(&self, value: &str) -> Option<usize> {
        self.priorities
            .iter()
            .position(|p| p.value.eq_ignore_ascii_case(value))
    }

    /// Sort weight for a raw priority string; unresolvable values have no
    /// weight and sort last.
    pub fn priority_weight(&self, raw: &str) -> Option<i64> {
        self.resolve_priority(raw).map(|p| p.weight)
    }
}

/// Configuration options loaded from config files.
///
/// # Example
///
/// ```toml
/// # ~/.config/tasq/config.toml or .tasq.toml
/// identifying_tag = "task"   # frontmatter tag that marks a record
/// debounce_ms = 500          # change coalescing window
///
/// [[status]]
/// value = "open"
/// label = "Open"
///
/// [[status]]
/// value = "done"
/// label = "Done"
/// completed = true
///
/// [[priority]]
/// value = "high"
/// label = "High"
/// weight = 3
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frontmatter tag that marks a document as a record
    pub identifying_tag: Option<String>,
    /// Debounce window for change coalescing, in milliseconds
    pub debounce_ms: Option<u64>,
    /// Status vocabulary (replaces the built-in set when non-empty)
    #[serde(rename = "status")]
    pub statuses: Vec<StatusDef>,
    /// Priority vocabulary (replaces the built-in set when non-empty)
    #[serde(rename = "priority")]
    pub priorities: Vec<PriorityDef>,
}

impl Config {
    pub const DEFAULT_IDENTIFYING_TAG: &'static str = "task";
    pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

    /// Load configuration from user and vault config files.
    pub fn load(vault_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("tasq/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let vault_config = Self::load_file(&vault_root.join(".tasq.toml")).unwrap_or_default();

        let merged = user_config.override_with(vault_config);
        tracing::debug!(
            identifying_tag = ?merged.identifying_tag,
            debounce_ms = ?merged.debounce_ms,
            statuses = merged.statuses.len(),
            priorities = merged.priorities.len(),
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file.
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present).
    fn override_with(self, other: Self) -> Self {
        Config {
            identifying_tag: other.identifying_tag.or(self.identifying_tag),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            statuses: if other.statuses.is_empty() {
                self.statuses
            } else {
                other.statuses
            },
            priorities: if other.priorities.is_empty() {
                self.priorities
            } else {
                other.priorities
            },
        }
    }

    pub fn identifying_tag_or_default(&self) -> &str {
        self.identifying_tag
            .as_deref()
            .unwrap_or(Self::DEFAULT_IDENTIFYING_TAG)
    }

    pub fn debounce_ms_or_default(&self) -> u64 {
        self.debounce_ms.unwrap_or(Self::DEFAULT_DEBOUNCE_MS)
    }

    /// The vocabularies this config describes, falling back to the
    /// built-in sets where the file configures none.
    pub fn vocabularies(&self) -> Vocabularies {
        let defaults = Vocabularies::default();
        Vocabularies {
            statuses: if self.statuses.is_empty() {
                defaults.statuses
            } else {
                self.statuses.clone()
            },
            priorities: if self.priorities.is_empty() {
                defaults.priorities
            } else {
                self.priorities.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_vocabularies() {
        let vocab = Vocabularies::default();
        assert_eq!(vocab.statuses.len(), 4);
        assert_eq!(vocab.completed_status().unwrap().value, "done");
        assert_eq!(vocab.priority_weight("high"), Some(3));
        assert_eq!(vocab.priority_weight("urgent!!"), None);
    }

    #[test]
    fn test_resolve_by_value_or_label_case_insensitive() {
        let vocab = Vocabularies::default();
        assert_eq!(vocab.canonical_status("OPEN"), "open");
        assert_eq!(vocab.canonical_status("In Progress"), "in-progress");
        // Unresolvable values are preserved verbatim.
        assert_eq!(vocab.canonical_status("waiting"), "waiting");
        assert!(!vocab.is_completed("waiting"));
        assert!(vocab.is_completed("Cancelled"));
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".tasq.toml");
        std::fs::write(
            &path,
            r#"
identifying_tag = "todo"
debounce_ms = 250

[[status]]
value = "waiting"
label = "Waiting"

[[status]]
value = "shipped"
label = "Shipped"
completed = true
"#,
        )
        .unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.identifying_tag_or_default(), "todo");
        assert_eq!(config.debounce_ms_or_default(), 250);

        let vocab = config.vocabularies();
        assert_eq!(vocab.statuses.len(), 2);
        assert_eq!(vocab.completed_status().unwrap().value, "shipped");
        // Priorities fall back to built-ins.
        assert_eq!(vocab.priorities.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_file(&dir.path().join("nonexistent.toml")).is_none());
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".tasq.toml");
        std::fs::write(&path, "not valid [[[").unwrap();
        assert!(Config::load_file(&path).is_none());
    }

    #[test]
    fn test_merge_override() {
        let base = Config {
            identifying_tag: Some("task".into()),
            debounce_ms: Some(500),
            ..Default::default()
        };
        let over = Config {
            debounce_ms: Some(100),
            ..Default::default()
        };
        let merged = base.override_with(over);
        assert_eq!(merged.identifying_tag.as_deref(), Some("task"));
        assert_eq!(merged.debounce_ms, Some(100));
    }
}
