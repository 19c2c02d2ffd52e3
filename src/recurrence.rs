//! Recurrence rules and the Recurrence Projector.
//!
//! A recurring record never carries a persistent "done" state. Its
//! effective status on a given date is computed here from the rule plus
//! the record's Override Set (`complete_instances`), so the same logic
//! serves the filter evaluator, the grouping layer, and any consumer.
//!
//! Rule syntax is a deliberately small RRULE subset:
//! `FREQ=DAILY|WEEKLY|MONTHLY|YEARLY`, optional `UNTIL=YYYYMMDD`,
//! optional `DTSTART=YYYYMMDD`, `INTERVAL=1` tolerated. Anything else is
//! rejected at parse time — partial support fails loud rather than
//! silently approximating.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::config::Vocabularies;
use crate::record::Record;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("missing FREQ part")]
    MissingFrequency,
    #[error("unsupported frequency '{0}'")]
    UnsupportedFrequency(String),
    #[error("unsupported rule part '{0}'")]
    UnsupportedPart(String),
    #[error("invalid date '{0}' in rule")]
    InvalidDate(String),
    #[error("no anchor date: rule has no DTSTART and the record has no scheduled, due, or created date")]
    MissingAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A recurrence rule reduced to the internal three-field model:
/// frequency, anchor date, optional end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// First due date. Dates before the anchor are never due.
    pub anchor: NaiveDate,
    /// Last date that can be due, inclusive.
    pub until: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Parse an RRULE-subset expression. `default_anchor` supplies the
    /// anchor when the rule carries no `DTSTART` (callers pass the
    /// record's scheduled, due, or created date, in that order).
    pub fn parse(expr: &str, default_anchor: Option<NaiveDate>) -> Result<Self, RecurrenceError> {
        let mut frequency = None;
        let mut until = None;
        let mut dtstart = None;

        for part in expr.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceError::UnsupportedPart(part.to_string()))?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        "YEARLY" => Frequency::Yearly,
                        other => {
                            return Err(RecurrenceError::UnsupportedFrequency(other.to_string()))
                        }
                    });
                }
                "UNTIL" => until = Some(parse_rule_date(value)?),
                "DTSTART" => dtstart = Some(parse_rule_date(value)?),
                "INTERVAL" if value == "1" => {}
                _ => return Err(RecurrenceError::UnsupportedPart(part.to_string())),
            }
        }

        let frequency = frequency.ok_or(RecurrenceError::MissingFrequency)?;
        let anchor = dtstart
            .or(default_anchor)
            .ok_or(RecurrenceError::MissingAnchor)?;
        Ok(Self {
            frequency,
            anchor,
            until,
        })
    }

    /// Pure calendar arithmetic: is this rule due on `date`?
    ///
    /// Monthly anchors on day 29-31 clamp to the last day of shorter
    /// months; a Feb-29 yearly anchor clamps to Feb-28 off leap years.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        if date < self.anchor {
            return false;
        }
        if let Some(until) = self.until {
            if date > until {
                return false;
            }
        }
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => date.weekday() == self.anchor.weekday(),
            Frequency::Monthly => {
                date.day() == clamped_day(self.anchor.day(), date.year(), date.month())
            }
            Frequency::Yearly => {
                date.month() == self.anchor.month()
                    && date.day() == clamped_day(self.anchor.day(), date.year(), date.month())
            }
        }
    }

    /// Latest due date, when the rule is bounded by `UNTIL`.
    pub fn last_due(&self) -> Option<NaiveDate> {
        let until = self.until?;
        // Every supported frequency recurs within 366 days, so this walks
        // at most one year before hitting a due date or the anchor.
        let mut d = until;
        while d >= self.anchor {
            if self.is_due(d) {
                return Some(d);
            }
            d = d.pred_opt()?;
        }
        None
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let freq = match self.frequency {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        write!(f, "FREQ={};DTSTART={}", freq, self.anchor.format("%Y%m%d"))?;
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format("%Y%m%d"))?;
        }
        Ok(())
    }
}

fn parse_rule_date(raw: &str) -> Result<NaiveDate, RecurrenceError> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| RecurrenceError::InvalidDate(raw.to_string()))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

fn clamped_day(anchor_day: u32, year: i32, month: u32) -> u32 {
    anchor_day.min(days_in_month(year, month))
}

/// Whether `record` is due on `date`: recurrence rule when present,
/// otherwise the literal due date's date part.
pub fn record_is_due(record: &Record, date: NaiveDate) -> bool {
    match &record.recurrence {
        Some(rule) => rule.is_due(date),
        None => record.due.map(|d| d.date == date).unwrap_or(false),
    }
}

/// The record's status as observed on `date`.
///
/// For a recurring record whose Override Set contains `date`, this is the
/// vocabulary's completed status; otherwise the record's base status.
/// `None` means the record has no status field (uncategorized).
pub fn effective_status(record: &Record, date: NaiveDate, vocab: &Vocabularies) -> Option<String> {
    if record.is_recurring() && record.complete_instances.contains(&date) {
        return Some(
            vocab
                .completed_status()
                .map(|s| s.value.clone())
                .unwrap_or_else(|| "done".to_string()),
        );
    }
    record.status.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_weekly_with_until() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;UNTIL=20250601", Some(d(2025, 5, 5)))
            .unwrap();
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.anchor, d(2025, 5, 5));
        assert_eq!(rule.until, Some(d(2025, 6, 1)));
    }

    #[test]
    fn test_parse_dtstart_overrides_default_anchor() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;DTSTART=20250110", Some(d(2025, 1, 1)))
            .unwrap();
        assert_eq!(rule.anchor, d(2025, 1, 10));
    }

    #[test]
    fn test_parse_rejects_unsupported_parts_loudly() {
        let err = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,WE", Some(d(2025, 1, 1)));
        assert!(matches!(err, Err(RecurrenceError::UnsupportedPart(_))));

        let err = RecurrenceRule::parse("FREQ=WEEKLY;INTERVAL=2", Some(d(2025, 1, 1)));
        assert!(matches!(err, Err(RecurrenceError::UnsupportedPart(_))));

        let err = RecurrenceRule::parse("FREQ=HOURLY", Some(d(2025, 1, 1)));
        assert!(matches!(err, Err(RecurrenceError::UnsupportedFrequency(_))));
    }

    #[test]
    fn test_parse_missing_anchor() {
        let err = RecurrenceRule::parse("FREQ=DAILY", None);
        assert_eq!(err, Err(RecurrenceError::MissingAnchor));
    }

    #[test]
    fn test_daily_due_every_day_from_anchor() {
        let rule = RecurrenceRule::parse("FREQ=DAILY", Some(d(2025, 3, 10))).unwrap();
        assert!(!rule.is_due(d(2025, 3, 9)));
        assert!(rule.is_due(d(2025, 3, 10)));
        assert!(rule.is_due(d(2025, 3, 11)));
        assert!(rule.is_due(d(2026, 1, 1)));
    }

    #[test]
    fn test_weekly_mondays() {
        // 2025-05-05 is a Monday.
        let rule = RecurrenceRule::parse("FREQ=WEEKLY", Some(d(2025, 5, 5))).unwrap();
        // The following three Mondays.
        assert!(rule.is_due(d(2025, 5, 12)));
        assert!(rule.is_due(d(2025, 5, 19)));
        assert!(rule.is_due(d(2025, 5, 26)));
        // The Tuesdays in between.
        assert!(!rule.is_due(d(2025, 5, 13)));
        assert!(!rule.is_due(d(2025, 5, 20)));
        assert!(!rule.is_due(d(2025, 5, 27)));
    }

    #[test]
    fn test_monthly_clamps_short_months() {
        let rule = RecurrenceRule::parse("FREQ=MONTHLY", Some(d(2025, 1, 31))).unwrap();
        assert!(rule.is_due(d(2025, 1, 31)));
        // February 2025 has 28 days: clamp to the 28th.
        assert!(rule.is_due(d(2025, 2, 28)));
        assert!(!rule.is_due(d(2025, 2, 27)));
        // April has 30.
        assert!(rule.is_due(d(2025, 4, 30)));
        assert!(!rule.is_due(d(2025, 4, 29)));
        // Months with a 31st use it, so the 30th is not due in March.
        assert!(rule.is_due(d(2025, 3, 31)));
        assert!(!rule.is_due(d(2025, 3, 30)));
    }

    #[test]
    fn test_yearly_leap_anchor_clamps() {
        let rule = RecurrenceRule::parse("FREQ=YEARLY", Some(d(2024, 2, 29))).unwrap();
        assert!(rule.is_due(d(2024, 2, 29)));
        assert!(rule.is_due(d(2025, 2, 28)));
        assert!(!rule.is_due(d(2025, 3, 1)));
        assert!(rule.is_due(d(2028, 2, 29)));
        assert!(!rule.is_due(d(2028, 2, 28)));
    }

    #[test]
    fn test_until_bounds_due_dates() {
        let rule =
            RecurrenceRule::parse("FREQ=WEEKLY;UNTIL=20250519", Some(d(2025, 5, 5))).unwrap();
        assert!(rule.is_due(d(2025, 5, 19)));
        assert!(!rule.is_due(d(2025, 5, 26)));
        assert_eq!(rule.last_due(), Some(d(2025, 5, 19)));
    }

    #[test]
    fn test_last_due_none_when_until_precedes_anchor() {
        let rule =
            RecurrenceRule::parse("FREQ=DAILY;UNTIL=20250101", Some(d(2025, 2, 1))).unwrap();
        assert_eq!(rule.last_due(), None);
    }

    #[test]
    fn test_effective_status_uses_override_set() {
        let vocab = Vocabularies::default();
        let rule = RecurrenceRule::parse("FREQ=DAILY", Some(d(2025, 1, 1))).unwrap();
        let mut record = Record::new("r.md", "r");
        record.status = Some("open".into());
        record.recurrence = Some(rule);
        record.complete_instances.insert(d(2025, 1, 2));

        assert_eq!(
            effective_status(&record, d(2025, 1, 2), &vocab).as_deref(),
            Some("done")
        );
        assert_eq!(
            effective_status(&record, d(2025, 1, 3), &vocab).as_deref(),
            Some("open")
        );
    }

    #[test]
    fn test_record_is_due_literal_when_not_recurring() {
        let mut record = Record::new("r.md", "r");
        record.due = Some(crate::record::DateValue::date_only(d(2025, 1, 1)));
        assert!(record_is_due(&record, d(2025, 1, 1)));
        assert!(!record_is_due(&record, d(2025, 1, 2)));
    }
}
