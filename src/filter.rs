//! Composable boolean filter trees over record fields.
//!
//! A condition is either a leaf comparison (field, operator, value) or a
//! group (AND/OR with an optional NOT). Every field has a declared type,
//! and operator/field mismatches are rejected by [`Condition::validate`]
//! at query-construction time — never coerced at evaluation time.
//!
//! Date-relative leaves (`due on observed`) against recurring records
//! delegate to the recurrence projector instead of reading the literal
//! `due` field.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::Vocabularies;
use crate::record::Record;
use crate::recurrence::{self, RecurrenceRule};

/// Query construction errors. Surfaced synchronously to the caller;
/// never silently degraded to "no results".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("operator '{operator}' is not valid for {kind} field '{field}'")]
    InvalidOperator {
        field: Field,
        operator: Operator,
        kind: FieldKind,
    },
    #[error("operator '{operator}' on field '{field}' expects a {expected} value")]
    ValueTypeMismatch {
        field: Field,
        operator: Operator,
        expected: &'static str,
    },
    #[error("filter references the observation date but the query has none")]
    MissingObservationDate,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("unknown group key '{0}'")]
    UnknownGroupKey(String),
    #[error("unknown sort key '{0}'")]
    UnknownSortKey(String),
    #[error("invalid filter value '{0}'")]
    InvalidValue(String),
    #[error("malformed filter expression '{0}', expected 'field operator [value]'")]
    MalformedExpression(String),
}

/// The closed set of filterable record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Status,
    Priority,
    Tags,
    Contexts,
    Projects,
    Due,
    Scheduled,
    Created,
    Modified,
    TimeEstimate,
    Archived,
}

/// Declared field types consulted at query-construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Enum,
    Set,
    Date,
    Number,
    Flag,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Title => FieldKind::Text,
            Field::Status | Field::Priority => FieldKind::Enum,
            Field::Tags | Field::Contexts | Field::Projects => FieldKind::Set,
            Field::Due | Field::Scheduled | Field::Created | Field::Modified => FieldKind::Date,
            Field::TimeEstimate => FieldKind::Number,
            Field::Archived => FieldKind::Flag,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Status => "status",
            Field::Priority => "priority",
            Field::Tags => "tags",
            Field::Contexts => "contexts",
            Field::Projects => "projects",
            Field::Due => "due",
            Field::Scheduled => "scheduled",
            Field::Created => "created",
            Field::Modified => "modified",
            Field::TimeEstimate => "time-estimate",
            Field::Archived => "archived",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Enum => "enum",
            FieldKind::Set => "set",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Flag => "flag",
        };
        f.write_str(name)
    }
}

impl FromStr for Field {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(Field::Title),
            "status" => Ok(Field::Status),
            "priority" => Ok(Field::Priority),
            "tag" | "tags" => Ok(Field::Tags),
            "context" | "contexts" => Ok(Field::Contexts),
            "project" | "projects" => Ok(Field::Projects),
            "due" => Ok(Field::Due),
            "scheduled" => Ok(Field::Scheduled),
            "created" => Ok(Field::Created),
            "modified" => Ok(Field::Modified),
            "time-estimate" | "time_estimate" => Ok(Field::TimeEstimate),
            "archived" => Ok(Field::Archived),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }
}

/// Leaf comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    // text
    Equals,
    Contains,
    // enum
    Is,
    IsNot,
    // set
    HasMember,
    IsEmpty,
    IsNotEmpty,
    // date (compared by date part)
    On,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    // number
    NumberEquals,
    LessThan,
    AtMost,
    GreaterThan,
    AtLeast,
    // flag
    IsSet,
    NotSet,
}

impl Operator {
    pub fn valid_for(self, kind: FieldKind) -> bool {
        use Operator::*;
        match kind {
            FieldKind::Text => matches!(self, Equals | Contains),
            FieldKind::Enum => matches!(self, Is | IsNot),
            FieldKind::Set => matches!(self, HasMember | IsEmpty | IsNotEmpty),
            FieldKind::Date => matches!(self, On | Before | After | OnOrBefore | OnOrAfter),
            FieldKind::Number => {
                matches!(self, NumberEquals | LessThan | AtMost | GreaterThan | AtLeast)
            }
            FieldKind::Flag => matches!(self, IsSet | NotSet),
        }
    }

    pub fn token(self) -> &'static str {
        use Operator::*;
        match self {
            Equals => "equals",
            Contains => "contains",
            Is => "is",
            IsNot => "is-not",
            HasMember => "has",
            IsEmpty => "empty",
            IsNotEmpty => "not-empty",
            On => "on",
            Before => "before",
            After => "after",
            OnOrBefore => "on-or-before",
            OnOrAfter => "on-or-after",
            NumberEquals => "=",
            LessThan => "<",
            AtMost => "<=",
            GreaterThan => ">",
            AtLeast => ">=",
            IsSet => "set",
            NotSet => "not-set",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Operator::*;
        match s.to_ascii_lowercase().as_str() {
            "equals" => Ok(Equals),
            "contains" => Ok(Contains),
            "is" => Ok(Is),
            "is-not" => Ok(IsNot),
            "has" => Ok(HasMember),
            "empty" => Ok(IsEmpty),
            "not-empty" => Ok(IsNotEmpty),
            "on" => Ok(On),
            "before" => Ok(Before),
            "after" => Ok(After),
            "on-or-before" => Ok(OnOrBefore),
            "on-or-after" => Ok(OnOrAfter),
            "=" => Ok(NumberEquals),
            "<" => Ok(LessThan),
            "<=" => Ok(AtMost),
            ">" => Ok(GreaterThan),
            ">=" => Ok(AtLeast),
            "set" => Ok(IsSet),
            "not-set" => Ok(NotSet),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

/// The comparison value carried by a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Date(NaiveDate),
    /// Resolves to the query's observation date at evaluation time.
    ObservationDate,
    Number(i64),
    /// For operators that take no value (empty / set / not-set).
    None,
}

/// Group conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

/// One node of a filter tree. Immutable once handed to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf {
        field: Field,
        operator: Operator,
        value: FilterValue,
    },
    Group {
        conjunction: Conjunction,
        negate: bool,
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn leaf(field: Field, operator: Operator, value: FilterValue) -> Self {
        Condition::Leaf {
            field,
            operator,
            value,
        }
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::Group {
            conjunction: Conjunction::And,
            negate: false,
            children,
        }
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Group {
            conjunction: Conjunction::Or,
            negate: false,
            children,
        }
    }

    pub fn not(child: Condition) -> Self {
        Condition::Group {
            conjunction: Conjunction::And,
            negate: true,
            children: vec![child],
        }
    }

    /// The empty AND group: matches everything.
    pub fn all() -> Self {
        Condition::and(Vec::new())
    }

    /// Check operator/field-type compatibility and value types across the
    /// whole tree. `has_observation_date` gates `FilterValue::ObservationDate`.
    pub fn validate(&self, has_observation_date: bool) -> Result<(), QueryError> {
        match self {
            Condition::Group { children, .. } => {
                for child in children {
                    child.validate(has_observation_date)?;
                }
                Ok(())
            }
            Condition::Leaf {
                field,
                operator,
                value,
            } => {
                let kind = field.kind();
                if !operator.valid_for(kind) {
                    return Err(QueryError::InvalidOperator {
                        field: *field,
                        operator: *operator,
                        kind,
                    });
                }
                let expected = match kind {
                    FieldKind::Text | FieldKind::Enum => "text",
                    FieldKind::Set => match operator {
                        Operator::HasMember => "text",
                        _ => "none",
                    },
                    FieldKind::Date => "date",
                    FieldKind::Number => "number",
                    FieldKind::Flag => "none",
                };
                let matches = match (expected, value) {
                    ("text", FilterValue::Text(_)) => true,
                    ("date", FilterValue::Date(_)) => true,
                    ("date", FilterValue::ObservationDate) => {
                        if !has_observation_date {
                            return Err(QueryError::MissingObservationDate);
                        }
                        true
                    }
                    ("number", FilterValue::Number(_)) => true,
                    ("none", FilterValue::None) => true,
                    _ => false,
                };
                if !matches {
                    return Err(QueryError::ValueTypeMismatch {
                        field: *field,
                        operator: *operator,
                        expected,
                    });
                }
                Ok(())
            }
        }
    }

    /// Evaluate the tree against one record. The tree must have passed
    /// [`Condition::validate`]; mismatched leaves evaluate to false here
    /// rather than panicking.
    pub fn evaluate(
        &self,
        record: &Record,
        vocab: &Vocabularies,
        observation_date: Option<NaiveDate>,
    ) -> bool {
        match self {
            Condition::Group {
                conjunction,
                negate,
                children,
            } => {
                let result = match conjunction {
                    Conjunction::And => children
                        .iter()
                        .all(|c| c.evaluate(record, vocab, observation_date)),
                    Conjunction::Or => children
                        .iter()
                        .any(|c| c.evaluate(record, vocab, observation_date)),
                };
                result != *negate
            }
            Condition::Leaf {
                field,
                operator,
                value,
            } => evaluate_leaf(*field, *operator, value, record, vocab, observation_date),
        }
    }

    /// Parse one leaf from a `field operator [value]` expression, e.g.
    /// `status is open`, `due on 2025-01-01`, `due on observed`,
    /// `contexts has home`, `projects empty`. Used by the CLI `--filter`
    /// flag; programmatic callers build [`Condition`] values directly.
    pub fn parse_leaf(expr: &str) -> Result<Condition, QueryError> {
        let mut parts = expr.splitn(3, char::is_whitespace);
        let field: Field = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| QueryError::MalformedExpression(expr.to_string()))?
            .parse()?;
        let operator: Operator = parts
            .next()
            .ok_or_else(|| QueryError::MalformedExpression(expr.to_string()))?
            .parse()?;
        let raw_value = parts.next().map(str::trim).filter(|s| !s.is_empty());

        let value = match operator {
            Operator::IsEmpty | Operator::IsNotEmpty | Operator::IsSet | Operator::NotSet => {
                FilterValue::None
            }
            _ => {
                let raw = raw_value
                    .ok_or_else(|| QueryError::MalformedExpression(expr.to_string()))?;
                match field.kind() {
                    FieldKind::Date => {
                        if raw.eq_ignore_ascii_case("observed") {
                            FilterValue::ObservationDate
                        } else {
                            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                                .map(FilterValue::Date)
                                .map_err(|_| QueryError::InvalidValue(raw.to_string()))?
                        }
                    }
                    FieldKind::Number => raw
                        .parse()
                        .map(FilterValue::Number)
                        .map_err(|_| QueryError::InvalidValue(raw.to_string()))?,
                    _ => FilterValue::Text(raw.to_string()),
                }
            }
        };

        Ok(Condition::leaf(field, operator, value))
    }

    /// Whether any leaf resolves against the observation date.
    pub fn references_observation_date(&self) -> bool {
        match self {
            Condition::Leaf { value, .. } => matches!(value, FilterValue::ObservationDate),
            Condition::Group { children, .. } => {
                children.iter().any(|c| c.references_observation_date())
            }
        }
    }
}

fn evaluate_leaf(
    field: Field,
    operator: Operator,
    value: &FilterValue,
    record: &Record,
    vocab: &Vocabularies,
    observation_date: Option<NaiveDate>,
) -> bool {
    match field.kind() {
        FieldKind::Text => {
            let FilterValue::Text(expected) = value else {
                return false;
            };
            let actual = record.title.as_str();
            match operator {
                Operator::Equals => actual.eq_ignore_ascii_case(expected),
                Operator::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
                _ => false,
            }
        }
        FieldKind::Enum => {
            let FilterValue::Text(expected) = value else {
                return false;
            };
            let actual = match field {
                Field::Status => match observation_date {
                    // Date-scoped queries observe the effective status,
                    // which folds in per-date recurrence completion.
                    Some(date) => recurrence::effective_status(record, date, vocab),
                    None => record.status.clone(),
                },
                Field::Priority => record.priority.clone(),
                _ => None,
            };
            let matched = match actual {
                Some(raw) => {
                    let canonical = match field {
                        Field::Status => vocab.canonical_status(&raw),
                        _ => vocab.canonical_priority(&raw),
                    };
                    let expected_canonical = match field {
                        Field::Status => vocab.canonical_status(expected),
                        _ => vocab.canonical_priority(expected),
                    };
                    canonical.eq_ignore_ascii_case(&expected_canonical)
                }
                None => false,
            };
            match operator {
                Operator::Is => matched,
                Operator::IsNot => !matched,
                _ => false,
            }
        }
        FieldKind::Set => {
            let members = match field {
                Field::Tags => &record.tags,
                Field::Contexts => &record.contexts,
                Field::Projects => &record.projects,
                _ => return false,
            };
            match operator {
                Operator::HasMember => match value {
                    FilterValue::Text(member) => Record::set_contains(members, member),
                    _ => false,
                },
                Operator::IsEmpty => members.is_empty(),
                Operator::IsNotEmpty => !members.is_empty(),
                _ => false,
            }
        }
        FieldKind::Date => {
            let target = match value {
                FilterValue::Date(d) => *d,
                FilterValue::ObservationDate => match observation_date {
                    Some(d) => d,
                    None => return false,
                },
                _ => return false,
            };
            if field == Field::Due {
                if let Some(rule) = &record.recurrence {
                    if observation_date.is_some() {
                        return evaluate_recurring_due(rule, operator, target);
                    }
                }
            }
            let actual = match field {
                Field::Due => record.due,
                Field::Scheduled => record.scheduled,
                Field::Created => record.created,
                Field::Modified => record.modified,
                _ => None,
            };
            let Some(actual) = actual else {
                return false;
            };
            compare_dates(actual.date, operator, target)
        }
        FieldKind::Number => {
            let (FilterValue::Number(expected), Some(actual)) = (value, record.time_estimate)
            else {
                return false;
            };
            match operator {
                Operator::NumberEquals => actual == *expected,
                Operator::LessThan => actual < *expected,
                Operator::AtMost => actual <= *expected,
                Operator::GreaterThan => actual > *expected,
                Operator::AtLeast => actual >= *expected,
                _ => false,
            }
        }
        FieldKind::Flag => {
            let actual = match field {
                Field::Archived => record.archived,
                _ => false,
            };
            match operator {
                Operator::IsSet => actual,
                Operator::NotSet => !actual,
                _ => false,
            }
        }
    }
}

/// Date-scoped due comparison on a recurring record: projection, not the
/// literal field. The anchor is the first due date; `last_due` bounds
/// rules with UNTIL.
fn evaluate_recurring_due(rule: &RecurrenceRule, operator: Operator, target: NaiveDate) -> bool {
    let has_any = rule.until.map_or(true, |u| u >= rule.anchor);
    match operator {
        Operator::On => rule.is_due(target),
        Operator::Before => has_any && rule.anchor < target,
        Operator::OnOrBefore => has_any && rule.anchor <= target,
        Operator::After => match rule.until {
            None => true,
            Some(_) => rule.last_due().map_or(false, |last| last > target),
        },
        Operator::OnOrAfter => match rule.until {
            None => true,
            Some(_) => rule.last_due().map_or(false, |last| last >= target),
        },
        _ => false,
    }
}

fn compare_dates(actual: NaiveDate, operator: Operator, target: NaiveDate) -> bool {
    match operator {
        Operator::On => actual == target,
        Operator::Before => actual < target,
        Operator::After => actual > target,
        Operator::OnOrBefore => actual <= target,
        Operator::OnOrAfter => actual >= target,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DateValue;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Record {
        let mut r = Record::new("rent.md", "Pay rent");
        r.status = Some("open".into());
        r.priority = Some("high".into());
        r.tags = vec!["finance".into()];
        r.contexts = vec!["home".into(), "errand".into()];
        r.due = Some(DateValue::date_only(d(2025, 1, 1)));
        r.time_estimate = Some(30);
        r
    }

    fn vocab() -> Vocabularies {
        Vocabularies::default()
    }

    #[test]
    fn test_validate_rejects_operator_mismatch() {
        let cond = Condition::leaf(Field::Title, Operator::Before, FilterValue::Text("x".into()));
        assert!(matches!(
            cond.validate(false),
            Err(QueryError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_value_type_mismatch() {
        let cond = Condition::leaf(Field::Due, Operator::On, FilterValue::Text("soon".into()));
        assert!(matches!(
            cond.validate(false),
            Err(QueryError::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_observation_date_requirement() {
        let cond = Condition::leaf(Field::Due, Operator::On, FilterValue::ObservationDate);
        assert_eq!(
            cond.validate(false),
            Err(QueryError::MissingObservationDate)
        );
        assert!(cond.validate(true).is_ok());
    }

    #[test]
    fn test_empty_groups() {
        let record = sample();
        assert!(Condition::all().evaluate(&record, &vocab(), None));
        assert!(!Condition::or(vec![]).evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_not_negates() {
        let record = sample();
        let open = Condition::leaf(Field::Status, Operator::Is, FilterValue::Text("open".into()));
        assert!(open.evaluate(&record, &vocab(), None));
        assert!(!Condition::not(open).evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_text_contains_case_insensitive() {
        let record = sample();
        let cond = Condition::leaf(
            Field::Title,
            Operator::Contains,
            FilterValue::Text("RENT".into()),
        );
        assert!(cond.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_enum_matches_display_label() {
        let record = sample();
        // "High" is the display label; "high" the canonical value.
        let cond = Condition::leaf(
            Field::Priority,
            Operator::Is,
            FilterValue::Text("High".into()),
        );
        assert!(cond.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_unresolvable_enum_compares_verbatim() {
        let mut record = sample();
        record.status = Some("waiting-on-bank".into());
        let cond = Condition::leaf(
            Field::Status,
            Operator::Is,
            FilterValue::Text("Waiting-On-Bank".into()),
        );
        assert!(cond.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_set_membership_and_empty() {
        let record = sample();
        let has_home = Condition::leaf(
            Field::Contexts,
            Operator::HasMember,
            FilterValue::Text("Home".into()),
        );
        assert!(has_home.evaluate(&record, &vocab(), None));

        let projects_empty =
            Condition::leaf(Field::Projects, Operator::IsEmpty, FilterValue::None);
        assert!(projects_empty.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_literal_due_comparisons() {
        let record = sample();
        let on = Condition::leaf(Field::Due, Operator::On, FilterValue::Date(d(2025, 1, 1)));
        assert!(on.evaluate(&record, &vocab(), None));

        let before = Condition::leaf(
            Field::Due,
            Operator::Before,
            FilterValue::Date(d(2025, 1, 2)),
        );
        assert!(before.evaluate(&record, &vocab(), None));

        let after = Condition::leaf(Field::Due, Operator::After, FilterValue::Date(d(2025, 1, 1)));
        assert!(!after.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_missing_date_field_never_matches() {
        let mut record = sample();
        record.due = None;
        let cond = Condition::leaf(
            Field::Due,
            Operator::OnOrBefore,
            FilterValue::Date(d(2030, 1, 1)),
        );
        assert!(!cond.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_recurring_due_uses_projection_when_date_scoped() {
        let mut record = sample();
        // Weekly on Mondays from 2025-05-05; literal due field says Jan 1.
        record.recurrence =
            Some(RecurrenceRule::parse("FREQ=WEEKLY;DTSTART=20250505", None).unwrap());

        let monday = d(2025, 5, 12);
        let cond = Condition::leaf(Field::Due, Operator::On, FilterValue::ObservationDate);
        assert!(cond.evaluate(&record, &vocab(), Some(monday)));
        assert!(!cond.evaluate(&record, &vocab(), Some(d(2025, 5, 13))));

        // Without an observation date the literal field applies.
        let literal = Condition::leaf(Field::Due, Operator::On, FilterValue::Date(d(2025, 1, 1)));
        assert!(literal.evaluate(&record, &vocab(), None));
    }

    #[test]
    fn test_effective_status_in_date_scoped_query() {
        let mut record = sample();
        record.recurrence =
            Some(RecurrenceRule::parse("FREQ=DAILY;DTSTART=20250101", None).unwrap());
        record.complete_instances.insert(d(2025, 1, 2));

        let is_done =
            Condition::leaf(Field::Status, Operator::Is, FilterValue::Text("done".into()));
        assert!(is_done.evaluate(&record, &vocab(), Some(d(2025, 1, 2))));
        assert!(!is_done.evaluate(&record, &vocab(), Some(d(2025, 1, 3))));
    }

    #[test]
    fn test_parse_leaf_expressions() {
        assert_eq!(
            Condition::parse_leaf("status is open").unwrap(),
            Condition::leaf(Field::Status, Operator::Is, FilterValue::Text("open".into()))
        );
        assert_eq!(
            Condition::parse_leaf("due on 2025-01-01").unwrap(),
            Condition::leaf(Field::Due, Operator::On, FilterValue::Date(d(2025, 1, 1)))
        );
        assert_eq!(
            Condition::parse_leaf("due on observed").unwrap(),
            Condition::leaf(Field::Due, Operator::On, FilterValue::ObservationDate)
        );
        assert_eq!(
            Condition::parse_leaf("projects empty").unwrap(),
            Condition::leaf(Field::Projects, Operator::IsEmpty, FilterValue::None)
        );
        assert_eq!(
            Condition::parse_leaf("title contains pay rent").unwrap(),
            Condition::leaf(
                Field::Title,
                Operator::Contains,
                FilterValue::Text("pay rent".into())
            )
        );
    }

    #[test]
    fn test_parse_leaf_errors() {
        assert!(matches!(
            Condition::parse_leaf("flavor is sweet"),
            Err(QueryError::UnknownField(_))
        ));
        assert!(matches!(
            Condition::parse_leaf("status resembles open"),
            Err(QueryError::UnknownOperator(_))
        ));
        assert!(matches!(
            Condition::parse_leaf("due on someday"),
            Err(QueryError::InvalidValue(_))
        ));
        assert!(matches!(
            Condition::parse_leaf("status is"),
            Err(QueryError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_number_and_flag_leaves() {
        let record = sample();
        let cond = Condition::leaf(
            Field::TimeEstimate,
            Operator::AtMost,
            FilterValue::Number(30),
        );
        assert!(cond.evaluate(&record, &vocab(), None));

        let not_archived = Condition::leaf(Field::Archived, Operator::NotSet, FilterValue::None);
        assert!(not_archived.evaluate(&record, &vocab(), None));
    }
}
