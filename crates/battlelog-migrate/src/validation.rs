//! Record-local validation
//!
//! [`validate`] never looks at other records or the store. It reports one
//! [`FieldError`] per invalid field, in a fixed field order per kind, and an
//! empty list means the record passes.

use battlelog_common::types::{BattleResult, BattleType, Rank, RecordKind, Turn};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static CANONICAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

pub const FUTURE_DATE_MESSAGE: &str = "date cannot be in the future";

/// One field-level diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate one record of `kind`. Dates after `today` are rejected.
pub fn validate(kind: RecordKind, record: &Value, today: NaiveDate) -> Vec<FieldError> {
    let Value::Object(fields) = record else {
        return vec![FieldError::new("record", "record must be an object")];
    };

    let mut check = Checker::new(fields);
    check.optional_string("id");

    match kind {
        RecordKind::DeckMaster => {
            check.required_string("className");
            check.required_string("deckName");
            check.optional_integer("season");
        },
        RecordKind::MyDeck => {
            check.required_string("deckId");
            check.required_string("deckName");
            check.optional_string("deckCode");
            check.optional_bool("isArchived");
            check.optional_string("userId");
        },
        RecordKind::BattleLog => {
            check.date("date", today);
            check.closed("battleType", BattleType::ALL);
            check.closed("rank", Rank::ALL);
            check.required_string_or_alias("groupName", "group");
            check.required_string("myDeckId");
            check.closed("turn", Turn::ALL);
            check.closed("result", BattleResult::ALL);
            check.required_string("opponentDeckId");
            check.optional_string("userId");
        },
    }

    check.errors
}

struct Checker<'a> {
    fields: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &str, message: String) {
        self.errors.push(FieldError::new(field, message));
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Present, a string and non-empty after trimming.
    fn string_value(&mut self, field: &str, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::String(s) if s.trim().is_empty() => {
                self.fail(field, format!("{} must not be empty", field));
                None
            },
            Value::String(s) => Some(s.as_str()),
            _ => {
                self.fail(field, format!("{} must be a string", field));
                None
            },
        }
    }

    fn required_string(&mut self, field: &str) -> Option<&'a str> {
        match self.present(field) {
            Some(value) => self.string_value(field, value),
            None => {
                self.fail(field, format!("{} is required", field));
                None
            },
        }
    }

    fn required_string_or_alias(&mut self, field: &str, alias: &str) {
        match self.present(field).or_else(|| self.present(alias)) {
            Some(value) => {
                self.string_value(field, value);
            },
            None => self.fail(field, format!("{} is required", field)),
        }
    }

    fn optional_string(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            self.string_value(field, value);
        }
    }

    fn optional_integer(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            if value.as_i64().is_none() {
                self.fail(field, format!("{} must be an integer", field));
            }
        }
    }

    fn optional_bool(&mut self, field: &str) {
        if let Some(value) = self.present(field) {
            if !value.is_boolean() {
                self.fail(field, format!("{} must be a boolean", field));
            }
        }
    }

    fn closed<T: fmt::Display>(&mut self, field: &str, allowed: &[T]) {
        let Some(text) = self.required_string(field) else {
            return;
        };
        if !allowed.iter().any(|v| v.to_string() == text) {
            let labels: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            self.fail(field, format!("{} must be one of: {}", field, labels.join(", ")));
        }
    }

    fn date(&mut self, field: &str, today: NaiveDate) {
        let Some(text) = self.required_string(field) else {
            return;
        };
        if !CANONICAL_DATE.is_match(text) {
            self.fail(field, format!("{} must be in YYYY-MM-DD format", field));
            return;
        }
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) if date > today => self.fail(field, FUTURE_DATE_MESSAGE.to_string()),
            Ok(_) => {},
            Err(_) => self.fail(field, format!("{} is not a valid calendar date", field)),
        }
    }
}
