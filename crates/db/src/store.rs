//! Read-only access to named record collections.
//!
//! [`RecordStore`] is the only seam between the catalog and the storage
//! backend. Queries are expressed with a small filter model ([`Filter`],
//! [`OrderBy`], [`Query`]) that every adapter must interpret identically:
//! field paths are dotted (`variable.name`), text matching is
//! case-sensitive, and rows without an explicit ordering come back in the
//! collection's natural (insertion) order.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wfcat_core::collections::FIELD_SYS_ID;
use wfcat_core::types::{parse_timestamp, Timestamp};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One row of a collection: a JSON object of field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Look up a field by dotted path.
    ///
    /// A flat key equal to the full path wins over a nested walk, so both
    /// `{"variable.name": ..}` and `{"variable": {"name": ..}}` resolve.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Field rendered as text; `None` when absent or null.
    pub fn text(&self, path: &str) -> Option<String> {
        self.get(path).and_then(value_text)
    }

    /// Field rendered as text, empty when absent.
    pub fn text_or_empty(&self, path: &str) -> String {
        self.text(path).unwrap_or_default()
    }

    /// Non-blank text field.
    pub fn non_blank(&self, path: &str) -> Option<String> {
        self.text(path).filter(|s| !s.trim().is_empty())
    }

    pub fn sys_id(&self) -> Option<String> {
        self.non_blank(FIELD_SYS_ID)
    }

    /// Boolean field; accepts JSON booleans and `"true"` / `"false"`.
    pub fn flag(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    /// Integer field; accepts JSON numbers and numeric strings.
    pub fn integer(&self, path: &str) -> Option<i64> {
        match self.get(path)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn timestamp(&self, path: &str) -> Option<Timestamp> {
        self.text(path).as_deref().and_then(parse_timestamp)
    }
}

/// Text form of a scalar JSON value, as the store compares it.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Query model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field text equals the value's text form.
    Eq { field: String, value: Value },
    /// Field text contains the needle.
    Contains { field: String, needle: String },
    /// Field text contains at least one of the needles.
    ContainsAny { field: String, needles: Vec<String> },
    /// Field parses as a timestamp strictly earlier than `instant`.
    Before { field: String, instant: Timestamp },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn contains_any<I, S>(field: impl Into<String>, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ContainsAny {
            field: field.into(),
            needles: needles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn before(field: impl Into<String>, instant: Timestamp) -> Self {
        Self::Before {
            field: field.into(),
            instant,
        }
    }

    /// Evaluate the filter against a record in process.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { field, value } => match (record.text(field), value_text(value)) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => false,
            },
            Self::Contains { field, needle } => record
                .text(field)
                .is_some_and(|text| text.contains(needle.as_str())),
            Self::ContainsAny { field, needles } => record.text(field).is_some_and(|text| {
                needles.iter().any(|needle| text.contains(needle.as_str()))
            }),
            Self::Before { field, instant } => record
                .timestamp(field)
                .is_some_and(|ts| ts < *instant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
    /// Compare numerically instead of as text.
    pub numeric: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
            numeric: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            descending: true,
            ..Self::asc(field)
        }
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Compare two records by this key. Missing values sort first.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = if self.numeric {
            let a = a.text(&self.field).and_then(|s| s.trim().parse::<f64>().ok());
            let b = b.text(&self.field).and_then(|s| s.trim().parse::<f64>().ok());
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        } else {
            a.text(&self.field).cmp(&b.text(&self.field))
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// A bounded or unbounded row query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Aggregate function evaluated by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    /// Largest value of a field; timestamps compare chronologically.
    Max(String),
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Read-only access to a record-oriented data store.
///
/// Implementations own their connection handling and rate limiting; the
/// catalog shares one store across concurrent tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch rows matching `query`.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError>;

    /// Count matching rows without materializing them.
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Evaluate an aggregate over matching rows.
    ///
    /// Returns `None` when there are no rows to aggregate (never for
    /// `Count`, which yields zero).
    async fn aggregate(
        &self,
        collection: &str,
        filters: &[Filter],
        function: &Aggregate,
    ) -> Result<Option<Value>, StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
