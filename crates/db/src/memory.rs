//! In-process [`RecordStore`] for tests and fixture-driven dry runs.
//!
//! Collections keep insertion order as their natural order. Individual
//! collections can be switched to "unavailable" to exercise partial-failure
//! handling, and every call is tallied so callers can assert which access
//! path (row query vs count) was used.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use wfcat_core::types::parse_timestamp;

use crate::error::StoreError;
use crate::store::{Aggregate, Filter, Query, Record, RecordStore};

/// Kind of store call, for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Query,
    Count,
    Aggregate,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    unavailable: RwLock<HashSet<String>>,
    calls: RwLock<HashMap<(String, CallKind), usize>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections from a JSON fixture of the form
    /// `{"collection": [{...record...}, ...], ...}`.
    pub fn from_fixture(fixture: Value) -> Result<Self, StoreError> {
        let Value::Object(collections) = fixture else {
            return Err(StoreError::Fixture(
                "fixture root must be an object of collections".to_string(),
            ));
        };
        let store = Self::new();
        for (collection, rows) in collections {
            let Value::Array(rows) = rows else {
                return Err(StoreError::Fixture(format!(
                    "collection '{collection}' must be an array of records"
                )));
            };
            for (i, row) in rows.into_iter().enumerate() {
                let record = Record::from_value(row).ok_or_else(|| {
                    StoreError::Fixture(format!("record {i} of '{collection}' is not an object"))
                })?;
                store.insert(&collection, record);
            }
        }
        Ok(store)
    }

    pub fn insert(&self, collection: &str, record: Record) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    /// Builder form of [`insert`](Self::insert) for JSON object literals.
    ///
    /// Non-object values are ignored.
    pub fn with_records<I>(self, collection: &str, records: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        for record in records.into_iter().filter_map(Record::from_value) {
            self.insert(collection, record);
        }
        self
    }

    /// Make every call against `collection` fail until restored.
    pub fn fail_collection(&self, collection: &str) {
        self.unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.to_string());
    }

    pub fn restore_collection(&self, collection: &str) {
        self.unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection);
    }

    /// Number of calls of `kind` issued against `collection`.
    pub fn calls(&self, collection: &str, kind: CallKind) -> usize {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(collection.to_string(), kind))
            .copied()
            .unwrap_or(0)
    }

    fn begin(&self, collection: &str, kind: CallKind) -> Result<(), StoreError> {
        *self
            .calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((collection.to_string(), kind))
            .or_default() += 1;

        let unavailable = self
            .unavailable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(collection);
        if unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.to_string(),
                reason: "collection marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn matching(&self, collection: &str, filters: &[Filter]) -> Vec<Record> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filters.iter().all(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.begin(collection, CallKind::Query)?;

        let mut rows = self.matching(collection, &query.filters);
        // Stable sort keeps natural order for ties.
        rows.sort_by(|a, b| {
            query
                .order_by
                .iter()
                .map(|o| o.compare(a, b))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        self.begin(collection, CallKind::Count)?;
        Ok(self.matching(collection, filters).len() as u64)
    }

    async fn aggregate(
        &self,
        collection: &str,
        filters: &[Filter],
        function: &Aggregate,
    ) -> Result<Option<Value>, StoreError> {
        self.begin(collection, CallKind::Aggregate)?;
        let rows = self.matching(collection, filters);
        match function {
            Aggregate::Count => Ok(Some(Value::from(rows.len() as u64))),
            // Timestamps rank above other text, then bytewise order.
            Aggregate::Max(field) => Ok(rows
                .iter()
                .filter_map(|r| r.text(field))
                .filter(|v| !v.trim().is_empty())
                .max_by_key(|v| (parse_timestamp(v), v.clone()))
                .map(Value::String)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
