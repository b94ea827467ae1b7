//! PostgreSQL adapter for [`RecordStore`].
//!
//! All collections live in the single `records` table (see
//! `migrations/`); a flat dotted key wins over the nested path
//! `fields #>> path`, as in [`Record::get`]. Natural collection order is
//! `seq`. Text compares bytewise (`COLLATE "C"`) and timestamps are only
//! cast after a pattern check, so malformed values never fail a query.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::StoreError;
use crate::store::{value_text, Aggregate, Filter, OrderBy, Query, Record, RecordStore};

/// Columns returned for row queries.
const SELECT_ROWS: &str = "SELECT sys_id, fields FROM records";

/// Pattern a text value must match to be ordered numerically.
const NUMERIC_PATTERN: &str = r"^\s*-?[0-9]+(\.[0-9]+)?\s*$";

/// Store display format, `2024-03-01 08:00:00`, read as UTC.
const STORE_TIMESTAMP_PATTERN: &str = concat!(
    r"^\s*[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])",
    r" ([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]\s*$",
);

/// RFC 3339 with an explicit offset.
const RFC3339_PATTERN: &str = concat!(
    r"^\s*[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])",
    r"[Tt ]([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9](\.[0-9]+)?",
    r"([Zz]|[+-]([01][0-9]|2[0-3]):[0-5][0-9])\s*$",
);

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ROWS);
        push_where(&mut qb, collection, &query.filters);
        push_order(&mut qb, &query.order_by);
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(to_i64(limit));
        }
        if query.offset > 0 {
            qb.push(" OFFSET ").push_bind(to_i64(query.offset));
        }

        let rows = qb
            .build_query_as::<(String, Value)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(collection, e))?;

        tracing::debug!(collection, rows = rows.len(), "Record query");

        Ok(rows
            .into_iter()
            .map(|(sys_id, fields)| into_record(sys_id, fields))
            .collect())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM records");
        push_where(&mut qb, collection, filters);
        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database(collection, e))?;
        Ok(count.max(0) as u64)
    }

    async fn aggregate(
        &self,
        collection: &str,
        filters: &[Filter],
        function: &Aggregate,
    ) -> Result<Option<Value>, StoreError> {
        match function {
            Aggregate::Count => {
                let count = self.count(collection, filters).await?;
                Ok(Some(Value::from(count)))
            }
            Aggregate::Max(field) => {
                // Timestamps rank above other text, then bytewise order.
                let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
                push_field(&mut qb, field);
                qb.push(" FROM records");
                push_where(&mut qb, collection, filters);
                qb.push(" AND btrim(");
                push_field(&mut qb, field);
                qb.push(") <> '' ORDER BY ");
                push_timestamp(&mut qb, field);
                qb.push(" DESC NULLS LAST, ");
                push_field(&mut qb, field);
                qb.push(" COLLATE \"C\" DESC LIMIT 1");
                let max = qb
                    .build_query_scalar::<Option<String>>()
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::database(collection, e))?;
                Ok(max.flatten().map(Value::String))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SQL helpers
// ---------------------------------------------------------------------------

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn into_record(sys_id: String, fields: Value) -> Record {
    let mut record = Record::from_value(fields).unwrap_or_default();
    if record.sys_id().is_none() {
        record.insert(wfcat_core::collections::FIELD_SYS_ID, Value::String(sys_id));
    }
    record
}

/// Push the text value of a dotted field path.
fn push_field(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    let path: Vec<String> = field.split('.').map(str::to_string).collect();
    qb.push("COALESCE(fields ->> ")
        .push_bind(field.to_string())
        .push(", fields #>> ")
        .push_bind(path)
        .push(")");
}

/// Push a field as `timestamptz`, NULL unless it looks like a timestamp
/// `parse_timestamp` accepts.
fn push_timestamp(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(CASE WHEN ");
    push_field(qb, field);
    qb.push(" ~ ")
        .push_bind(STORE_TIMESTAMP_PATTERN)
        .push(" THEN (btrim(");
    push_field(qb, field);
    qb.push(")::timestamp AT TIME ZONE 'UTC') WHEN ");
    push_field(qb, field);
    qb.push(" ~ ").push_bind(RFC3339_PATTERN).push(" THEN btrim(");
    push_field(qb, field);
    qb.push(")::timestamptz END)");
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filters: &[Filter]) {
    qb.push(" WHERE collection = ").push_bind(collection.to_string());

    for filter in filters {
        qb.push(" AND ");
        match filter {
            Filter::Eq { field, value } => match value_text(value) {
                Some(expected) => {
                    push_field(qb, field);
                    qb.push(" = ").push_bind(expected);
                }
                None => {
                    qb.push("FALSE");
                }
            },
            Filter::Contains { field, needle } => {
                qb.push("strpos(");
                push_field(qb, field);
                qb.push(", ").push_bind(needle.clone()).push(") > 0");
            }
            Filter::ContainsAny { field, needles } => {
                if needles.is_empty() {
                    qb.push("FALSE");
                    continue;
                }
                qb.push("(");
                for (i, needle) in needles.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("strpos(");
                    push_field(qb, field);
                    qb.push(", ").push_bind(needle.clone()).push(") > 0");
                }
                qb.push(")");
            }
            Filter::Before { field, instant } => {
                push_timestamp(qb, field);
                qb.push(" < ").push_bind(*instant);
            }
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order_by: &[OrderBy]) {
    qb.push(" ORDER BY ");
    for order in order_by {
        if order.numeric {
            qb.push("CASE WHEN ");
            push_field(qb, &order.field);
            qb.push(" ~ ").push_bind(NUMERIC_PATTERN).push(" THEN trim(");
            push_field(qb, &order.field);
            qb.push(")::numeric END");
        } else {
            push_field(qb, &order.field);
            qb.push(" COLLATE \"C\"");
        }
        if order.descending {
            qb.push(" DESC NULLS LAST, ");
        } else {
            qb.push(" ASC NULLS FIRST, ");
        }
    }
    qb.push("seq ASC");
}
