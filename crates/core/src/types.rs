use chrono::{NaiveDateTime, TimeZone, Utc};

/// Record identifiers are opaque strings assigned by the record store.
pub type SysId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Format used by the record store for `sys_created_on` style columns.
const STORE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp as stored in a record.
///
/// Accepts RFC 3339 (`2024-03-01T08:00:00Z`) and the store's display
/// format (`2024-03-01 08:00:00`, interpreted as UTC). Returns `None` for
/// empty or unparseable input.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, STORE_DATETIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
