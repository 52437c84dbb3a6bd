//! Column encoding helpers

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;

/// Unix seconds to a timestamp
pub(crate) fn timestamp(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", secs).into(),
        )
    })
}

/// Optional unix seconds to an optional timestamp
pub(crate) fn opt_timestamp(idx: usize, secs: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    secs.map(|secs| timestamp(idx, secs)).transpose()
}

/// JSON text to a value
pub(crate) fn json<T: DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a JSON text column
pub(crate) fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    json(idx, &text)
}

/// Read a unix-seconds column
pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    timestamp(idx, row.get(idx)?)
}

/// Read a nullable unix-seconds column
pub(crate) fn opt_timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    opt_timestamp(idx, row.get(idx)?)
}
