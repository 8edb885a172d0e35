//! Column codecs shared by the repositories.
//!
//! Ids are stored as UUID text, timestamps as microseconds since the epoch,
//! enums as their wire names.

use std::str::FromStr;

use chrono::DateTime;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use medinfra_domain::error::ValidationError;
use medinfra_domain::time::Timestamp;

fn decode<E: std::error::Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn micros(at: Timestamp) -> i64 {
    at.timestamp_micros()
}

fn from_micros(value: i64) -> Result<Timestamp, sqlx::Error> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| decode(ValidationError::InvalidTimestamp(value.to_string())))
}

pub(crate) fn id<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = uuid::Error>,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(decode)
}

pub(crate) fn opt_id<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = uuid::Error>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|raw| T::from_str(&raw).map_err(decode)).transpose()
}

pub(crate) fn timestamp(row: &SqliteRow, column: &str) -> Result<Timestamp, sqlx::Error> {
    from_micros(row.try_get(column)?)
}

pub(crate) fn opt_timestamp(row: &SqliteRow, column: &str) -> Result<Option<Timestamp>, sqlx::Error> {
    let raw: Option<i64> = row.try_get(column)?;
    raw.map(from_micros).transpose()
}

/// A column holding an enum's wire name.
pub(crate) fn parsed<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ValidationError>,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(decode)
}

/// Clamp a row cap to what `LIMIT` accepts.
pub(crate) fn limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
