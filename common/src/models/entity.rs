//! Entity description shared by every stored model.
//!
//! A model declares its table shape once ([`TableSchema`]) and converts itself
//! to and from column values. SQL rendering lives with the data mapper.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;

/// Logical column type, rendered per backend by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer.
    BigInt,
    /// Boolean persisted as 0/1.
    Bool,
    /// Short text (names, emails, hashes).
    Text,
    /// Instant persisted as RFC 3339 text.
    Timestamp,
    /// Calendar date persisted as `YYYY-MM-DD`.
    Date,
}

/// One declared column, excluding the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// How a table's primary key gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Generated by the database on insert.
    AutoIncrement,
    /// Supplied by the caller (lookup tables keyed by enum value).
    Natural,
}

/// Declared shape of a model's table.
#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub key: &'static str,
    pub key_kind: KeyKind,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Finds a declared column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A value bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Bool(bool),
    Text(Option<String>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Text(Some(v.to_rfc3339()))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Text(v.map(|d| d.to_rfc3339()))
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Text(Some(v.format("%Y-%m-%d").to_string()))
    }
}

/// A model stored through the data mapper.
pub trait Entity: Sized + Send + Sync + Unpin {
    /// Model identifier used by resolvers and the model catalog.
    const MODEL: &'static str;

    fn schema() -> &'static TableSchema;

    /// Primary key, `None` until the row has been inserted.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Values for `schema().columns`, in declaration order.
    fn values(&self) -> Vec<SqlValue>;

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error>;
}

fn decode_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub fn get_bool(row: &AnyRow, column: &str) -> Result<bool, sqlx::Error> {
    Ok(row.try_get::<i64, _>(column)? != 0)
}

pub fn get_datetime(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| decode_error(column, e))
}

pub fn get_opt_datetime(row: &AnyRow, column: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| decode_error(column, e))
    })
    .transpose()
}

pub fn get_date(row: &AnyRow, column: &str) -> Result<NaiveDate, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| decode_error(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_value_is_rfc3339() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            SqlValue::from(at),
            SqlValue::Text(Some("2024-05-01T12:30:00+00:00".to_string()))
        );
    }

    #[test]
    fn test_date_value_format() {
        let day = NaiveDate::from_ymd_opt(1994, 2, 3).unwrap();
        assert_eq!(SqlValue::from(day), SqlValue::Text(Some("1994-02-03".into())));
    }
}
