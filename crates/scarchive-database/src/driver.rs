// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database driver abstraction
//!
//! Defines the interface a relational backend offers to the archive:
//! statements with bound parameters, forward-only row cursors and
//! explicit transactions.

use anyhow::Result;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Surrogate object id assigned by the database.
pub type Oid = i64;

/// Oid of objects not stored (yet).
pub const INVALID_OID: Oid = 0;

/// A column value as exchanged with the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form of the value, `None` for NULL.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Integer(v) => Some(Cow::Owned(v.to_string())),
            Self::Real(v) => Some(Cow::Owned(v.to_string())),
            Self::Text(v) => Some(Cow::Borrowed(v)),
            Self::Blob(v) => Some(String::from_utf8_lossy(v)),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// One fetched row. Column names are shared by all rows of a cursor.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Value of the column called `name`. Lookups are case-insensitive,
    /// as SQL identifiers are; the first match wins.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Value at `index`.
    pub fn value(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Forward-only result of a query.
pub trait RowCursor: Send {
    /// Column names of the result set.
    fn columns(&self) -> &[String];

    /// Next row, `None` once exhausted.
    fn fetch_row(&mut self) -> Result<Option<Row>>;

    /// Release the query early. Later fetches return `None`.
    fn close(&mut self);
}

/// Relational backend used by the database archive
///
/// Parameters bind positionally to `?` placeholders.
///
/// # Implementations
///
/// - `SqliteDriver` -- bundled SQLite, file or in-memory
pub trait DatabaseDriver: Send + Sync {
    /// Run a statement and return the number of changed rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Run a query and return its cursor. Rows come in the order the
    /// query asks for.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn RowCursor>>;

    /// Run a query whose rows may be delivered in ascending `_oid` order,
    /// whatever its own ordering. Drivers may fetch such results lazily.
    fn query_by_oid(&self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn RowCursor>> {
        self.query(sql, params)
    }

    /// Row id generated by the last successful insert
    fn last_insert_id(&self) -> Result<Oid>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Quote `text` for use inside a single-quoted SQL literal
    fn escape(&self, text: &str) -> String {
        text.replace('\'', "''")
    }

    /// Prefix added to attribute column names
    fn column_prefix(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_forms() {
        assert_eq!(SqlValue::Null.to_text(), None);
        assert_eq!(SqlValue::Integer(-4).to_text().as_deref(), Some("-4"));
        assert_eq!(SqlValue::Real(52.375).to_text().as_deref(), Some("52.375"));
        assert_eq!(SqlValue::from("P").to_text().as_deref(), Some("P"));
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::from(" 12 ").as_i64(), Some(12));
        assert_eq!(SqlValue::Real(1.0).as_i64(), None);
    }

    #[test]
    fn test_row_lookup_ignores_case() {
        let columns: Arc<[String]> = vec!["_oid".to_string(), "publicID".to_string()].into();
        let row = Row::new(columns, vec![SqlValue::Integer(7), SqlValue::from("Pick/1")]);

        assert_eq!(row.get("PUBLICID"), Some(&SqlValue::from("Pick/1")));
        assert_eq!(row.get("_oid").and_then(SqlValue::as_i64), Some(7));
        assert!(row.get("missing").is_none());
        assert_eq!(row.len(), 2);
        assert_eq!(row.value(1), row.get("publicID"));
    }

    #[test]
    fn test_default_escape() {
        struct Nothing;
        impl DatabaseDriver for Nothing {
            fn execute(&self, _: &str, _: &[SqlValue]) -> Result<usize> {
                Ok(0)
            }
            fn query(&self, _: &str, _: &[SqlValue]) -> Result<Box<dyn RowCursor>> {
                anyhow::bail!("no queries")
            }
            fn last_insert_id(&self) -> Result<Oid> {
                Ok(INVALID_OID)
            }
            fn begin(&self) -> Result<()> {
                Ok(())
            }
            fn commit(&self) -> Result<()> {
                Ok(())
            }
            fn rollback(&self) -> Result<()> {
                Ok(())
            }
        }

        assert_eq!(Nothing.escape("it's"), "it''s");
        assert_eq!(Nothing.column_prefix(), "");
    }
}
