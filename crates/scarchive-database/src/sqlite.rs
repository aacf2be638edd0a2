// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite database driver
//!
//! Bundled SQLite behind the [`DatabaseDriver`] interface, file-based or
//! in-memory.

use crate::config::DatabaseConfig;
use crate::driver::{DatabaseDriver, Oid, Row, RowCursor, SqlValue};
use crate::schema;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::collections::VecDeque;
use std::sync::Arc;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Self::Integer(v) => ToSqlOutput::Owned(SqliteValue::Integer(*v)),
            Self::Real(v) => ToSqlOutput::Owned(SqliteValue::Real(*v)),
            Self::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Self::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

/// SQLite driver
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync). Cursors
/// share the connection and only hold the lock while fetching.
///
/// [`query`](DatabaseDriver::query) buffers the complete result and keeps
/// the order of the statement. [`query_by_oid`](DatabaseDriver::query_by_oid)
/// reads results carrying an `_oid` column through keyset-paged cursors:
/// pages of `page_size` rows ordered by `_oid` are fetched on demand, so
/// other statements may run between two pages.
pub struct SqliteDriver {
    conn: Arc<Mutex<Connection>>,
    column_prefix: String,
    page_size: usize,
}

impl SqliteDriver {
    /// Open the database named by `config`, creating the schema when asked
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = if config.is_memory() {
            Connection::open_in_memory().context("Failed to create in-memory SQLite database")?
        } else {
            Connection::open(&config.source).with_context(|| {
                format!("Failed to open SQLite database at {}", config.source)
            })?
        };

        let driver = Self {
            conn: Arc::new(Mutex::new(conn)),
            column_prefix: config.column_prefix.clone(),
            page_size: config.page_size.max(1),
        };
        if config.create_schema {
            driver.init_schema()?;
        }
        tracing::debug!("[sqlite] opened {}", config.source);
        Ok(driver)
    }

    /// Create an in-memory database with the default configuration
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::default())
    }

    /// Initialize database schema
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        for statement in schema::statements(&self.column_prefix) {
            conn.execute(&statement, [])
                .with_context(|| format!("Failed to create schema: {}", statement))?;
        }
        Ok(())
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl DatabaseDriver for SqliteDriver {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(sql, params_from_iter(params.iter()))
            .with_context(|| format!("Failed to execute: {}", sql))?;
        Ok(changed)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn RowCursor>> {
        let conn = self.conn.lock();
        let columns = column_names(&conn, sql)?;
        let rows = fetch_all(&conn, sql, params, &columns)?;
        Ok(Box::new(BufferedCursor {
            columns,
            rows: rows.into(),
        }))
    }

    fn query_by_oid(&self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn RowCursor>> {
        let columns = column_names(&self.conn.lock(), sql)?;
        if !columns.iter().any(|c| c == "_oid") {
            return self.query(sql, params);
        }
        Ok(Box::new(PagedCursor {
            conn: self.conn.clone(),
            sql: sql.to_string(),
            params: params.to_vec(),
            columns,
            page: VecDeque::new(),
            last_oid: None,
            page_size: self.page_size,
            done: false,
        }))
    }

    fn last_insert_id(&self) -> Result<Oid> {
        Ok(self.conn.lock().last_insert_rowid())
    }

    fn begin(&self) -> Result<()> {
        self.conn.lock().execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.conn.lock().execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.conn.lock().execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn column_prefix(&self) -> &str {
        &self.column_prefix
    }
}

fn convert(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
    }
}

fn column_names(conn: &Connection, sql: &str) -> Result<Arc<[String]>> {
    let stmt = conn
        .prepare(sql)
        .with_context(|| format!("Failed to prepare: {}", sql))?;
    let columns = stmt.column_names().into_iter().map(str::to_string).collect();
    Ok(columns)
}

fn fetch_all(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    columns: &Arc<[String]>,
) -> Result<Vec<Row>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("Failed to prepare: {}", sql))?;
    let width = columns.len();
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(convert))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .map(|values| values.map(|values| Row::new(columns.clone(), values)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

struct BufferedCursor {
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
}

impl RowCursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.rows.clear();
    }
}

struct PagedCursor {
    conn: Arc<Mutex<Connection>>,
    sql: String,
    params: Vec<SqlValue>,
    columns: Arc<[String]>,
    page: VecDeque<Row>,
    last_oid: Option<Oid>,
    page_size: usize,
    done: bool,
}

impl PagedCursor {
    fn fetch_page(&mut self) -> Result<()> {
        let mut params = self.params.clone();
        let sql = match self.last_oid {
            None => format!(
                "SELECT * FROM ({}) ORDER BY _oid LIMIT {}",
                self.sql, self.page_size
            ),
            Some(oid) => {
                params.push(SqlValue::Integer(oid));
                format!(
                    "SELECT * FROM ({}) WHERE _oid > ? ORDER BY _oid LIMIT {}",
                    self.sql, self.page_size
                )
            }
        };

        let rows = {
            let conn = self.conn.lock();
            fetch_all(&conn, &sql, &params, &self.columns)?
        };
        if rows.len() < self.page_size {
            self.done = true;
        }
        if let Some(oid) = rows.last().and_then(|r| r.get("_oid")).and_then(SqlValue::as_i64) {
            self.last_oid = Some(oid);
        } else {
            self.done = true;
        }
        self.page.extend(rows);
        Ok(())
    }
}

impl RowCursor for PagedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_row(&mut self) -> Result<Option<Row>> {
        if self.page.is_empty() && !self.done {
            self.fetch_page()?;
        }
        Ok(self.page.pop_front())
    }

    fn close(&mut self) {
        self.page.clear();
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(page_size: usize) -> SqliteDriver {
        let config = DatabaseConfig::builder().page_size(page_size).build();
        SqliteDriver::open(&config).unwrap()
    }

    fn insert_objects(driver: &SqliteDriver, count: i64) {
        for i in 0..count {
            driver
                .execute("INSERT INTO Object (_timestamp) VALUES (?)", &[SqlValue::from("now")])
                .unwrap();
            assert_eq!(driver.last_insert_id().unwrap(), i + 1);
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let driver = driver(8);
        driver.init_schema().unwrap();

        let mut cursor = driver
            .query("SELECT value FROM Meta WHERE name = ?", &[SqlValue::from("Schema-Version")])
            .unwrap();
        let row = cursor.fetch_row().unwrap().unwrap();
        assert_eq!(row.get("value"), Some(&SqlValue::from("0.13")));
        assert!(cursor.fetch_row().unwrap().is_none());
    }

    #[test]
    fn test_paged_cursor_walks_all_pages() {
        let driver = driver(3);
        insert_objects(&driver, 10);

        let mut cursor = driver.query_by_oid("SELECT _oid FROM Object", &[]).unwrap();
        let mut seen = Vec::new();
        while let Some(row) = cursor.fetch_row().unwrap() {
            seen.push(row.get("_oid").and_then(SqlValue::as_i64).unwrap());
            if seen.len() == 4 {
                driver
                    .execute("INSERT INTO Object (_timestamp) VALUES (NULL)", &[])
                    .unwrap();
            }
        }
        assert_eq!(seen, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn test_close_ends_cursor() {
        let driver = driver(2);
        insert_objects(&driver, 5);

        let mut cursor = driver.query_by_oid("SELECT * FROM Object", &[]).unwrap();
        assert!(cursor.fetch_row().unwrap().is_some());
        cursor.close();
        assert!(cursor.fetch_row().unwrap().is_none());
    }

    #[test]
    fn test_query_keeps_statement_order() {
        let driver = driver(2);
        insert_objects(&driver, 3);

        let mut cursor = driver
            .query("SELECT _oid FROM Object ORDER BY _oid DESC", &[])
            .unwrap();
        let mut seen = Vec::new();
        while let Some(row) = cursor.fetch_row().unwrap() {
            seen.push(row.get("_oid").and_then(SqlValue::as_i64).unwrap());
        }
        assert_eq!(seen, [3, 2, 1]);
    }

    #[test]
    fn test_buffered_cursor_without_oid() {
        let driver = driver(2);
        insert_objects(&driver, 5);

        let mut cursor = driver.query("SELECT count(*) AS n FROM Object", &[]).unwrap();
        assert_eq!(cursor.columns(), ["n".to_string()]);
        let row = cursor.fetch_row().unwrap().unwrap();
        assert_eq!(row.get("n"), Some(&SqlValue::Integer(5)));
        assert!(cursor.fetch_row().unwrap().is_none());
    }

    #[test]
    fn test_rollback_discards_changes() {
        let driver = driver(4);
        driver.begin().unwrap();
        insert_objects(&driver, 2);
        driver.rollback().unwrap();

        let mut cursor = driver.query("SELECT count(*) AS n FROM Object", &[]).unwrap();
        let row = cursor.fetch_row().unwrap().unwrap();
        assert_eq!(row.get("n").and_then(SqlValue::as_i64), Some(0));
    }

    #[test]
    fn test_bad_sql_is_an_error() {
        let driver = driver(4);
        assert!(driver.query("SELECT * FROM Nowhere", &[]).is_err());
        assert!(driver.execute("DELETE FROM Nowhere", &[]).is_err());
    }
}
