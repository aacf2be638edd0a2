// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming object iterator over a query result
//!
//! Rows are fetched and turned into objects one at a time. Copies of an
//! iterator share the same cursor, so advancing one advances all of them.

use crate::cache::ObjectIdCache;
use crate::codec::RowCodec;
use crate::driver::{Oid, Row, RowCursor, SqlValue, INVALID_OID};
use parking_lot::Mutex;
use scarchive::archive::Archive;
use scarchive::meta::{parse_time, Time};
use scarchive::object::{BaseObject, ObjectRef, ObjectType};
use scarchive::rtti::Rtti;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Current {
    object: ObjectRef,
    oid: Oid,
    parent_oid: Oid,
    last_modified: Option<Time>,
}

struct Inner {
    cursor: Box<dyn RowCursor>,
    codec: RowCodec,
    cache: Arc<ObjectIdCache>,
    current: Option<Current>,
    count: usize,
}

struct Shared {
    rtti: &'static Rtti,
    closed: AtomicBool,
    inner: Mutex<Inner>,
}

/// Iterator over the objects of one query
///
/// The first object is fetched on construction. Rows that do not
/// deserialize are skipped. The query is released once the rows are
/// exhausted or [`close`](Self::close) was called.
#[derive(Clone, Default)]
pub struct DatabaseIterator {
    shared: Option<Arc<Shared>>,
}

impl DatabaseIterator {
    pub(crate) fn new(
        cursor: Box<dyn RowCursor>,
        rtti: &'static Rtti,
        codec: RowCodec,
        cache: Arc<ObjectIdCache>,
    ) -> Self {
        let shared = Arc::new(Shared {
            rtti,
            closed: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                cursor,
                codec,
                cache,
                current: None,
                count: 0,
            }),
        });
        let mut iterator = Self {
            shared: Some(shared),
        };
        iterator.advance();
        iterator
    }

    /// Iterator without rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True while an object is available.
    pub fn valid(&self) -> bool {
        self.shared.as_ref().is_some_and(|shared| {
            !shared.closed.load(Ordering::Acquire) && shared.inner.lock().current.is_some()
        })
    }

    /// Move to the next readable object. Returns false once exhausted.
    pub fn advance(&mut self) -> bool {
        let Some(shared) = &self.shared else {
            return false;
        };
        let mut inner = shared.inner.lock();
        loop {
            if shared.closed.load(Ordering::Acquire) {
                inner.release();
                return false;
            }
            let row = match inner.cursor.fetch_row() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    shared.closed.store(true, Ordering::Release);
                    inner.release();
                    return false;
                }
                Err(e) => {
                    let class_name = shared.rtti.class_name();
                    tracing::error!("[database] fetching {} failed: {:#}", class_name, e);
                    shared.closed.store(true, Ordering::Release);
                    inner.release();
                    return false;
                }
            };
            if let Some(current) = inner.read(row, shared.rtti) {
                inner.current = Some(current);
                inner.count += 1;
                return true;
            }
        }
    }

    /// Current object.
    pub fn get(&self) -> Option<ObjectRef> {
        let shared = self.shared.as_ref()?;
        let inner = shared.inner.lock();
        inner.current.as_ref().map(|c| c.object.clone())
    }

    /// Number of objects fetched so far.
    pub fn fetched(&self) -> usize {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.inner.lock().count)
    }

    /// End the query early. Safe to call from another thread while the
    /// iterator is advanced: the running fetch completes, the next one
    /// stops.
    pub fn close(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        shared.closed.store(true, Ordering::Release);
        if let Some(mut inner) = shared.inner.try_lock() {
            inner.release();
        }
    }

    /// Number of columns of the result set.
    pub fn field_count(&self) -> usize {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.inner.lock().cursor.columns().len())
    }

    /// Database id of the current object.
    pub fn oid(&self) -> Oid {
        self.current(|c| c.oid).unwrap_or(INVALID_OID)
    }

    /// Database id of the current object's parent.
    pub fn parent_oid(&self) -> Oid {
        self.current(|c| c.parent_oid).unwrap_or(INVALID_OID)
    }

    /// Last modification time of the current row.
    pub fn last_modified(&self) -> Option<Time> {
        self.current(|c| c.last_modified).flatten()
    }

    /// Typed current object.
    pub fn get_as<T: ObjectType>(&self) -> Option<Arc<parking_lot::RwLock<T>>> {
        self.get()?.downcast::<T>()
    }

    fn current<R>(&self, f: impl FnOnce(&Current) -> R) -> Option<R> {
        let shared = self.shared.as_ref()?;
        let inner = shared.inner.lock();
        inner.current.as_ref().map(f)
    }
}

impl Inner {
    fn release(&mut self) {
        self.cursor.close();
        self.current = None;
    }

    fn read(&mut self, row: Row, rtti: &'static Rtti) -> Option<Current> {
        let column = |row: &Row, name: &str| row.get(name).and_then(SqlValue::as_i64);
        let oid = column(&row, "_oid").unwrap_or(INVALID_OID);
        let parent_oid = column(&row, "_parent_oid").unwrap_or(INVALID_OID);
        let last_modified = row
            .get("_last_modified")
            .and_then(SqlValue::to_text)
            .and_then(|text| parse_time(&text));

        let registry = self.codec.registry();
        let Some(object) = self.codec.state().factory.create_object(rtti.class_name(), &registry)
        else {
            tracing::warn!("[database] class not found: {}", rtti.class_name());
            return None;
        };

        self.codec.begin_read(row);
        object.write().serialize(&mut self.codec);
        if !self.codec.success() {
            tracing::warn!(
                "[database] {} with _oid {} could not be read, skipped",
                rtti.class_name(),
                oid
            );
            return None;
        }
        self.cache.insert(object.key(), oid);
        Some(Current {
            object,
            oid,
            parent_oid,
            last_modified,
        })
    }
}

impl Iterator for DatabaseIterator {
    type Item = ObjectRef;

    fn next(&mut self) -> Option<ObjectRef> {
        let object = self.get()?;
        self.advance();
        Some(object)
    }
}

impl fmt::Debug for DatabaseIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseIterator")
            .field("class", &self.shared.as_ref().map(|s| s.rtti.class_name()))
            .field("valid", &self.valid())
            .field("fetched", &self.fetched())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarchive::datamodel::{Pick, PICK_TYPE};
    use scarchive::object::{Object, ObjectRegistry};
    use std::collections::VecDeque;

    struct Rows {
        columns: Vec<String>,
        rows: VecDeque<Row>,
    }

    impl RowCursor for Rows {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn fetch_row(&mut self) -> anyhow::Result<Option<Row>> {
            Ok(self.rows.pop_front())
        }

        fn close(&mut self) {
            self.rows.clear();
        }
    }

    /// One pick row per entry; `None` leaves the mandatory time empty.
    fn picks(times: &[Option<&str>]) -> Box<dyn RowCursor> {
        let columns = vec![
            "publicID".to_string(),
            "_oid".to_string(),
            "_parent_oid".to_string(),
            "_last_modified".to_string(),
            "time_value".to_string(),
        ];
        let shared: Arc<[String]> = columns.clone().into();
        let rows = times
            .iter()
            .enumerate()
            .map(|(i, time)| {
                Row::new(
                    shared.clone(),
                    vec![
                        SqlValue::from(format!("Pick/{}", i)),
                        SqlValue::Integer(i as i64 + 1),
                        SqlValue::Integer(100),
                        SqlValue::from("2024-05-01 10:00:00"),
                        time.map_or(SqlValue::Null, SqlValue::from),
                    ],
                )
            })
            .collect();
        Box::new(Rows { columns, rows })
    }

    fn iterator(times: &[Option<&str>]) -> (DatabaseIterator, Arc<ObjectIdCache>) {
        let cache = Arc::new(ObjectIdCache::new());
        let mut codec = RowCodec::new(ObjectRegistry::new(), "");
        codec.set_schema_version(scarchive::datamodel::VERSION);
        let it = DatabaseIterator::new(picks(times), &PICK_TYPE, codec, cache.clone());
        (it, cache)
    }

    const T: Option<&str> = Some("2024-05-01 09:59:00");

    #[test]
    fn test_rows_become_objects() {
        let (mut it, cache) = iterator(&[T, T]);
        assert!(it.valid());
        assert_eq!(it.field_count(), 5);
        assert_eq!(it.oid(), 1);
        assert_eq!(it.parent_oid(), 100);
        assert!(it.last_modified().is_some());

        let first = it.get().unwrap();
        assert_eq!(first.public_id().as_deref(), Some("Pick/0"));
        assert_eq!(cache.get(first.key()), 1);

        assert!(it.advance());
        let second = it.get_as::<Pick>().unwrap();
        assert_eq!(second.read().public_id(), Some("Pick/1"));
        assert!(!it.advance());
        assert!(!it.valid());
        assert_eq!(it.fetched(), 2);
        assert!(it.get().is_none());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let (it, _) = iterator(&[None, T, Some("yesterday")]);
        let ids: Vec<String> = it.filter_map(|object| object.public_id()).collect();
        assert_eq!(ids, vec!["Pick/1"]);
    }

    #[test]
    fn test_copies_share_the_cursor() {
        let (mut it, _) = iterator(&[T, T, T]);
        let copy = it.clone();
        it.advance();
        assert_eq!(copy.oid(), 2);

        copy.close();
        assert!(!it.valid());
        assert!(!it.advance());
        assert_eq!(it.fetched(), 2);
    }

    #[test]
    fn test_close_from_another_thread() {
        let (mut it, _) = iterator(&[T, T, T]);
        let remote = it.clone();
        std::thread::spawn(move || remote.close()).join().unwrap();
        assert!(!it.advance());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_empty_iterator() {
        let mut it = DatabaseIterator::empty();
        assert!(!it.valid());
        assert!(!it.advance());
        assert_eq!(it.fetched(), 0);
        assert_eq!(it.field_count(), 0);
        assert!(it.next().is_none());
    }
}
