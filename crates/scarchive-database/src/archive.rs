// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Database archive
//!
//! Stores objects as table rows and reads them back through streaming
//! iterators. Every stored object gets a surrogate id (`_oid`) from the
//! `Object` table; public objects additionally map their publicID to that
//! id in `PublicObject`. Rows of child classes reference their owner
//! through `_parent_oid`.
//!
//! `insert`, `update` and `remove` handle a single object; children are
//! written by walking a subtree with a
//! [`DatabaseObjectWriter`](crate::DatabaseObjectWriter).

use crate::cache::ObjectIdCache;
use crate::codec::{Attributes, RowCodec, PUBLIC_ID};
use crate::config::DatabaseConfig;
use crate::driver::{DatabaseDriver, Oid, SqlValue, INVALID_OID};
use crate::iterator::DatabaseIterator;
use crate::schema::SCHEMA_VERSION_KEY;
use crate::sqlite::SqliteDriver;
use anyhow::{anyhow, bail, Context, Result};
use parking_lot::RwLock;
use scarchive::archive::{Archive, ArchiveState, Version};
use scarchive::datamodel;
use scarchive::meta::{Value, ValueType};
use scarchive::object::{
    add_observer, remove_observer, BaseObject, ObjectObserver, ObjectRef, ObjectRegistry,
    ObjectType, PUBLIC_OBJECT_TYPE,
};
use scarchive::rtti::Rtti;
use std::sync::Arc;

/// Archive backed by a relational database
///
/// # Example
///
/// ```no_run
/// use scarchive::datamodel::{Arrival, Origin, ARRIVAL_TYPE};
/// use scarchive::object::{ObjectRef, ObjectRegistry};
/// use scarchive_database::{DatabaseArchive, DatabaseConfig, DatabaseObjectWriter};
///
/// let registry = ObjectRegistry::new();
/// let origin = Origin::create_with_id(&registry, "Origin/1").unwrap();
/// origin.write().add_arrival(Arrival::with_pick(&registry, "Pick/1", "P"));
///
/// let mut db = DatabaseArchive::open(&DatabaseConfig::default())?;
/// let mut writer = DatabaseObjectWriter::new(&mut db);
/// writer.write(&ObjectRef::new(origin), "");
/// assert_eq!(writer.errors(), 0);
///
/// let arrivals: Vec<_> = db.get_objects("Origin/1", &ARRIVAL_TYPE, false).collect();
/// assert_eq!(arrivals.len(), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct DatabaseArchive {
    driver: Option<Arc<dyn DatabaseDriver>>,
    codec: RowCodec,
    cache: Arc<ObjectIdCache>,
    observer: Arc<dyn ObjectObserver>,
}

impl DatabaseArchive {
    /// Archive on top of an open driver. Fails when the stored schema is
    /// newer than the data model.
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Result<Self> {
        let cache = Arc::new(ObjectIdCache::new());
        let observer: Arc<dyn ObjectObserver> = cache.clone();
        add_observer(&observer);

        let mut archive = Self {
            driver: None,
            codec: RowCodec::new(ObjectRegistry::global(), driver.column_prefix()),
            cache,
            observer,
        };
        archive.set_driver(driver)?;
        Ok(archive)
    }

    /// Open the SQLite database named by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let driver = SqliteDriver::open(config)?;
        Self::new(Arc::new(driver))
    }

    /// Bind objects read from now on to `registry`.
    pub fn with_registry(mut self, registry: Arc<ObjectRegistry>) -> Self {
        self.codec.set_registry(registry);
        self
    }

    /// Replace the driver and read the schema version of its database.
    pub fn set_driver(&mut self, driver: Arc<dyn DatabaseDriver>) -> Result<()> {
        let version = fetch_version(driver.as_ref())?;
        let registry = self.codec.registry();
        self.codec = RowCodec::new(registry, driver.column_prefix());
        self.codec.set_schema_version(version);
        self.driver = Some(driver);
        self.cache.clear();
        tracing::info!("[database] schema version {}", version);
        Ok(())
    }

    pub fn driver(&self) -> Option<&Arc<dyn DatabaseDriver>> {
        self.driver.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    /// Release the driver and forget all cached ids.
    pub fn close(&mut self) {
        if self.driver.take().is_some() {
            tracing::debug!("[database] closed");
        }
        self.cache.clear();
    }

    /// Escape `text` for a single-quoted literal of a custom query.
    pub fn to_sql(&self, text: &str) -> String {
        match &self.driver {
            Some(driver) => driver.escape(text),
            None => text.replace('\'', "''"),
        }
    }

    fn connection(&self) -> Result<Arc<dyn DatabaseDriver>> {
        self.driver.clone().ok_or_else(|| anyhow!("no database driver"))
    }

    fn prefixed(&self, column: &str) -> String {
        format!("\"{}{}\"", self.codec.column_prefix(), column)
    }

    // ---------------------------------------------------------------- cache

    /// Cached id of `object`, [`INVALID_OID`] when unknown.
    pub fn cached_id(&self, object: &ObjectRef) -> Oid {
        self.cache.get(object.key())
    }

    pub fn register_id(&self, object: &ObjectRef, oid: Oid) {
        self.cache.insert(object.key(), oid);
    }

    pub fn remove_id(&self, object: &ObjectRef) -> bool {
        self.cache.remove(object.key())
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    // -------------------------------------------------------------- lookups

    fn query_oid(&self, sql: &str, params: &[SqlValue]) -> Result<Oid> {
        let mut cursor = self.connection()?.query(sql, params)?;
        let oid = cursor
            .fetch_row()?
            .and_then(|row| row.value(0).and_then(SqlValue::as_i64))
            .unwrap_or(INVALID_OID);
        cursor.close();
        Ok(oid)
    }

    /// Database id of the public object `public_id`, whatever its class.
    pub fn public_object_id(&self, public_id: &str) -> Oid {
        let sql = format!(
            "SELECT _oid FROM PublicObject WHERE {} = ?",
            self.prefixed(PUBLIC_ID)
        );
        self.query_oid(&sql, &[SqlValue::from(public_id)])
            .unwrap_or_else(|e| {
                tracing::error!("[database] publicID lookup failed: {:#}", e);
                INVALID_OID
            })
    }

    /// Database id of `object`, looked up by publicID or by its index
    /// attributes below its parent.
    pub fn object_id(&mut self, object: &ObjectRef, parent_id: &str) -> Oid {
        if let Some(public_id) = object.public_id() {
            return self.public_object_id(&public_id);
        }
        let parent_oid = self.parent_oid(object, parent_id);
        let (attributes, index) = match self.serialize_object(object, true) {
            Ok(maps) => maps,
            Err(e) => {
                tracing::error!("[database] {:#}", e);
                return INVALID_OID;
            }
        };
        let mut keys = if index.is_empty() { attributes } else { index };
        if parent_oid != INVALID_OID {
            keys.insert("_parent_oid".to_string(), SqlValue::Integer(parent_oid));
        }
        let (condition, params) = where_clause(&keys);
        let sql = format!(
            "SELECT _oid FROM \"{}\" WHERE {}",
            object.class_name(),
            condition
        );
        self.query_oid(&sql, &params).unwrap_or_else(|e| {
            tracing::error!("[database] object lookup failed: {:#}", e);
            INVALID_OID
        })
    }

    /// Database id of the parent of `object`: its current parent when it
    /// has one, otherwise the public object `parent_id`.
    fn parent_oid(&self, object: &ObjectRef, parent_id: &str) -> Oid {
        let Some(parent) = object.parent() else {
            return if parent_id.is_empty() {
                INVALID_OID
            } else {
                self.public_object_id(parent_id)
            };
        };
        match self.cached_id(&parent) {
            INVALID_OID => {
                let oid = parent
                    .public_id()
                    .map_or(INVALID_OID, |id| self.public_object_id(&id));
                if oid != INVALID_OID {
                    self.register_id(&parent, oid);
                }
                oid
            }
            oid => oid,
        }
    }

    /// PublicID of the stored parent of the public `object`.
    pub fn parent_public_id(&self, object: &ObjectRef) -> Option<String> {
        let public_id = object.public_id()?;
        let column = self.prefixed(PUBLIC_ID);
        let sql = format!(
            "SELECT Parent.{col} FROM PublicObject AS Parent, PublicObject AS Child, \"{table}\" \
             WHERE Child._oid = \"{table}\"._oid AND Parent._oid = \"{table}\"._parent_oid \
             AND Child.{col} = ?",
            col = column,
            table = object.class_name()
        );
        let mut cursor = self
            .connection()
            .and_then(|driver| driver.query(&sql, &[SqlValue::from(public_id)]))
            .map_err(|e| tracing::error!("[database] parent lookup failed: {:#}", e))
            .ok()?;
        let row = cursor.fetch_row().ok()??;
        cursor.close();
        row.value(0).and_then(SqlValue::to_text).map(|text| text.into_owned())
    }

    // ------------------------------------------------------------ mutations

    fn serialize_object(
        &mut self,
        object: &ObjectRef,
        split_index: bool,
    ) -> Result<(Attributes, Attributes)> {
        self.codec.begin_write(split_index);
        object.write().serialize(&mut self.codec);
        if !self.codec.success() {
            bail!("{} could not be serialized", object.class_name());
        }
        Ok(self.codec.take_attributes())
    }

    /// Store `object` as a new row below its current parent, or below the
    /// public object `parent_id` when it has none. Children are not stored.
    ///
    /// Fails when the parent is not stored. Only public objects may be
    /// stored without any parent.
    ///
    /// The object must not be locked by the caller.
    pub fn insert(&mut self, object: &ObjectRef, parent_id: &str) -> bool {
        let Ok(driver) = self.connection() else {
            tracing::error!("[database] insert: no database driver");
            return false;
        };
        let public_id = object.public_id();
        if let Some(id) = &public_id {
            if id.is_empty() {
                tracing::error!("[database] cannot store {} without publicID", object.class_name());
                return false;
            }
            if self.public_object_id(id) != INVALID_OID {
                tracing::error!("[database] object with publicID {} exists already", id);
                return false;
            }
        }

        if let Err(e) = driver.begin() {
            tracing::error!("[database] insert: {:#}", e);
            return false;
        }
        match self.insert_rows(driver.as_ref(), object, parent_id, public_id.as_deref()) {
            Ok(oid) => match driver.commit() {
                Ok(()) => {
                    self.register_id(object, oid);
                    tracing::debug!("[database] inserted {} as {}", object.class_name(), oid);
                    true
                }
                Err(e) => {
                    tracing::error!("[database] insert commit failed: {:#}", e);
                    let _ = driver.rollback();
                    false
                }
            },
            Err(e) => {
                tracing::error!("[database] insert of {} failed: {:#}", object.class_name(), e);
                if let Err(e) = driver.rollback() {
                    tracing::error!("[database] rollback failed: {:#}", e);
                }
                self.codec.set_validity(false);
                false
            }
        }
    }

    fn insert_rows(
        &mut self,
        driver: &dyn DatabaseDriver,
        object: &ObjectRef,
        parent_id: &str,
        public_id: Option<&str>,
    ) -> Result<Oid> {
        driver.execute("INSERT INTO Object (_timestamp) VALUES (CURRENT_TIMESTAMP)", &[])?;
        let oid = driver.last_insert_id()?;
        if let Some(id) = public_id {
            let sql = format!(
                "INSERT INTO PublicObject (_oid, {}) VALUES (?, ?)",
                self.prefixed(PUBLIC_ID)
            );
            driver.execute(&sql, &[SqlValue::Integer(oid), SqlValue::from(id)])?;
        }

        let (mut attributes, _) = self.serialize_object(object, false)?;
        attributes.insert("_oid".to_string(), SqlValue::Integer(oid));
        let parent_oid = self.parent_oid(object, parent_id);
        if parent_oid != INVALID_OID {
            attributes.insert("_parent_oid".to_string(), SqlValue::Integer(parent_oid));
        } else if let Some(parent) = object.parent() {
            bail!("failed to get oid for parent {:?}", parent);
        } else if !parent_id.is_empty() {
            bail!("failed to get oid for object '{}'", parent_id);
        } else if public_id.is_none() {
            bail!("{} has no parent", object.class_name());
        }

        let (columns, params): (Vec<String>, Vec<SqlValue>) = attributes
            .into_iter()
            .map(|(column, value)| (quote(&column), value))
            .unzip();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            object.class_name(),
            columns.join(", "),
            placeholders
        );
        driver
            .execute(&sql, &params)
            .with_context(|| format!("row of {}", object.class_name()))?;
        Ok(oid)
    }

    /// Rewrite the stored row of `object`. Public objects are found by
    /// publicID, others by their index attributes below the parent.
    pub fn update(&mut self, object: &ObjectRef, parent_id: &str) -> bool {
        match self.update_row(object, parent_id) {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!("[database] update of {} failed: {:#}", object.class_name(), e);
                self.codec.set_validity(false);
                false
            }
        }
    }

    fn update_row(&mut self, object: &ObjectRef, parent_id: &str) -> Result<bool> {
        let driver = self.connection()?;
        let parent_oid = self.parent_oid(object, parent_id);
        let public_id = object.public_id();
        if public_id.is_none() && parent_oid == INVALID_OID {
            bail!("parent object not found");
        }

        let (attributes, mut index) = self.serialize_object(object, true)?;
        if let Some(id) = &public_id {
            let oid = match self.cached_id(object) {
                INVALID_OID => self.public_object_id(id),
                oid => oid,
            };
            if oid == INVALID_OID {
                bail!("object {} not stored", id);
            }
            index.insert("_oid".to_string(), SqlValue::Integer(oid));
        }
        if attributes.is_empty() {
            return Ok(true);
        }
        if parent_oid != INVALID_OID {
            index.insert("_parent_oid".to_string(), SqlValue::Integer(parent_oid));
        }

        let mut params = Vec::with_capacity(attributes.len() + index.len());
        let mut assignments: Vec<String> = attributes
            .into_iter()
            .map(|(column, value)| {
                params.push(value);
                format!("{} = ?", quote(&column))
            })
            .collect();
        assignments.push("_last_modified = CURRENT_TIMESTAMP".to_string());
        let (condition, keys) = where_clause(&index);
        params.extend(keys);
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE {}",
            object.class_name(),
            assignments.join(", "),
            condition
        );
        let changed = driver.execute(&sql, &params)?;
        if changed == 0 {
            tracing::debug!("[database] update of {}: no row matched", object.class_name());
        }
        Ok(changed > 0)
    }

    /// Delete the stored row of `object`. Children are left alone.
    pub fn remove(&mut self, object: &ObjectRef, parent_id: &str) -> bool {
        let oid = match self.cached_id(object) {
            INVALID_OID => self.object_id(object, parent_id),
            oid => oid,
        };
        if oid == INVALID_OID {
            tracing::error!("[database] remove: {} not found", object.class_name());
            return false;
        }
        let Ok(driver) = self.connection() else {
            return false;
        };

        let public = object.is_type_of(&PUBLIC_OBJECT_TYPE);
        let result = driver.begin().and_then(|()| {
            let key = [SqlValue::Integer(oid)];
            let sql = format!("DELETE FROM \"{}\" WHERE _oid = ?", object.class_name());
            driver.execute(&sql, &key)?;
            if public {
                driver.execute("DELETE FROM PublicObject WHERE _oid = ?", &key)?;
            }
            driver.execute("DELETE FROM Object WHERE _oid = ?", &key)?;
            driver.commit()
        });
        match result {
            Ok(()) => {
                self.remove_id(object);
                true
            }
            Err(e) => {
                tracing::error!("[database] remove of {} failed: {:#}", object.class_name(), e);
                let _ = driver.rollback();
                false
            }
        }
    }

    // -------------------------------------------------------------- queries

    /// Rows of archive queries may come in `_oid` order; custom queries
    /// keep their own.
    fn iterate(
        &self,
        sql: &str,
        params: &[SqlValue],
        rtti: &'static Rtti,
        by_oid: bool,
    ) -> DatabaseIterator {
        let cursor = self.connection().and_then(|driver| {
            if by_oid {
                driver.query_by_oid(sql, params)
            } else {
                driver.query(sql, params)
            }
        });
        match cursor {
            Ok(cursor) => {
                DatabaseIterator::new(cursor, rtti, self.codec.sibling(), self.cache.clone())
            }
            Err(e) => {
                tracing::error!("[database] query failed: {:#}", e);
                DatabaseIterator::empty()
            }
        }
    }

    fn select(&self, rtti: &'static Rtti, ignore_public_object: bool) -> String {
        let table = rtti.class_name();
        if !ignore_public_object && rtti.is_type_of(&PUBLIC_OBJECT_TYPE) {
            format!(
                "SELECT PublicObject.{col}, \"{table}\".* FROM PublicObject, \"{table}\" \
                 WHERE PublicObject._oid = \"{table}\"._oid",
                col = self.prefixed(PUBLIC_ID),
                table = table
            )
        } else {
            format!("SELECT \"{}\".* FROM \"{}\"", table, table)
        }
    }

    /// Iterate the objects of type `rtti` below the parent with database id
    /// `parent_oid`, or all of them for [`INVALID_OID`].
    pub fn get_object_iterator_below(
        &self,
        parent_oid: Oid,
        rtti: &'static Rtti,
        ignore_public_object: bool,
    ) -> DatabaseIterator {
        let mut sql = self.select(rtti, ignore_public_object);
        let mut params = Vec::new();
        if parent_oid != INVALID_OID {
            let joiner = if sql.contains(" WHERE ") { " AND" } else { " WHERE" };
            sql.push_str(&format!("{} \"{}\"._parent_oid = ?", joiner, rtti.class_name()));
            params.push(SqlValue::Integer(parent_oid));
        }
        self.iterate(&sql, &params, rtti, true)
    }

    /// Iterate the objects of type `rtti` stored below the public object
    /// `parent_id`. An unknown parent yields no objects.
    pub fn get_objects(
        &self,
        parent_id: &str,
        rtti: &'static Rtti,
        ignore_public_object: bool,
    ) -> DatabaseIterator {
        let parent_oid = if parent_id.is_empty() {
            INVALID_OID
        } else {
            match self.public_object_id(parent_id) {
                INVALID_OID => {
                    tracing::warn!("[database] parent {} not found", parent_id);
                    return DatabaseIterator::empty();
                }
                oid => oid,
            }
        };
        self.get_object_iterator_below(parent_oid, rtti, ignore_public_object)
    }

    /// Iterate the objects of type `rtti` stored below `parent`, or all of
    /// them without a parent.
    pub fn get_objects_of(
        &self,
        parent: Option<&ObjectRef>,
        rtti: &'static Rtti,
        ignore_public_object: bool,
    ) -> DatabaseIterator {
        let Some(parent) = parent else {
            return self.get_object_iterator_below(INVALID_OID, rtti, ignore_public_object);
        };
        let parent_oid = match self.cached_id(parent) {
            INVALID_OID => parent
                .public_id()
                .map_or(INVALID_OID, |id| self.public_object_id(&id)),
            oid => oid,
        };
        if parent_oid == INVALID_OID {
            tracing::warn!("[database] parent {:?} not stored", parent);
            return DatabaseIterator::empty();
        }
        self.get_object_iterator_below(parent_oid, rtti, ignore_public_object)
    }

    /// Read the public object `public_id` of type `rtti`.
    pub fn get_object(&self, rtti: &'static Rtti, public_id: &str) -> Option<ObjectRef> {
        let sql = format!(
            "{} AND PublicObject.{} = ?",
            self.select(rtti, false),
            self.prefixed(PUBLIC_ID)
        );
        let it = self.iterate(&sql, &[SqlValue::from(public_id)], rtti, true);
        let object = it.get();
        it.close();
        object
    }

    /// Typed [`get_object`](Self::get_object).
    pub fn get<T: ObjectType>(&self, public_id: &str) -> Option<Arc<RwLock<T>>> {
        self.get_object(T::type_info(), public_id)?.downcast::<T>()
    }

    /// Iterate the objects of type `rtti` returned by a custom query, in
    /// the order of the query. The result must carry the columns of the
    /// class table.
    pub fn get_object_iterator(&self, query: &str, rtti: &'static Rtti) -> DatabaseIterator {
        self.iterate(query, &[], rtti, false)
    }

    /// First object of type `rtti` returned by a custom query.
    pub fn query_object(&self, rtti: &'static Rtti, query: &str) -> Option<ObjectRef> {
        let it = self.get_object_iterator(query, rtti);
        let object = it.get();
        it.close();
        object
    }

    fn count(&self, sql: &str, params: &[SqlValue]) -> usize {
        let count = self.connection().and_then(|driver| {
            let mut cursor = driver.query(sql, params)?;
            let count = cursor
                .fetch_row()?
                .and_then(|row| row.value(0).and_then(SqlValue::as_i64))
                .unwrap_or(0);
            Ok(count)
        });
        match count {
            Ok(count) => usize::try_from(count).unwrap_or(0),
            Err(e) => {
                tracing::error!("[database] count failed: {:#}", e);
                0
            }
        }
    }

    /// Number of stored objects of type `rtti` below the public object
    /// `parent_id`.
    pub fn get_object_count(&self, parent_id: &str, rtti: &'static Rtti) -> usize {
        let sql = format!(
            "SELECT count(*) FROM \"{table}\", PublicObject \
             WHERE PublicObject._oid = \"{table}\"._parent_oid AND PublicObject.{col} = ?",
            table = rtti.class_name(),
            col = self.prefixed(PUBLIC_ID)
        );
        self.count(&sql, &[SqlValue::from(parent_id)])
    }

    /// Number of stored objects of type `rtti` below `parent`.
    pub fn get_object_count_of(&self, parent: &ObjectRef, rtti: &'static Rtti) -> usize {
        match self.cached_id(parent) {
            INVALID_OID => parent
                .public_id()
                .map_or(0, |id| self.get_object_count(&id, rtti)),
            oid => {
                let sql = format!(
                    "SELECT count(*) FROM \"{}\" WHERE _parent_oid = ?",
                    rtti.class_name()
                );
                self.count(&sql, &[SqlValue::Integer(oid)])
            }
        }
    }
}

impl Drop for DatabaseArchive {
    fn drop(&mut self) {
        remove_observer(&self.observer);
    }
}

fn quote(column: &str) -> String {
    if column.starts_with('_') {
        column.to_string()
    } else {
        format!("\"{}\"", column)
    }
}

fn where_clause(keys: &Attributes) -> (String, Vec<SqlValue>) {
    let mut params = Vec::with_capacity(keys.len());
    let condition = keys
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote(column))
            } else {
                params.push(value.clone());
                format!("{} = ?", quote(column))
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    (condition, params)
}

fn fetch_version(driver: &dyn DatabaseDriver) -> Result<Version> {
    let mut cursor = match driver.query(
        "SELECT value FROM Meta WHERE name = ?",
        &[SqlValue::from(SCHEMA_VERSION_KEY)],
    ) {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::warn!("[database] no schema version ({:#}), assuming 0.0", e);
            return Ok(Version::default());
        }
    };
    let row = cursor
        .fetch_row()?
        .ok_or_else(|| anyhow!("{} missing in Meta", SCHEMA_VERSION_KEY))?;
    cursor.close();
    let text = row
        .value(0)
        .and_then(SqlValue::to_text)
        .map(|text| text.trim().to_string())
        .unwrap_or_default();
    let valid = text
        .split_once('.')
        .is_some_and(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        });
    if !valid {
        bail!("invalid schema version '{}'", text);
    }
    let version = Version::parse(&text);
    if version > datamodel::VERSION {
        bail!(
            "database schema {} is newer than the supported {}",
            version,
            datamodel::VERSION
        );
    }
    Ok(version)
}

impl Archive for DatabaseArchive {
    fn state(&self) -> &ArchiveState {
        self.codec.state()
    }

    fn state_mut(&mut self) -> &mut ArchiveState {
        self.codec.state_mut()
    }

    fn locate_object_by_name(
        &mut self,
        name: &str,
        target_class: Option<&str>,
        nullable: bool,
    ) -> bool {
        self.codec.locate_object_by_name(name, target_class, nullable)
    }

    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool {
        self.codec.locate_next_object_by_name(name, target_class)
    }

    fn locate_null_object_by_name(&mut self, name: &str, target_class: Option<&str>, first: bool) {
        self.codec.locate_null_object_by_name(name, target_class, first);
    }

    fn determine_class_name(&mut self) -> Option<String> {
        self.codec.determine_class_name()
    }

    fn set_class_name(&mut self, class_name: Option<&str>) {
        self.codec.set_class_name(class_name);
    }

    fn serialize_nested(&mut self, body: &mut dyn FnMut(&mut dyn Archive)) {
        self.codec.serialize_nested(body);
    }

    fn read_value(&mut self, ty: ValueType) -> Option<Value> {
        self.codec.read_value(ty)
    }

    fn write_value(&mut self, value: &Value) {
        self.codec.write_value(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use scarchive::datamodel::{
        Arrival, Comment, EventParameters, Origin, Pick, RealQuantity, TimeQuantity, ARRIVAL_TYPE,
        COMMENT_TYPE, ORIGIN_TYPE, PICK_TYPE,
    };

    fn archive(registry: &Arc<ObjectRegistry>) -> DatabaseArchive {
        DatabaseArchive::open(&DatabaseConfig::default())
            .unwrap()
            .with_registry(registry.clone())
    }

    fn store_root(db: &mut DatabaseArchive, registry: &Arc<ObjectRegistry>, id: &str) -> ObjectRef {
        let root = ObjectRef::new(EventParameters::create_with_id(registry, id).unwrap());
        assert!(db.insert(&root, ""));
        root
    }

    fn pick(registry: &Arc<ObjectRegistry>, id: &str) -> ObjectRef {
        let pick = Pick::create_with_id(registry, id).unwrap();
        let time = Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap();
        pick.write().set_time(TimeQuantity::new(time).with_uncertainty(0.2));
        ObjectRef::new(pick)
    }

    #[test]
    fn test_open_reads_schema_version() {
        let db = archive(&ObjectRegistry::new());
        assert!(db.is_open());
        assert_eq!(db.version(), datamodel::VERSION);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let driver = Arc::new(SqliteDriver::open_in_memory().unwrap());
        driver
            .execute("UPDATE Meta SET value = '9.0' WHERE name = 'Schema-Version'", &[])
            .unwrap();
        let err = DatabaseArchive::new(driver.clone()).err().unwrap();
        assert!(err.to_string().contains("newer"));

        driver
            .execute("UPDATE Meta SET value = 'x' WHERE name = 'Schema-Version'", &[])
            .unwrap();
        assert!(DatabaseArchive::new(driver).is_err());
    }

    #[test]
    fn test_missing_meta_table_means_version_zero() {
        let config = DatabaseConfig::builder().create_schema(false).build();
        let db = DatabaseArchive::open(&config).unwrap();
        assert_eq!(db.version(), Version::new(0, 0));
    }

    #[test]
    fn test_insert_and_get_public_object() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let _root = store_root(&mut db, &registry, "EP");
        let pick = pick(&registry, "Pick/1");

        assert!(db.insert(&pick, "EP"));
        let oid = db.cached_id(&pick);
        assert_ne!(oid, INVALID_OID);
        assert_eq!(db.public_object_id("Pick/1"), oid);
        assert_eq!(db.object_id(&pick, ""), oid);
        assert!(!db.insert(&pick, ""), "publicID is taken");

        let other = ObjectRegistry::new();
        let mut reader = archive(&other);
        reader.set_driver(db.driver().unwrap().clone()).unwrap();
        let copy = reader.get::<Pick>("Pick/1").unwrap();
        assert!(copy.read().equals(&*pick.downcast::<Pick>().unwrap().read()));
        assert!(reader.get_object(&PICK_TYPE, "Pick/none").is_none());
        assert!(reader.get_object(&ORIGIN_TYPE, "Pick/1").is_none());
    }

    #[test]
    fn test_non_public_object_found_by_index() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let pick = pick(&registry, "Pick/c");
        assert!(db.insert(&pick, ""));

        let comment = Comment::with_id(&registry, "snr", "3.5");
        pick.downcast::<Pick>().unwrap().write().add_comment(comment.clone());
        let comment = ObjectRef::new(comment);
        assert!(db.insert(&comment, ""));
        let oid = db.cached_id(&comment);

        assert!(db.remove_id(&comment));
        assert_eq!(db.object_id(&comment, ""), oid);
        assert_eq!(db.object_id(&comment, "Pick/c"), oid);
        assert_eq!(db.get_object_count("Pick/c", &COMMENT_TYPE), 1);
        assert_eq!(db.get_object_count_of(&pick, &COMMENT_TYPE), 1);
    }

    #[test]
    fn test_insert_needs_a_stored_parent() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let count = |db: &DatabaseArchive| db.count("SELECT count(*) FROM Object", &[]);

        let pick = pick(&registry, "Pick/orphan");
        assert!(!db.insert(&pick, "EventParameters/none"));
        assert_eq!(db.public_object_id("Pick/orphan"), INVALID_OID);
        assert_eq!(db.cached_id(&pick), INVALID_OID);
        assert_eq!(count(&db), 0, "transaction rolled back");

        let comment = ObjectRef::new(Comment::with_id(&registry, "loose", "no owner"));
        assert!(!db.insert(&comment, ""));
        assert_eq!(count(&db), 0);

        let unstored = Pick::create_with_id(&registry, "Pick/unstored").unwrap();
        let note = Comment::with_id(&registry, "note", "below an unstored pick");
        unstored.write().add_comment(note.clone());
        assert!(!db.insert(&ObjectRef::new(note.clone()), "EP"));

        let _root = store_root(&mut db, &registry, "EP");
        assert!(!db.insert(&ObjectRef::new(note), "EP"), "own parent comes first");
        assert!(db.insert(&pick, "EP"));
        assert_eq!(count(&db), 2);
    }

    #[test]
    fn test_update_rewrites_columns() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let _root = store_root(&mut db, &registry, "EP");
        let origin = Origin::create_with_id(&registry, "Origin/u").unwrap();
        let handle = ObjectRef::new(origin.clone());
        assert!(db.insert(&handle, "EP"));

        origin.write().set_depth(Some(RealQuantity::new(10.0)));
        assert!(db.update(&handle, "EP"));
        let mut copy = archive(&ObjectRegistry::new());
        copy.set_driver(db.driver().unwrap().clone()).unwrap();
        let stored = copy.get::<Origin>("Origin/u").unwrap();
        assert_eq!(stored.read().depth().map(RealQuantity::value), Some(10.0));

        let arrival = Arrival::with_pick(&registry, "Pick/x", "P");
        origin.write().add_arrival(arrival.clone());
        let arrival = ObjectRef::new(arrival);
        assert!(db.insert(&arrival, ""));
        arrival.downcast::<Arrival>().unwrap().write().set_weight(Some(0.5));
        assert!(db.update(&arrival, ""));

        let detached = ObjectRef::new(Arrival::with_pick(&registry, "Pick/y", "S"));
        assert!(!db.update(&detached, ""), "no parent to look below");
    }

    #[test]
    fn test_remove_deletes_rows() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let _root = store_root(&mut db, &registry, "EP");
        let pick = pick(&registry, "Pick/r");
        assert!(db.insert(&pick, "EP"));
        assert_eq!(db.cache_size(), 2);

        assert!(db.remove(&pick, ""));
        assert_eq!(db.cache_size(), 1);
        assert_eq!(db.public_object_id("Pick/r"), INVALID_OID);
        assert!(db.get_object(&PICK_TYPE, "Pick/r").is_none());
        assert!(!db.remove(&pick, ""));
    }

    #[test]
    fn test_parent_public_id_and_queries() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let ep = EventParameters::create_with_id(&registry, "EP/q").unwrap();
        let ep_ref = ObjectRef::new(ep.clone());
        assert!(db.insert(&ep_ref, ""));

        for i in 0..3 {
            let pick = pick(&registry, &format!("Pick/q{}", i));
            ep.write().add_pick(pick.downcast::<Pick>().unwrap());
            assert!(db.insert(&pick, ""));
        }
        let first = registry.find("Pick/q0").unwrap();
        assert_eq!(db.parent_public_id(&first).as_deref(), Some("EP/q"));
        assert_eq!(db.parent_public_id(&ep_ref), None);

        let ids: Vec<String> = db
            .get_objects_of(Some(&ep_ref), &PICK_TYPE, false)
            .filter_map(|p| p.public_id())
            .collect();
        assert_eq!(ids, vec!["Pick/q0", "Pick/q1", "Pick/q2"]);
        assert_eq!(db.get_objects_of(None, &PICK_TYPE, false).count(), 3);
        assert_eq!(db.get_objects("EP/none", &PICK_TYPE, false).count(), 0);

        let query = format!(
            "{} AND Pick.\"time_uncertainty\" > {}",
            db.select(&PICK_TYPE, false),
            db.to_sql("0.1")
        );
        let found = db.query_object(&PICK_TYPE, &query).unwrap();
        assert_eq!(found.public_id().as_deref(), Some("Pick/q0"));
        assert_eq!(db.get_object_iterator(&query, &PICK_TYPE).count(), 3);
    }

    #[test]
    fn test_closed_archive_refuses_work() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        db.close();
        assert!(!db.is_open());
        let pick = pick(&registry, "Pick/closed");
        assert!(!db.insert(&pick, ""));
        assert!(!db.get_objects("", &ARRIVAL_TYPE, false).valid());
        assert_eq!(db.get_object_count("EP", &ARRIVAL_TYPE), 0);
    }
}
