// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Relational database backend for scarchive objects
//!
//! Stores data model objects as rows of one table per class and reads them
//! back through streaming iterators.
//!
//! # Features
//!
//! - **Flattened columns** -- embedded values become `<field>_<member>` columns
//! - **Object ids** -- every row carries an `_oid`, children point to their
//!   parent via `_parent_oid`
//! - **Id cache** -- ids of live objects are cached and pruned when the objects drop
//! - **Paged cursors** -- archive queries fetch rows in `_oid` order, a page at a time;
//!   custom queries keep their own order
//! - **Subtree writer** -- add, update or remove an object together with its children
//! - **Object cache** -- keeps recent public objects alive, loading misses from the database
//!
//! # Architecture
//!
//! ```text
//! DatabaseArchive
//! +-- RowCodec             (object <-> column map)
//! +-- ObjectIdCache        (object key -> _oid)
//! +-- DatabaseDriver       (SQLite, or any other implementation)
//!     +-- RowCursor        (streams result rows)
//! DatabaseIterator         (rows -> objects, shared between copies)
//! DatabaseObjectWriter     (applies one operation to a subtree)
//! PublicObjectCache        (publicID -> object, registry first, then database)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use scarchive::datamodel::ARRIVAL_TYPE;
//! use scarchive_database::{DatabaseArchive, DatabaseConfig, DatabaseObjectWriter};
//!
//! let config = DatabaseConfig::builder().source("events.db").build();
//! let mut db = DatabaseArchive::open(&config)?;
//! DatabaseObjectWriter::new(&mut db).write(&origin, "EventParameters");
//!
//! for arrival in db.get_objects("Origin/1", &ARRIVAL_TYPE, false) {
//!     println!("{:?}", arrival);
//! }
//! ```

pub mod archive;
pub mod cache;
mod codec;
pub mod config;
pub mod driver;
pub mod iterator;
pub mod object_cache;
pub mod schema;
pub mod sqlite;
pub mod writer;

pub use archive::DatabaseArchive;
pub use cache::ObjectIdCache;
pub use codec::{format_db_time, parse_db_bool};
pub use config::{DatabaseConfig, DatabaseConfigBuilder};
pub use driver::{DatabaseDriver, Oid, Row, RowCursor, SqlValue, INVALID_OID};
pub use iterator::DatabaseIterator;
pub use object_cache::{CachePolicy, PopCallback, PublicObjectCache};
pub use sqlite::SqliteDriver;
pub use writer::DatabaseObjectWriter;
