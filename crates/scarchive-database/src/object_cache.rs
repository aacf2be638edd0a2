// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PublicID to object cache
//!
//! Keeps recently used public objects alive, and with them their registry
//! entries. Lookups go to the registry first and fall back to a database
//! archive, so
//!
//! ```ignore
//! let pick = registry
//!     .find_as::<Pick>(id)
//!     .or_else(|| archive.get::<Pick>(id));
//! ```
//!
//! becomes `cache.get::<Pick>(id)`. Every object returned is fed back to
//! the cache, which moves it to the young end.
//!
//! Two eviction policies exist: a ring buffer bounded by the number of
//! objects and a time span buffer bounded by the age of the oldest entry.

use crate::archive::DatabaseArchive;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use scarchive::archive::Archive;
use scarchive::object::{ObjectRef, ObjectRegistry, ObjectType};
use scarchive::rtti::Rtti;
use std::sync::Arc;

/// Eviction rule applied after every feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep at most this many objects (0 keeps nothing).
    Size(usize),
    /// Drop objects fed longer ago than this.
    TimeSpan(Duration),
}

/// Called with every object leaving the cache.
pub type PopCallback = Box<dyn FnMut(&ObjectRef) + Send>;

struct Entry {
    object: ObjectRef,
    timestamp: DateTime<Utc>,
}

/// Cache of public objects keyed by publicID
///
/// Entries are kept in feed order, oldest first. Feeding an object that is
/// cached already refreshes its timestamp and moves it to the end.
///
/// # Example
///
/// ```ignore
/// let reader = Arc::new(DatabaseArchive::open(&config)?);
/// let mut cache = PublicObjectCache::ring_buffer(100).with_archive(reader);
/// if let Some(pick) = cache.get::<Pick>("Pick/1") {
///     println!("{} from the database: {}", pick.read().phase_hint(), !cache.cached());
/// }
/// ```
pub struct PublicObjectCache {
    entries: LruCache<String, Entry>,
    policy: CachePolicy,
    registry: Arc<ObjectRegistry>,
    archive: Option<Arc<DatabaseArchive>>,
    cached: bool,
    pop_callback: Option<PopCallback>,
}

impl PublicObjectCache {
    /// Empty cache looking objects up in the global registry.
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: LruCache::unbounded(),
            policy,
            registry: ObjectRegistry::global(),
            archive: None,
            cached: false,
            pop_callback: None,
        }
    }

    /// Cache holding at most `size` objects.
    pub fn ring_buffer(size: usize) -> Self {
        Self::new(CachePolicy::Size(size))
    }

    /// Cache holding the objects fed within `span`.
    pub fn time_span(span: Duration) -> Self {
        Self::new(CachePolicy::TimeSpan(span))
    }

    /// Load missing objects from `archive`. Lookups use the archive's
    /// registry from now on.
    pub fn with_archive(mut self, archive: Arc<DatabaseArchive>) -> Self {
        self.set_archive(Some(archive));
        self
    }

    pub fn with_registry(mut self, registry: Arc<ObjectRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn set_archive(&mut self, archive: Option<Arc<DatabaseArchive>>) {
        if let Some(archive) = &archive {
            self.registry = archive.registry();
        }
        self.archive = archive;
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Change the eviction rule. Applied on the next feed.
    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
    }

    pub fn set_pop_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&ObjectRef) + Send + 'static,
    {
        self.pop_callback = Some(Box::new(callback));
    }

    pub fn remove_pop_callback(&mut self) {
        self.pop_callback = None;
    }

    /// Insert `object`, or refresh it when cached already, then evict
    /// according to the policy. Fails for objects without publicID.
    pub fn feed(&mut self, object: &ObjectRef) -> bool {
        let Some(public_id) = object.public_id() else {
            return false;
        };
        let now = Utc::now();
        self.push(public_id, object.clone());
        match self.policy {
            CachePolicy::Size(size) => {
                while self.entries.len() > size {
                    self.pop();
                }
            }
            CachePolicy::TimeSpan(span) => {
                while self.oldest().is_some_and(|oldest| now - oldest > span) {
                    self.pop();
                }
            }
        }
        true
    }

    fn push(&mut self, public_id: String, object: ObjectRef) {
        let entry = Entry {
            object,
            timestamp: Utc::now(),
        };
        self.entries.put(public_id, entry);
    }

    fn pop(&mut self) {
        if let Some((public_id, entry)) = self.entries.pop_lru() {
            tracing::trace!("[cache] dropping {}", public_id);
            if let Some(callback) = self.pop_callback.as_mut() {
                callback(&entry.object);
            }
        }
    }

    /// Remove `object`. Returns false when its publicID is not cached.
    pub fn remove(&mut self, object: &ObjectRef) -> bool {
        let Some(entry) = object.public_id().and_then(|id| self.entries.pop(&id)) else {
            return false;
        };
        if let Some(callback) = self.pop_callback.as_mut() {
            callback(&entry.object);
        }
        true
    }

    /// Drop all entries, oldest first.
    pub fn clear(&mut self) {
        while !self.entries.is_empty() {
            self.pop();
        }
    }

    /// Object `public_id` of type `rtti`, from the registry or, failing
    /// that, from the database. The result is fed to the cache.
    ///
    /// Objects of another type yield `None`.
    pub fn find(&mut self, rtti: &'static Rtti, public_id: &str) -> Option<ObjectRef> {
        let object = match self.registry.find(public_id) {
            Some(object) => {
                self.cached = true;
                Some(object)
            }
            None => {
                self.cached = false;
                self.archive
                    .as_ref()
                    .and_then(|archive| archive.get_object(rtti, public_id))
            }
        }?;
        self.feed(&object);
        object.is_type_of(rtti).then_some(object)
    }

    /// Typed [`find`](Self::find).
    pub fn get<T: ObjectType>(&mut self, public_id: &str) -> Option<Arc<RwLock<T>>> {
        self.find(T::type_info(), public_id)?.downcast::<T>()
    }

    /// Whether the last [`find`](Self::find) was served without the
    /// database.
    pub fn cached(&self) -> bool {
        self.cached
    }

    /// Type of the cached or registered object `public_id`. Never asks the
    /// database.
    pub fn type_info(&self, public_id: &str) -> Option<&'static Rtti> {
        if let Some(entry) = self.entries.peek(public_id) {
            return Some(entry.object.type_info());
        }
        self.registry.find(public_id).map(|object| object.type_info())
    }

    /// Timestamp of the oldest entry.
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.entries.peek_lru().map(|(_, entry)| entry.timestamp)
    }

    /// Timestamps of the oldest and the youngest entry.
    pub fn time_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let oldest = self.oldest()?;
        let youngest = self.entries.iter().next()?.1.timestamp;
        Some((oldest, youngest))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached objects with their feed time, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, DateTime<Utc>)> + '_ {
        self.entries
            .iter()
            .rev()
            .map(|(_, entry)| (&entry.object, entry.timestamp))
    }

    /// Whether this very object is cached.
    pub fn contains(&self, object: &ObjectRef) -> bool {
        object
            .public_id()
            .and_then(|id| self.entries.peek(&id))
            .is_some_and(|entry| entry.object.ptr_eq(object))
    }

    pub fn contains_id(&self, public_id: &str) -> bool {
        self.entries.contains(public_id)
    }
}
