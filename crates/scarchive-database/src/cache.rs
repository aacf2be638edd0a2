// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object id cache
//!
//! Maps live objects to the database ids they were stored or read with.
//! Entries are keyed by the process-unique object key, so a dropped object
//! can be pruned from its destruction event alone.

use crate::driver::{Oid, INVALID_OID};
use parking_lot::Mutex;
use scarchive::object::{ObjectKey, ObjectObserver};
use std::collections::HashMap;

/// Write-through cache of object ids, shared by an archive and its
/// iterators.
#[derive(Debug, Default)]
pub struct ObjectIdCache {
    ids: Mutex<HashMap<ObjectKey, Oid>>,
}

impl ObjectIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached id of `key`, [`INVALID_OID`] when unknown.
    pub fn get(&self, key: ObjectKey) -> Oid {
        self.ids.lock().get(&key).copied().unwrap_or(INVALID_OID)
    }

    /// Remember `oid` for `key`. Invalid ids are ignored.
    pub fn insert(&self, key: ObjectKey, oid: Oid) {
        if oid != INVALID_OID {
            self.ids.lock().insert(key, oid);
        }
    }

    pub fn remove(&self, key: ObjectKey) -> bool {
        self.ids.lock().remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    pub fn clear(&self) {
        self.ids.lock().clear();
    }
}

impl ObjectObserver for ObjectIdCache {
    fn object_destroyed(&self, key: ObjectKey) {
        if self.remove(key) {
            tracing::trace!("[oid-cache] pruned {}", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarchive::datamodel::Pick;
    use scarchive::object::{add_observer, remove_observer, ObjectRef, ObjectRegistry};
    use std::sync::Arc;

    #[test]
    fn test_insert_and_lookup() {
        let registry = ObjectRegistry::new();
        let pick = ObjectRef::new(Pick::create_with_id(&registry, "Pick/c").unwrap());
        let cache = ObjectIdCache::new();

        assert_eq!(cache.get(pick.key()), INVALID_OID);
        cache.insert(pick.key(), INVALID_OID);
        assert!(cache.is_empty());

        cache.insert(pick.key(), 42);
        assert_eq!(cache.get(pick.key()), 42);
        assert_eq!(cache.len(), 1);
        assert!(cache.remove(pick.key()));
        assert!(!cache.remove(pick.key()));
    }

    #[test]
    fn test_destroyed_objects_are_pruned() {
        let cache = Arc::new(ObjectIdCache::new());
        let observer: Arc<dyn ObjectObserver> = cache.clone();
        add_observer(&observer);

        let registry = ObjectRegistry::new();
        let key = {
            let pick = ObjectRef::new(Pick::create_with_id(&registry, "Pick/d").unwrap());
            cache.insert(pick.key(), 7);
            pick.key()
        };
        assert_eq!(cache.get(key), INVALID_OID);
        assert!(remove_observer(&observer));
    }
}
