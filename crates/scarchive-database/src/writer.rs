// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subtree writer
//!
//! Applies one operation to an object and all of its descendants. Adds and
//! updates run parent first so that children find their parent row;
//! removals run children first.

use crate::archive::DatabaseArchive;
use scarchive::object::{ObjectKey, ObjectRef, Operation, TraversalMode, Visitor};

/// Visitor that stores, updates or deletes every object it visits.
pub struct DatabaseObjectWriter<'a> {
    archive: &'a mut DatabaseArchive,
    operation: Operation,
    root: Option<(ObjectKey, String)>,
    count: usize,
    errors: usize,
}

impl<'a> DatabaseObjectWriter<'a> {
    /// Writer inserting new rows.
    pub fn new(archive: &'a mut DatabaseArchive) -> Self {
        Self::with_operation(archive, Operation::Add)
    }

    pub fn with_operation(archive: &'a mut DatabaseArchive, operation: Operation) -> Self {
        Self {
            archive,
            operation,
            root: None,
            count: 0,
            errors: 0,
        }
    }

    /// Walk `object`, storing it below the public object `parent_id`. An
    /// empty `parent_id` uses the object's current parent.
    ///
    /// Returns true when every visited object was handled.
    pub fn write(&mut self, object: &ObjectRef, parent_id: &str) -> bool {
        let errors = self.errors;
        self.root = Some((object.key(), parent_id.to_string()));
        object.accept(self);
        self.root = None;
        self.errors == errors
    }

    /// Objects handled successfully.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Objects that failed.
    pub fn errors(&self) -> usize {
        self.errors
    }

    fn parent_id_of(&self, object: &ObjectRef) -> &str {
        match &self.root {
            Some((key, id)) if *key == object.key() => id,
            _ => "",
        }
    }
}

impl Visitor for DatabaseObjectWriter<'_> {
    fn mode(&self) -> TraversalMode {
        match self.operation {
            Operation::Remove => TraversalMode::BottomUp,
            _ => TraversalMode::TopDown,
        }
    }

    fn visit(&mut self, object: &ObjectRef) -> bool {
        let parent_id = self.parent_id_of(object).to_string();
        let done = match self.operation {
            Operation::Add => self.archive.insert(object, &parent_id),
            Operation::Update => self.archive.update(object, &parent_id),
            Operation::Remove => self.archive.remove(object, &parent_id),
            Operation::Undefined => {
                tracing::warn!("[database] undefined operation for {}", object.class_name());
                false
            }
        };
        if done {
            self.count += 1;
        } else {
            self.errors += 1;
        }
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::driver::INVALID_OID;
    use scarchive::datamodel::{
        Arrival, Comment, EventParameters, Origin, ARRIVAL_TYPE, COMMENT_TYPE,
    };
    use scarchive::object::ObjectRegistry;
    use std::sync::Arc;

    fn origin(registry: &Arc<ObjectRegistry>) -> ObjectRef {
        let origin = Origin::create_with_id(registry, "Origin/w").unwrap();
        {
            let mut guard = origin.write();
            guard.add_comment(Comment::with_id(registry, "note", "manual"));
            for (pick, phase) in [("Pick/1", "P"), ("Pick/2", "S")] {
                guard.add_arrival(Arrival::with_pick(registry, pick, phase));
            }
        }
        ObjectRef::new(origin)
    }

    fn archive(registry: &Arc<ObjectRegistry>) -> DatabaseArchive {
        DatabaseArchive::open(&DatabaseConfig::default())
            .unwrap()
            .with_registry(registry.clone())
    }

    #[test]
    fn test_add_stores_the_subtree() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let origin = origin(&registry);

        let mut writer = DatabaseObjectWriter::new(&mut db);
        assert!(!writer.write(&origin, "EventParameters"), "parent not stored yet");
        assert_eq!(writer.errors(), 1);

        let root = EventParameters::create_with_id(&registry, "EventParameters").unwrap();
        let root = ObjectRef::new(root);
        assert!(db.insert(&root, ""));
        let mut writer = DatabaseObjectWriter::new(&mut db);
        assert!(writer.write(&origin, "EventParameters"));
        assert_eq!(writer.count(), 4);
        assert_eq!(writer.errors(), 0);

        assert_eq!(db.get_object_count("Origin/w", &ARRIVAL_TYPE), 2);
        assert_eq!(db.get_object_count("Origin/w", &COMMENT_TYPE), 1);
        assert_eq!(db.cache_size(), 5);
    }

    #[test]
    fn test_failed_parent_skips_children() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let origin = origin(&registry);
        assert!(db.insert(&origin, ""));

        let mut writer = DatabaseObjectWriter::new(&mut db);
        assert!(!writer.write(&origin, ""));
        assert_eq!(writer.errors(), 1);
        assert_eq!(writer.count(), 0);
    }

    #[test]
    fn test_update_and_remove() {
        let registry = ObjectRegistry::new();
        let mut db = archive(&registry);
        let origin = origin(&registry);
        assert!(DatabaseObjectWriter::new(&mut db).write(&origin, ""));

        let typed = origin.downcast::<Origin>().unwrap();
        typed.write().set_method_id("LOCSAT");
        let mut writer = DatabaseObjectWriter::with_operation(&mut db, Operation::Update);
        assert!(writer.write(&origin, ""));
        assert_eq!(writer.count(), 4);

        let mut writer = DatabaseObjectWriter::with_operation(&mut db, Operation::Remove);
        assert!(writer.write(&origin, ""));
        assert_eq!(writer.count(), 4);
        assert_eq!(db.public_object_id("Origin/w"), INVALID_OID);
        assert_eq!(db.get_objects_of(None, &ARRIVAL_TYPE, false).count(), 0);
        assert_eq!(db.cache_size(), 0);
    }
}
