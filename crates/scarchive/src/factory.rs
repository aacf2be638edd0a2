// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String-keyed class factory.
//!
//! Maps class names to their [`Rtti`], meta description and constructor.
//! Archives use it to instantiate polymorphic objects from the type tag found
//! in a stream. Unknown names are not an error: callers skip the element and
//! carry on, which keeps older readers working against newer producers.

use crate::meta::MetaObject;
use crate::object::{BaseObject, ObjectRef, ObjectRegistry};
use crate::rtti::Rtti;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Errors raised while populating a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    DuplicateClass(String),
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateClass(name) => write!(f, "Class already registered: {}", name),
        }
    }
}

impl std::error::Error for FactoryError {}

/// How a registered class is instantiated.
#[derive(Clone, Copy)]
pub enum Constructor {
    /// Embedded value type, owned by value inside its container.
    Value(fn() -> Box<dyn BaseObject>),
    /// Graph object, shared through an [`ObjectRef`].
    Object(fn(&Arc<ObjectRegistry>) -> ObjectRef),
}

/// A freshly created instance.
pub enum Instance {
    Value(Box<dyn BaseObject>),
    Object(ObjectRef),
}

impl Instance {
    /// Class name of the created instance.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Value(v) => v.class_name(),
            Self::Object(o) => o.class_name(),
        }
    }

    /// Try to get as graph object.
    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            Self::Value(_) => None,
        }
    }

    /// Try to get as value object.
    pub fn into_value(self) -> Option<Box<dyn BaseObject>> {
        match self {
            Self::Value(v) => Some(v),
            Self::Object(_) => None,
        }
    }
}

/// Registration record of one class.
#[derive(Clone, Copy)]
pub struct ClassEntry {
    pub rtti: &'static Rtti,
    pub meta: Option<fn() -> &'static MetaObject>,
    pub constructor: Option<Constructor>,
}

impl ClassEntry {
    /// Class that can be named and type-tested but not instantiated.
    pub const fn abstract_class(rtti: &'static Rtti) -> Self {
        Self {
            rtti,
            meta: None,
            constructor: None,
        }
    }

    /// Embedded value type.
    pub const fn value(
        rtti: &'static Rtti,
        meta: fn() -> &'static MetaObject,
        create: fn() -> Box<dyn BaseObject>,
    ) -> Self {
        Self {
            rtti,
            meta: Some(meta),
            constructor: Some(Constructor::Value(create)),
        }
    }

    /// Graph object type.
    pub const fn object(
        rtti: &'static Rtti,
        meta: fn() -> &'static MetaObject,
        create: fn(&Arc<ObjectRegistry>) -> ObjectRef,
    ) -> Self {
        Self {
            rtti,
            meta: Some(meta),
            constructor: Some(Constructor::Object(create)),
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.rtti.class_name()
    }

    pub fn is_abstract(&self) -> bool {
        self.constructor.is_none()
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("class_name", &self.rtti.class_name())
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// Registry of instantiable classes keyed by class name.
pub struct ClassFactory {
    classes: DashMap<&'static str, ClassEntry>,
}

impl ClassFactory {
    /// Create a factory holding only the abstract hierarchy roots.
    pub fn new() -> Self {
        let factory = Self {
            classes: DashMap::new(),
        };
        for rtti in crate::object::root_types() {
            factory
                .classes
                .insert(rtti.class_name(), ClassEntry::abstract_class(rtti));
        }
        factory
    }

    /// Process-wide factory, populated with the bundled data model on first use.
    pub fn global() -> &'static ClassFactory {
        static GLOBAL: OnceLock<ClassFactory> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let factory = ClassFactory::new();
            if let Err(e) = crate::datamodel::register(&factory) {
                log::error!("[factory] data model registration failed: {}", e);
            }
            factory
        })
    }

    /// Register a class. Registering a name twice is a configuration error.
    pub fn register(&self, entry: ClassEntry) -> Result<(), FactoryError> {
        match self.classes.entry(entry.class_name()) {
            Entry::Occupied(_) => Err(FactoryError::DuplicateClass(
                entry.class_name().to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Register a class, replacing any previous registration of that name.
    pub fn register_or_replace(&self, entry: ClassEntry) -> Option<ClassEntry> {
        let previous = self.classes.insert(entry.class_name(), entry);
        if previous.is_some() {
            log::debug!("[factory] replaced registration of {}", entry.class_name());
        }
        previous
    }

    /// Remove a registration.
    pub fn unregister(&self, class_name: &str) -> Option<ClassEntry> {
        self.classes.remove(class_name).map(|(_, entry)| entry)
    }

    /// Look up a registration.
    pub fn find(&self, class_name: &str) -> Option<ClassEntry> {
        self.classes.get(class_name).map(|entry| *entry)
    }

    /// Create an instance of `class_name`, `None` if unknown or abstract.
    pub fn create(&self, class_name: &str, registry: &Arc<ObjectRegistry>) -> Option<Instance> {
        let entry = self.find(class_name)?;
        match entry.constructor? {
            Constructor::Value(create) => Some(Instance::Value(create())),
            Constructor::Object(create) => Some(Instance::Object(create(registry))),
        }
    }

    /// Create a graph object of `class_name`.
    pub fn create_object(
        &self,
        class_name: &str,
        registry: &Arc<ObjectRegistry>,
    ) -> Option<ObjectRef> {
        self.create(class_name, registry)?.into_object()
    }

    /// Create an embedded value of `class_name`.
    pub fn create_value(&self, class_name: &str) -> Option<Box<dyn BaseObject>> {
        match self.find(class_name)?.constructor? {
            Constructor::Value(create) => Some(create()),
            Constructor::Object(_) => None,
        }
    }

    /// Reverse lookup from a type descriptor.
    pub fn class_name(&self, rtti: &Rtti) -> Option<&'static str> {
        self.find(rtti.class_name()).map(|entry| entry.class_name())
    }

    /// Type descriptor of a registered class.
    pub fn type_info(&self, class_name: &str) -> Option<&'static Rtti> {
        self.find(class_name).map(|entry| entry.rtti)
    }

    /// Meta description of a registered class.
    pub fn meta_object(&self, class_name: &str) -> Option<&'static MetaObject> {
        self.find(class_name)?.meta.map(|meta| meta())
    }

    /// Returns true when `derived` names `base` or one of its subtypes.
    /// Unknown names never match.
    pub fn is_type_of(&self, base: &str, derived: &str) -> bool {
        match (self.type_info(base), self.type_info(derived)) {
            (Some(base), Some(derived)) => derived.is_type_of(base),
            _ => false,
        }
    }

    /// Sorted list of registered class names.
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.iter().map(|entry| *entry.key()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered classes, abstract roots included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassFactory")
            .field("classes", &self.class_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Comment, Pick, RealQuantity};
    use crate::object::{Class, ObjectType};

    #[test]
    fn test_unknown_class_is_not_fatal() {
        let factory = ClassFactory::global();
        let registry = ObjectRegistry::new();
        assert!(factory.create("UnknownTypeName", &registry).is_none());
        assert!(factory.create("Object", &registry).is_none());
        assert!(!factory.is_type_of("Object", "UnknownTypeName"));
    }

    #[test]
    fn test_is_type_of_direction() {
        let factory = ClassFactory::global();
        for name in ["Pick", "Origin", "Arrival", "Comment", "EventParameters"] {
            assert!(factory.is_type_of("Object", name), "{} is an Object", name);
            assert!(!factory.is_type_of(name, "Object"));
        }
        assert!(factory.is_type_of("PublicObject", "Pick"));
        assert!(!factory.is_type_of("PublicObject", "Comment"));
        assert!(factory.is_type_of("BaseObject", "RealQuantity"));
    }

    #[test]
    fn test_create_by_name() {
        let factory = ClassFactory::global();
        let registry = ObjectRegistry::new();

        let pick = factory
            .create_object("Pick", &registry)
            .expect("Pick is registered");
        assert_eq!(pick.class_name(), "Pick");
        assert!(pick.downcast::<Pick>().is_some());

        let quantity = factory.create_value("RealQuantity").expect("value type");
        assert!(quantity.as_any().downcast_ref::<RealQuantity>().is_some());
        assert!(factory.create_object("RealQuantity", &registry).is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let factory = ClassFactory::new();
        let entry = ClassEntry::object(Comment::type_info(), Comment::meta_object, |registry| {
            ObjectRef::new(Comment::instantiate(registry))
        });
        assert!(factory.register(entry).is_ok());
        assert_eq!(
            factory.register(entry),
            Err(FactoryError::DuplicateClass("Comment".to_string()))
        );
        assert!(factory.register_or_replace(entry).is_some());
        assert_eq!(factory.class_name(Comment::type_info()), Some("Comment"));
        assert!(factory.unregister("Comment").is_some());
        assert!(factory.find("Comment").is_none());
    }
}
