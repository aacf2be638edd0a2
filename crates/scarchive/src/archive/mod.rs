// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Format-agnostic traversal engine.
//!
//! An archive is either reading or writing for its whole lifetime. Classes
//! implement one `serialize` body against `&mut dyn Archive`; each field call
//! locates the field through the backend hooks and then reads or writes it.
//!
//! Backends implement [`Archive`]: state accessors plus a small set of hooks
//! that move a cursor over the underlying document (XML nodes, database
//! columns) and convert primitive [`Value`]s. Everything else lives in the
//! generic engine on `dyn Archive`.
//!
//! A bad field never aborts a read. It lowers the archive validity and the
//! traversal continues; callers check [`Archive::success`] afterwards.

mod archivable;
mod hint;

pub use archivable::Archivable;
pub use hint::Hint;

use crate::factory::ClassFactory;
use crate::meta::{MetaProperty, Value, ValueKind, ValueType};
use crate::object::{BaseObject, ObjectRef, ObjectRegistry, ObjectType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Schema version tag `major.minor`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Single integer ordering key.
    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }

    /// Parse `M.m`. Missing or malformed parts read as 0.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.trim().splitn(2, '.');
        let major = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Value of an archive property.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveProperty {
    Int(i64),
    Double(f64),
    String(String),
}

/// Mutable state shared by every backend.
pub struct ArchiveState {
    pub reading: bool,
    pub version: Version,
    pub hint: Hint,
    pub valid: bool,
    pub strict: bool,
    /// Set while locating the first item of a sequence.
    pub first: bool,
    /// Result of the last object search.
    pub found: bool,
    pub properties: HashMap<String, ArchiveProperty>,
    pub registry: Arc<ObjectRegistry>,
    pub factory: &'static ClassFactory,
}

impl ArchiveState {
    /// State bound to the process-wide registry and factory.
    pub fn new(reading: bool) -> Self {
        Self::with_registry(reading, ObjectRegistry::global())
    }

    pub fn with_registry(reading: bool, registry: Arc<ObjectRegistry>) -> Self {
        Self {
            reading,
            version: Version::default(),
            hint: Hint::NONE,
            valid: true,
            strict: false,
            first: true,
            found: false,
            properties: HashMap::new(),
            registry,
            factory: ClassFactory::global(),
        }
    }

    /// Back to the initial state of a fresh session, keeping the registry,
    /// factory, strict flag and properties.
    pub fn reset(&mut self, reading: bool, version: Version) {
        self.reading = reading;
        self.version = version;
        self.hint = Hint::NONE;
        self.valid = true;
        self.first = true;
        self.found = false;
    }
}

impl fmt::Debug for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveState")
            .field("reading", &self.reading)
            .field("version", &self.version)
            .field("hint", &self.hint)
            .field("valid", &self.valid)
            .field("strict", &self.strict)
            .finish()
    }
}

/// A bidirectional archive backend.
pub trait Archive {
    fn state(&self) -> &ArchiveState;

    fn state_mut(&mut self) -> &mut ArchiveState;

    fn is_reading(&self) -> bool {
        self.state().reading
    }

    fn version(&self) -> Version {
        self.state().version
    }

    fn set_version(&mut self, version: Version) {
        self.state_mut().version = version;
    }

    fn is_lower_version(&self, major: u16, minor: u16) -> bool {
        self.version() < Version::new(major, minor)
    }

    fn is_version(&self, major: u16, minor: u16) -> bool {
        self.version() == Version::new(major, minor)
    }

    fn is_higher_version(&self, major: u16, minor: u16) -> bool {
        self.version() > Version::new(major, minor)
    }

    /// True when the archive version is at least `major.minor`.
    fn supports_version(&self, major: u16, minor: u16) -> bool {
        !self.is_lower_version(major, minor)
    }

    fn hint(&self) -> Hint {
        self.state().hint
    }

    fn set_hint(&mut self, hint: Hint) {
        self.state_mut().hint = hint;
    }

    /// Mark the current object valid or invalid. Backends override this to
    /// report where the bad content was found.
    fn set_validity(&mut self, valid: bool) {
        self.state_mut().valid = valid;
    }

    fn success(&self) -> bool {
        self.state().valid
    }

    fn is_strict(&self) -> bool {
        self.state().strict
    }

    /// In strict mode a malformed optional value invalidates the object
    /// instead of being dropped silently.
    fn set_strict(&mut self, strict: bool) {
        self.state_mut().strict = strict;
    }

    fn set_property(&mut self, name: &str, value: ArchiveProperty) {
        self.state_mut().properties.insert(name.to_string(), value);
    }

    fn property(&self, name: &str) -> Option<&ArchiveProperty> {
        self.state().properties.get(name)
    }

    fn registry(&self) -> Arc<ObjectRegistry> {
        self.state().registry.clone()
    }

    /// Move to the first field called `name`. `target_class` is set for class
    /// values; `nullable` tells whether the field may be absent.
    fn locate_object_by_name(&mut self, name: &str, target_class: Option<&str>, nullable: bool)
        -> bool;

    /// Move to the next sibling matching `name`.
    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool;

    /// Record an absent value on write.
    fn locate_null_object_by_name(
        &mut self,
        _name: &str,
        _target_class: Option<&str>,
        _first: bool,
    ) {
    }

    fn read_sequence(&mut self) {}

    fn write_sequence(&mut self, _size: usize) {}

    /// Class name of the located object, `None` when it cannot be told.
    fn determine_class_name(&mut self) -> Option<String>;

    /// Announce the class of the object about to be written.
    fn set_class_name(&mut self, class_name: Option<&str>);

    /// Run `body` with the located node as the current context.
    fn serialize_nested(&mut self, body: &mut dyn FnMut(&mut dyn Archive));

    /// Read a primitive at the current location. Returns `None` when the
    /// content is malformed, after lowering the validity.
    fn read_value(&mut self, ty: ValueType) -> Option<Value>;

    /// Write a primitive at the current location.
    fn write_value(&mut self, value: &Value);
}

impl<'a> dyn Archive + 'a {
    /// Locate `name` as the first or the next item of a sequence and record
    /// whether it was found.
    pub fn find_object(&mut self, name: &str, target_class: Option<&str>, nullable: bool) -> bool {
        let found = if self.state().first {
            self.locate_object_by_name(name, target_class, nullable)
        } else {
            self.locate_next_object_by_name(name, target_class)
        };
        self.state_mut().found = found;
        found
    }

    fn with_hint<R>(&mut self, hint: Hint, body: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.hint();
        self.set_hint(hint.child_of(previous));
        let result = body(self);
        self.set_hint(previous);
        result
    }

    /// Read or write one named field.
    pub fn field<T: Archivable>(&mut self, name: &str, value: &mut T, hint: Hint) {
        self.with_hint(hint, |ar| T::archive_named(ar, name, value));
    }

    /// Serialize an embedded class at the current location.
    pub fn serialize_class(&mut self, object: &mut dyn BaseObject) {
        if !self.is_reading() {
            let name = if self.hint().static_type {
                None
            } else {
                Some(object.class_name())
            };
            self.set_class_name(name);
        }
        self.enter(&mut |ar| object.serialize(ar));
    }

    /// Run `body` inside the located node. Field lookups inside start a
    /// fresh sequence whatever the position in the enclosing one.
    fn enter(&mut self, body: &mut dyn FnMut(&mut dyn Archive)) {
        let first = self.state().first;
        self.state_mut().first = true;
        self.serialize_nested(body);
        self.state_mut().first = first;
    }

    /// Read or write a child container.
    ///
    /// On write every item is written and an empty vector is returned. On
    /// read the container is left alone and the successfully read children
    /// are returned for the owner to add. A bad child is skipped without
    /// invalidating the owner unless the archive is strict.
    pub fn children<T: ObjectType>(
        &mut self,
        name: &str,
        items: &[Arc<RwLock<T>>],
        hint: Hint,
    ) -> Vec<Arc<RwLock<T>>> {
        self.with_hint(hint, |ar| {
            if ar.is_reading() {
                ar.read_children::<T>(name)
            } else {
                ar.write_children(name, items.iter().map(|item| ObjectRef::new(item.clone())));
                Vec::new()
            }
        })
    }

    fn read_children<T: ObjectType>(&mut self, name: &str) -> Vec<Arc<RwLock<T>>> {
        let target = T::type_info().class_name();
        let previous = self.success();
        let mut list = Vec::new();
        self.read_sequence();
        self.state_mut().first = true;
        loop {
            self.state_mut().valid = true;
            if !self.find_object(name, Some(target), true) {
                break;
            }
            let item = self.read_located_object(target);
            if self.success() {
                if let Some(child) = item.and_then(|obj| obj.downcast::<T>()) {
                    list.push(child);
                }
            }
            self.state_mut().first = false;
        }
        self.state_mut().first = true;
        let ok = self.success();
        let strict = self.is_strict();
        self.state_mut().valid = if strict { previous && ok } else { previous };
        list
    }

    fn write_children(&mut self, name: &str, items: impl ExactSizeIterator<Item = ObjectRef>) {
        self.write_sequence(items.len());
        self.state_mut().first = true;
        for item in items {
            let target = item.class_name();
            self.find_object(name, Some(target), true);
            self.write_located_object(&item);
            self.state_mut().first = false;
        }
        self.state_mut().first = true;
    }

    /// Instantiate and read the object at the current location. The class
    /// comes from the backend unless the hint says it is static.
    ///
    /// Returns `None` for unknown or unrelated classes and for objects that
    /// did not read back cleanly.
    pub fn read_located_object(&mut self, target_class: &str) -> Option<ObjectRef> {
        let class_name = if self.hint().static_type {
            target_class.to_string()
        } else {
            let class_name = self.determine_class_name()?;
            if !self.state().factory.is_type_of(target_class, &class_name) {
                log::debug!(
                    "[archive] {} is not a {}, skipped",
                    class_name,
                    target_class
                );
                self.state_mut().valid = false;
                return None;
            }
            class_name
        };

        let registry = self.registry();
        let Some(object) = self.state().factory.create_object(&class_name, &registry) else {
            log::warn!("[archive] class not found: {}", class_name);
            self.state_mut().valid = false;
            return None;
        };

        {
            let mut guard = object.write();
            self.enter(&mut |ar| guard.serialize(ar));
        }

        if self.success() {
            Some(object)
        } else {
            None
        }
    }

    fn write_located_object(&mut self, object: &ObjectRef) {
        let name = if self.hint().static_type {
            None
        } else {
            Some(object.class_name())
        };
        self.set_class_name(name);
        let mut guard = object.write();
        self.enter(&mut |ar| guard.serialize(ar));
    }

    /// Read a root object of type `T`.
    pub fn read_object<T: ObjectType>(&mut self) -> Option<Arc<RwLock<T>>> {
        self.read_any(T::type_info().class_name())
            .and_then(|obj| obj.downcast::<T>())
    }

    /// Read a root object of any class derived from `base_class`.
    pub fn read_any(&mut self, base_class: &str) -> Option<ObjectRef> {
        if !self.find_object(base_class, Some(base_class), true) {
            return None;
        }
        self.read_located_object(base_class)
    }

    /// Write a root object.
    pub fn write_object(&mut self, object: &ObjectRef) {
        self.write_named("", object);
    }

    /// Write an object under `name`, an empty name meaning unnamed.
    pub fn write_named(&mut self, name: &str, object: &ObjectRef) {
        let target = object.class_name();
        self.find_object(name, Some(target), true);
        self.write_located_object(object);
    }

    /// Walk the properties of `object` generically, in either direction,
    /// using each property's default hint.
    pub fn reflect(&mut self, object: &mut dyn BaseObject) {
        let meta = object.meta();
        for property in meta.properties() {
            self.with_hint(property.hint(), |ar| {
                if property.is_array() {
                    ar.reflect_array(property, object);
                } else if property.is_class() {
                    ar.reflect_class(property, object);
                } else {
                    ar.reflect_value(property, object);
                }
            });
        }
    }

    fn reflect_value(&mut self, property: &MetaProperty, object: &mut dyn BaseObject) {
        let name = property.name();
        let optional = property.is_optional();
        let ty = if property.is_enum() {
            ValueType::scalar(ValueKind::String)
        } else {
            match property.value_type() {
                Some(ty) => ty,
                None => return,
            }
        };

        if !self.is_reading() {
            let value = match property.read(object) {
                Ok(value) => value,
                Err(e) => {
                    log::error!("[archive] {}: {}", name, e);
                    return;
                }
            };
            if value.is_none() {
                let first = self.state().first;
                self.locate_null_object_by_name(name, None, first);
                return;
            }
            let value = match (property.enumerator(), &value) {
                (Some(meta), Value::Enum(v)) => {
                    Value::String(meta.name_for(*v).unwrap_or_default().to_string())
                }
                _ => value,
            };
            if ty.list {
                if self.locate_object_by_name(name, None, false) {
                    self.write_value(&value);
                }
            } else {
                self.find_object(name, None, optional);
                self.write_value(&value);
            }
            return;
        }

        let located = if ty.list {
            self.locate_object_by_name(name, None, false)
        } else {
            self.find_object(name, None, optional)
        };
        if !located {
            if ty.list {
                return;
            }
            let missing = if optional {
                Some(Value::None)
            } else if ty.kind == ValueKind::String {
                Some(Value::String(String::new()))
            } else {
                None
            };
            match missing {
                Some(value) => {
                    let _ = property.write(object, value);
                }
                None => self.state_mut().valid = false,
            }
            return;
        }

        let previous = self.success();
        if optional {
            self.state_mut().valid = true;
        }
        let value = self.read_value(ty).and_then(|value| match property.enumerator() {
            Some(meta) => value.as_str().and_then(|s| meta.value_for(s)).map(Value::Enum),
            None => Some(value),
        });
        match value {
            Some(value) => {
                if let Err(e) = property.write(object, value) {
                    log::warn!("[archive] {}: {}", name, e);
                    self.set_validity(false);
                }
            }
            None => self.set_validity(false),
        }
        if optional {
            let ok = self.success();
            if !ok {
                let _ = property.write(object, Value::None);
            }
            let strict = self.is_strict();
            self.state_mut().valid = if strict { previous && ok } else { previous };
        }
    }

    fn reflect_class(&mut self, property: &MetaProperty, object: &mut dyn BaseObject) {
        let name = property.name();
        let target = Some(property.type_name());
        let optional = property.is_optional();

        if !self.is_reading() {
            match property.read(object) {
                Ok(Value::Class(mut value)) => {
                    self.find_object(name, target, optional);
                    self.serialize_class(value.as_mut());
                }
                Ok(_) => {
                    let first = self.state().first;
                    self.locate_null_object_by_name(name, target, first);
                }
                Err(e) => log::error!("[archive] {}: {}", name, e),
            }
            return;
        }

        if !self.find_object(name, target, optional) {
            if optional {
                let _ = property.write(object, Value::None);
            } else {
                self.state_mut().valid = false;
            }
            return;
        }
        let Some(mut value) = self.state().factory.create_value(property.type_name()) else {
            self.state_mut().valid = false;
            return;
        };
        let previous = self.success();
        if optional {
            self.state_mut().valid = true;
        }
        self.serialize_class(value.as_mut());
        let ok = self.success();
        if ok || !optional {
            if let Err(e) = property.write(object, Value::Class(value)) {
                log::warn!("[archive] {}: {}", name, e);
                self.set_validity(false);
            }
        } else {
            let _ = property.write(object, Value::None);
        }
        if optional {
            let strict = self.is_strict();
            self.state_mut().valid = if strict { previous && ok } else { previous };
        }
    }

    fn reflect_array(&mut self, property: &MetaProperty, object: &mut dyn BaseObject) {
        let name = property.name();
        let target = property.type_name();

        if !self.is_reading() {
            let count = property.array_element_count(object).unwrap_or(0);
            let items = (0..count)
                .filter_map(|i| property.array_object(object, i))
                .filter_map(|value| value.as_object().cloned())
                .collect::<Vec<_>>();
            self.write_children(name, items.into_iter());
            return;
        }

        let previous = self.success();
        self.read_sequence();
        self.state_mut().first = true;
        loop {
            self.state_mut().valid = true;
            if !self.find_object(name, Some(target), true) {
                break;
            }
            let item = self.read_located_object(target);
            if self.success() {
                if let Some(child) = item {
                    property.array_add_object(object, Value::Object(child));
                }
            }
            self.state_mut().first = false;
        }
        self.state_mut().first = true;
        let ok = self.success();
        let strict = self.is_strict();
        self.state_mut().valid = if strict { previous && ok } else { previous };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!(Version::parse("0.13"), Version::new(0, 13));
        assert_eq!(Version::parse("2"), Version::new(2, 0));
        assert_eq!(Version::parse(""), Version::new(0, 0));
        assert_eq!(Version::parse("x.y"), Version::new(0, 0));
        assert!(Version::new(1, 0) > Version::new(0, 13));
        assert!(Version::new(0, 13).packed() < Version::new(1, 0).packed());
        assert_eq!(Version::new(0, 13).to_string(), "0.13");
    }
}
