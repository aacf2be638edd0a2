// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{MetaError, MetaProperty, Value};
use crate::object::BaseObject;
use crate::rtti::Rtti;
use std::fmt;

/// Property table of one class, chained to its base class table.
///
/// Lookups search the local table first and then walk the base chain, so a
/// property redeclared in a derived class shadows the base entry without
/// removing it.
pub struct MetaObject {
    rtti: &'static Rtti,
    base: Option<&'static MetaObject>,
    properties: Vec<MetaProperty>,
}

impl MetaObject {
    pub fn new(rtti: &'static Rtti, base: Option<&'static MetaObject>) -> Self {
        Self {
            rtti,
            base,
            properties: Vec::new(),
        }
    }

    /// Append a property. Declaration order is serialization order.
    pub fn with_property(mut self, property: MetaProperty) -> Self {
        debug_assert!(
            self.local_property(property.name()).is_none(),
            "duplicate property {} in {}",
            property.name(),
            self.rtti
        );
        self.properties.push(property);
        self
    }

    pub fn rtti(&self) -> &'static Rtti {
        self.rtti
    }

    pub fn base(&self) -> Option<&'static MetaObject> {
        self.base
    }

    fn local_property(&self, name: &str) -> Option<&MetaProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Find a property by name along the inheritance chain.
    pub fn property(&self, name: &str) -> Option<&MetaProperty> {
        self.local_property(name)
            .or_else(|| self.base.and_then(|base| base.property(name)))
    }

    /// Number of properties including every base table.
    pub fn property_count(&self) -> usize {
        self.properties.len() + self.base.map_or(0, MetaObject::property_count)
    }

    /// Positional access, base class properties first.
    pub fn property_at(&self, index: usize) -> Option<&MetaProperty> {
        let inherited = self.base.map_or(0, MetaObject::property_count);
        if index < inherited {
            self.base.and_then(|base| base.property_at(index))
        } else {
            self.properties.get(index - inherited)
        }
    }

    /// Effective property list, base first. Base entries shadowed by a
    /// derived declaration are replaced in place by the derived one.
    pub fn properties(&self) -> Vec<&MetaProperty> {
        let mut list = self.base.map_or_else(Vec::new, MetaObject::properties);
        for property in &self.properties {
            match list.iter_mut().find(|p| p.name() == property.name()) {
                Some(slot) => *slot = property,
                None => list.push(property),
            }
        }
        list
    }

    /// Read a property value by name.
    pub fn read(&self, obj: &dyn BaseObject, name: &str) -> Result<Value, MetaError> {
        self.property(name)
            .ok_or_else(|| MetaError::PropertyNotFound(name.to_string()))?
            .read(obj)
    }

    /// Write a property value by name.
    pub fn write(
        &self,
        obj: &mut dyn BaseObject,
        name: &str,
        value: Value,
    ) -> Result<(), MetaError> {
        self.property(name)
            .ok_or_else(|| MetaError::PropertyNotFound(name.to_string()))?
            .write(obj, value)
    }
}

impl fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("class", &self.rtti.class_name())
            .field("base", &self.base.map(|b| b.rtti.class_name()))
            .field("properties", &self.properties)
            .finish()
    }
}
