// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field codecs driven by the archive engine.
//!
//! One [`Archivable::archive_named`] call reads or writes a field depending on
//! the archive direction, so a class's `serialize` body is written once.

use super::Archive;
use crate::meta::{FromValue, IntoValue, Scalar, Value, ValueKind, ValueType};

/// A value that can be (de)serialized as a named field.
pub trait Archivable: Sized {
    /// Class name passed to the locate hooks, `None` for primitives.
    fn target_class() -> Option<&'static str> {
        None
    }

    /// Fresh instance used before reading an optional value.
    fn blank() -> Self;

    /// Read the value at the current archive location.
    fn read_located(&mut self, ar: &mut dyn Archive);

    /// Write the value at the current archive location.
    fn write_located(&mut self, ar: &mut dyn Archive);

    /// Value taken when the field is missing on read. `None` lowers the
    /// archive validity instead.
    fn missing() -> Option<Self> {
        None
    }

    /// Locate the field and read or write it.
    fn archive_named(ar: &mut dyn Archive, name: &str, value: &mut Self) {
        if ar.is_reading() {
            if ar.find_object(name, Self::target_class(), false) {
                value.read_located(ar);
            } else if let Some(default) = Self::missing() {
                *value = default;
            } else {
                ar.state_mut().valid = false;
            }
        } else {
            ar.find_object(name, Self::target_class(), false);
            value.write_located(ar);
        }
    }
}

impl<T: Scalar + Default> Archivable for T {
    fn blank() -> Self {
        T::default()
    }

    fn read_located(&mut self, ar: &mut dyn Archive) {
        if let Some(value) = ar.read_value(ValueType::scalar(T::KIND)) {
            match T::from_value(&value) {
                Ok(v) => *self = v,
                Err(_) => ar.set_validity(false),
            }
        }
    }

    fn write_located(&mut self, ar: &mut dyn Archive) {
        ar.write_value(&self.clone().into_value());
    }

    fn missing() -> Option<Self> {
        // A missing string is an empty string, everything else is an error.
        if T::KIND == ValueKind::String {
            T::from_value(&Value::String(String::new())).ok()
        } else {
            None
        }
    }
}

impl<T: Scalar> Archivable for Vec<T> {
    fn blank() -> Self {
        Vec::new()
    }

    fn read_located(&mut self, ar: &mut dyn Archive) {
        if let Some(value) = ar.read_value(ValueType::list(T::KIND)) {
            match Vec::<T>::from_value(&value) {
                Ok(v) => *self = v,
                Err(_) => ar.set_validity(false),
            }
        }
    }

    fn write_located(&mut self, ar: &mut dyn Archive) {
        ar.write_value(&self.clone().into_value());
    }

    // Primitive lists bypass the object search: no validity change when
    // the field is missing.
    fn archive_named(ar: &mut dyn Archive, name: &str, value: &mut Self) {
        if ar.locate_object_by_name(name, None, false) {
            if ar.is_reading() {
                value.read_located(ar);
            } else {
                value.write_located(ar);
            }
        }
    }
}

impl<T: Archivable> Archivable for Option<T> {
    fn target_class() -> Option<&'static str> {
        T::target_class()
    }

    fn blank() -> Self {
        None
    }

    fn read_located(&mut self, ar: &mut dyn Archive) {
        let mut value = T::blank();
        value.read_located(ar);
        *self = Some(value);
    }

    fn write_located(&mut self, ar: &mut dyn Archive) {
        if let Some(value) = self {
            value.write_located(ar);
        }
    }

    fn archive_named(ar: &mut dyn Archive, name: &str, value: &mut Self) {
        if ar.is_reading() {
            if !ar.find_object(name, T::target_class(), true) {
                *value = None;
                return;
            }
            let previous = ar.success();
            ar.state_mut().valid = true;
            let mut item = T::blank();
            item.read_located(ar);
            let ok = ar.success();
            *value = if ok { Some(item) } else { None };
            let strict = ar.is_strict();
            ar.state_mut().valid = if strict { previous && ok } else { previous };
        } else {
            match value {
                Some(item) => {
                    ar.find_object(name, T::target_class(), true);
                    item.write_located(ar);
                }
                None => {
                    let first = ar.state().first;
                    ar.locate_null_object_by_name(name, T::target_class(), first);
                }
            }
        }
    }
}

/// Implements [`Archivable`] for an [`EnumType`](crate::meta::EnumType).
/// Enumerations travel as their key name.
#[macro_export]
macro_rules! impl_archivable_enum {
    ($ty:ty) => {
        impl $crate::archive::Archivable for $ty {
            fn blank() -> Self {
                <$ty as ::core::default::Default>::default()
            }

            fn read_located(&mut self, ar: &mut dyn $crate::archive::Archive) {
                let ty = $crate::meta::ValueType::scalar($crate::meta::ValueKind::String);
                if let Some(value) = ar.read_value(ty) {
                    match value
                        .as_str()
                        .and_then(<$ty as $crate::meta::EnumType>::from_name)
                    {
                        Some(v) => *self = v,
                        None => ar.set_validity(false),
                    }
                }
            }

            fn write_located(&mut self, ar: &mut dyn $crate::archive::Archive) {
                let name = <$ty as $crate::meta::EnumType>::to_name(*self);
                ar.write_value(&$crate::meta::Value::String(name.to_string()));
            }
        }
    };
}

/// Implements [`Archivable`] for an embedded value class. The class is
/// serialized in place through its own `serialize` body.
#[macro_export]
macro_rules! impl_archivable_class {
    ($ty:ty) => {
        impl $crate::archive::Archivable for $ty {
            fn target_class() -> Option<&'static str> {
                Some(<$ty as $crate::object::Class>::type_info().class_name())
            }

            fn blank() -> Self {
                <$ty as ::core::default::Default>::default()
            }

            fn read_located(&mut self, ar: &mut dyn $crate::archive::Archive) {
                ar.serialize_class(self);
            }

            fn write_located(&mut self, ar: &mut dyn $crate::archive::Archive) {
                ar.serialize_class(self);
            }
        }
    };
}
