// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{
    EnumType, FromValue, IntoValue, MetaEnum, MetaError, Scalar, Value, ValueKind, ValueType,
};
use crate::archive::Hint;
use crate::object::{BaseObject, ObjectRef, ObjectType};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

type ReadFn = Box<dyn Fn(&dyn BaseObject) -> Result<Value, MetaError> + Send + Sync>;
type WriteFn = Box<dyn Fn(&mut dyn BaseObject, Value) -> Result<(), MetaError> + Send + Sync>;
type CountFn = Box<dyn Fn(&dyn BaseObject) -> Option<usize> + Send + Sync>;
type AtFn = Box<dyn Fn(&dyn BaseObject, usize) -> Option<Value> + Send + Sync>;
type AddFn = Box<dyn Fn(&mut dyn BaseObject, Value) -> bool + Send + Sync>;
type RemoveFn = Box<dyn Fn(&mut dyn BaseObject, usize) -> bool + Send + Sync>;

/// Typed value a property can be declared with.
///
/// Gives the text codec the kind to parse into, which the value alone cannot
/// tell for absent optionals and empty lists.
pub trait PropertyValue: FromValue + IntoValue {
    /// Whether absence is a legal state.
    const OPTIONAL: bool = false;

    fn value_type() -> ValueType;
}

impl<T: Scalar> PropertyValue for T {
    fn value_type() -> ValueType {
        ValueType::scalar(T::KIND)
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    const OPTIONAL: bool = true;

    fn value_type() -> ValueType {
        T::value_type()
    }
}

impl<T: Scalar> PropertyValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::list(T::KIND)
    }
}

/// Orthogonal descriptor flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Holds 0..N child objects.
    pub array: bool,
    /// Value is a serializable class rather than a primitive.
    pub class: bool,
    /// Part of the composite index of a non-public object.
    pub index: bool,
    /// Holds the publicID of another object.
    pub reference: bool,
    /// Value may be absent.
    pub optional: bool,
}

struct ArrayOps {
    count: CountFn,
    at: AtFn,
    add: AddFn,
    remove: RemoveFn,
}

/// Descriptor of one named property of a class.
pub struct MetaProperty {
    name: &'static str,
    type_name: &'static str,
    flags: PropertyFlags,
    enumeration: Option<&'static MetaEnum>,
    value_type: Option<ValueType>,
    hint: Hint,
    reader: Option<ReadFn>,
    writer: Option<WriteFn>,
    array: Option<ArrayOps>,
}

fn downcast<T: BaseObject>(obj: &dyn BaseObject) -> Result<&T, MetaError> {
    obj.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| MetaError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            got: obj.class_name().to_string(),
        })
}

fn downcast_mut<T: BaseObject>(obj: &mut dyn BaseObject) -> Result<&mut T, MetaError> {
    let got = obj.class_name();
    obj.as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| MetaError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            got: got.to_string(),
        })
}

impl MetaProperty {
    fn bare(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            flags: PropertyFlags::default(),
            enumeration: None,
            value_type: None,
            hint: Hint::NONE,
            reader: None,
            writer: None,
            array: None,
        }
    }

    /// Property backed by a getter/setter pair on `T`.
    ///
    /// Optional values are flagged automatically from the declared type when
    /// `V` is an `Option`; call [`optional`](Self::optional) to force it.
    /// Embedded classes are flagged as class valued.
    pub fn simple<T, V>(
        name: &'static str,
        type_name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self
    where
        T: BaseObject,
        V: PropertyValue + 'static,
    {
        let mut property = Self::bare(name, type_name);
        property.flags.optional = V::OPTIONAL;
        property.flags.class = V::value_type().kind == ValueKind::Class;
        property.value_type = Some(V::value_type());
        property.reader = Some(Box::new(move |obj| Ok(get(downcast::<T>(obj)?).into_value())));
        property.writer = Some(Box::new(move |obj, value| {
            let target = downcast_mut::<T>(obj)?;
            set(target, V::from_value(&value)?);
            Ok(())
        }));
        property
    }

    /// Property of an abstract base class, accessed through the trait object.
    pub fn erased<V>(
        name: &'static str,
        type_name: &'static str,
        get: fn(&dyn BaseObject) -> Result<V, MetaError>,
        set: fn(&mut dyn BaseObject, V) -> Result<(), MetaError>,
    ) -> Self
    where
        V: PropertyValue + 'static,
    {
        let mut property = Self::bare(name, type_name);
        property.flags.optional = V::OPTIONAL;
        property.value_type = Some(V::value_type());
        property.reader = Some(Box::new(move |obj| Ok(get(obj)?.into_value())));
        property.writer = Some(Box::new(move |obj, value| set(obj, V::from_value(&value)?)));
        property
    }

    /// Enumeration property, rendered by key name in text form.
    pub fn enumeration<T, E>(
        name: &'static str,
        get: fn(&T) -> Option<E>,
        set: fn(&mut T, Option<E>),
    ) -> Self
    where
        T: BaseObject,
        E: EnumType,
    {
        let mut property = Self::bare(name, E::meta_enum().name());
        property.flags.optional = true;
        property.enumeration = Some(E::meta_enum());
        property.value_type = Some(ValueType::scalar(ValueKind::Enum));
        property.reader = Some(Box::new(move |obj| {
            Ok(get(downcast::<T>(obj)?).map_or(Value::None, |e| Value::Enum(e.to_i32())))
        }));
        property.writer = Some(Box::new(move |obj, value| {
            let target = downcast_mut::<T>(obj)?;
            let decoded = match &value {
                Value::None => None,
                Value::Enum(v) | Value::Int32(v) => Some(E::from_i32(*v).ok_or_else(|| {
                    MetaError::TypeMismatch {
                        expected: E::meta_enum().name().to_string(),
                        got: v.to_string(),
                    }
                })?),
                Value::String(s) => Some(E::from_name(s).ok_or_else(|| MetaError::TypeMismatch {
                    expected: E::meta_enum().name().to_string(),
                    got: s.clone(),
                })?),
                other => {
                    return Err(MetaError::TypeMismatch {
                        expected: E::meta_enum().name().to_string(),
                        got: other.describe(),
                    })
                }
            };
            set(target, decoded);
            Ok(())
        }));
        property
    }

    /// Array of child objects of type `C` owned by `T`.
    pub fn array<T, C>(
        name: &'static str,
        count: fn(&T) -> usize,
        at: fn(&T, usize) -> Option<Arc<RwLock<C>>>,
        add: fn(&mut T, Arc<RwLock<C>>) -> bool,
        remove: fn(&mut T, usize) -> bool,
    ) -> Self
    where
        T: BaseObject,
        C: ObjectType,
    {
        let mut property = Self::bare(name, C::type_info().class_name());
        property.flags.array = true;
        property.flags.class = true;
        property.array = Some(ArrayOps {
            count: Box::new(move |obj| downcast::<T>(obj).ok().map(count)),
            at: Box::new(move |obj, i| {
                let target = downcast::<T>(obj).ok()?;
                at(target, i).map(|child| Value::Object(ObjectRef::new(child)))
            }),
            add: Box::new(move |obj, value| {
                let Ok(target) = downcast_mut::<T>(obj) else {
                    return false;
                };
                match value.as_object().and_then(ObjectRef::downcast::<C>) {
                    Some(child) => add(target, child),
                    None => false,
                }
            }),
            remove: Box::new(move |obj, i| match downcast_mut::<T>(obj) {
                Ok(target) => remove(target, i),
                Err(_) => false,
            }),
        });
        property
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    /// Mark as part of the composite index.
    pub fn index(mut self) -> Self {
        self.flags.index = true;
        self
    }

    /// Mark as holding a publicID reference.
    pub fn reference(mut self) -> Self {
        self.flags.reference = true;
        self
    }

    /// Mark as class valued.
    pub fn class(mut self) -> Self {
        self.flags.class = true;
        self
    }

    /// Default archive hint used by generic traversal.
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hint = hint;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type name, e.g. `string`, `datetime` or `RealQuantity`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn is_array(&self) -> bool {
        self.flags.array
    }

    pub fn is_class(&self) -> bool {
        self.flags.class
    }

    pub fn is_index(&self) -> bool {
        self.flags.index
    }

    pub fn is_reference(&self) -> bool {
        self.flags.reference
    }

    pub fn is_optional(&self) -> bool {
        self.flags.optional
    }

    pub fn is_enum(&self) -> bool {
        self.enumeration.is_some()
    }

    pub fn enumerator(&self) -> Option<&'static MetaEnum> {
        self.enumeration
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn hint(&self) -> Hint {
        self.hint
    }

    /// Read the current value from `obj`.
    pub fn read(&self, obj: &dyn BaseObject) -> Result<Value, MetaError> {
        match &self.reader {
            Some(read) => read(obj),
            None => Err(MetaError::InvalidOperation(format!(
                "{} cannot be read as a value",
                self.name
            ))),
        }
    }

    /// Replace the value held by `obj`.
    pub fn write(&self, obj: &mut dyn BaseObject, value: Value) -> Result<(), MetaError> {
        if value.is_none() && !self.flags.optional {
            return Err(MetaError::InvalidOperation(format!(
                "{} is not optional",
                self.name
            )));
        }
        match &self.writer {
            Some(write) => write(obj, value),
            None => Err(MetaError::InvalidOperation(format!(
                "{} cannot be written as a value",
                self.name
            ))),
        }
    }

    /// Text form of the current value. Absent optionals read as an empty
    /// string and enumerations by key name.
    pub fn read_string(&self, obj: &dyn BaseObject) -> Result<String, MetaError> {
        let value = self.read(obj)?;
        match (&value, self.enumeration) {
            (Value::Enum(v), Some(meta)) => {
                meta.name_for(*v)
                    .map(str::to_string)
                    .ok_or_else(|| MetaError::TypeMismatch {
                        expected: meta.name().to_string(),
                        got: v.to_string(),
                    })
            }
            (Value::Class(_) | Value::Object(_), _) => Err(MetaError::InvalidOperation(format!(
                "{} has no text form",
                self.name
            ))),
            _ => Ok(value.to_text(' ')),
        }
    }

    /// Set the value from its text form. An empty string clears an optional
    /// property.
    pub fn write_string(&self, obj: &mut dyn BaseObject, text: &str) -> Result<(), MetaError> {
        if text.is_empty() && self.flags.optional {
            return self.write(obj, Value::None);
        }
        if let Some(meta) = self.enumeration {
            let value = meta.value_for(text).ok_or_else(|| MetaError::TypeMismatch {
                expected: meta.name().to_string(),
                got: text.to_string(),
            })?;
            return self.write(obj, Value::Enum(value));
        }
        let ty = self.value_type.ok_or_else(|| {
            MetaError::InvalidOperation(format!("{} has no text form", self.name))
        })?;
        let value = Value::parse(ty, text, ' ').ok_or_else(|| MetaError::TypeMismatch {
            expected: ty.to_string(),
            got: text.to_string(),
        })?;
        self.write(obj, value)
    }

    /// Number of elements, `None` when the property is not an array.
    pub fn array_element_count(&self, obj: &dyn BaseObject) -> Option<usize> {
        self.array.as_ref().and_then(|ops| (ops.count)(obj))
    }

    /// Element at position `i`.
    pub fn array_object(&self, obj: &dyn BaseObject, i: usize) -> Option<Value> {
        self.array.as_ref().and_then(|ops| (ops.at)(obj, i))
    }

    /// Append an element through the owner's add operation.
    pub fn array_add_object(&self, obj: &mut dyn BaseObject, value: Value) -> bool {
        self.array
            .as_ref()
            .is_some_and(|ops| (ops.add)(obj, value))
    }

    /// Remove the element at position `i`.
    pub fn array_remove_object(&self, obj: &mut dyn BaseObject, i: usize) -> bool {
        self.array.as_ref().is_some_and(|ops| (ops.remove)(obj, i))
    }
}

impl fmt::Debug for MetaProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaProperty")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("flags", &self.flags)
            .finish()
    }
}
