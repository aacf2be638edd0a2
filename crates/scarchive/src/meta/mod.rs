// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reflective property descriptions.
//!
//! Every serializable class exposes a static [`MetaObject`]: an ordered list
//! of [`MetaProperty`] descriptors plus a link to the base class description.
//! Properties carry bound accessors, so generic code can read and write any
//! field by name through [`Value`] without knowing the concrete type.
//!
//! # Example
//!
//! ```rust
//! use scarchive::datamodel::RealQuantity;
//! use scarchive::meta::Value;
//! use scarchive::object::Class;
//!
//! let meta = RealQuantity::meta_object();
//! let mut quantity = RealQuantity::new(4.5);
//!
//! meta.write(&mut quantity, "uncertainty", Value::from(0.25f64)).unwrap();
//! assert_eq!(meta.read(&quantity, "value").unwrap(), Value::from(4.5f64));
//! assert_eq!(
//!     meta.property("uncertainty").unwrap().read_string(&quantity).unwrap(),
//!     "0.25"
//! );
//! ```

mod enumeration;
mod object;
mod property;
mod value;

#[cfg(test)]
mod tests;

pub use enumeration::{EnumType, MetaEnum};
pub use object::MetaObject;
pub use property::{MetaProperty, PropertyFlags, PropertyValue};
pub use value::{
    format_time, parse_bool, parse_time, Complex, FromValue, IntoValue, Scalar, Time, Value,
    ValueKind, ValueType,
};

use std::fmt;

/// Errors raised by property access.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaError {
    PropertyNotFound(String),
    TypeMismatch { expected: String, got: String },
    NotAnArray(String),
    IndexOutOfBounds { index: usize, len: usize },
    InvalidOperation(String),
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertyNotFound(name) => write!(f, "Property not found: {}", name),
            Self::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, got)
            }
            Self::NotAnArray(name) => write!(f, "Property is not an array: {}", name),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Index out of bounds: {} >= {}", index, len)
            }
            Self::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for MetaError {}
