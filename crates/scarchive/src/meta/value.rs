// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic property values.
//!
//! [`Value`] is the tagged union exchanged between the meta layer, the
//! archive engine and the backends. Its text form is the one used by text
//! based formats: XML attributes and element content, database columns.

use super::MetaError;
use crate::object::{BaseObject, ObjectRef};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Time value with microsecond resolution.
pub type Time = DateTime<Utc>;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const TIME_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%MZ",
    "%Y-%m-%dT%H:%M",
];

/// Complex number as stored by the archives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: fmt::Display> fmt::Display for Complex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.re, self.im)
    }
}

/// Primitive kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    ComplexF32,
    ComplexF64,
    String,
    Time,
    Enum,
    Class,
    Object,
}

impl ValueKind {
    /// Name used in property descriptors.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float",
            Self::ComplexF32 => "complex32",
            Self::ComplexF64 => "complex",
            Self::String => "string",
            Self::Time => "datetime",
            Self::Enum => "enum",
            Self::Class => "class",
            Self::Object => "object",
        }
    }
}

/// Kind of a value plus whether it is a homogeneous list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    pub kind: ValueKind,
    pub list: bool,
}

impl ValueType {
    pub const fn scalar(kind: ValueKind) -> Self {
        Self { kind, list: false }
    }

    pub const fn list(kind: ValueKind) -> Self {
        Self { kind, list: true }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "list<{}>", self.kind.type_name())
        } else {
            f.write_str(self.kind.type_name())
        }
    }
}

/// A dynamically typed property value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent optional value.
    None,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    ComplexF32(Complex<f32>),
    ComplexF64(Complex<f64>),
    String(String),
    Time(Time),
    /// Enumeration value, rendered by name through its `MetaEnum`.
    Enum(i32),
    /// Embedded value object such as a quantity.
    Class(Box<dyn BaseObject>),
    /// Shared graph object.
    Object(ObjectRef),
    List(Vec<Value>),
}

impl Value {
    /// Check if value is absent.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Kind of the value, `None` for the absent value and empty lists.
    pub fn value_type(&self) -> Option<ValueType> {
        let kind = match self {
            Self::None => return None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int8(_) => ValueKind::Int8,
            Self::Int16(_) => ValueKind::Int16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float32(_) => ValueKind::Float32,
            Self::Float64(_) => ValueKind::Float64,
            Self::ComplexF32(_) => ValueKind::ComplexF32,
            Self::ComplexF64(_) => ValueKind::ComplexF64,
            Self::String(_) => ValueKind::String,
            Self::Time(_) => ValueKind::Time,
            Self::Enum(_) => ValueKind::Enum,
            Self::Class(_) => ValueKind::Class,
            Self::Object(_) => ValueKind::Object,
            Self::List(items) => {
                return items
                    .first()
                    .and_then(Value::value_type)
                    .map(|t| ValueType::list(t.kind))
            }
        };
        Some(ValueType::scalar(kind))
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Class(obj) => obj.class_name().to_string(),
            Self::Object(obj) => obj.class_name().to_string(),
            Self::List(items) if items.is_empty() => "list".to_string(),
            other => other
                .value_type()
                .map(|t| t.to_string())
                .unwrap_or_default(),
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32, widening smaller integers.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int8(v) => Some(i32::from(*v)),
            Self::Int16(v) => Some(i32::from(*v)),
            Self::Int32(v) | Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64, widening smaller integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            other => other.as_i32().map(i64::from),
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as time.
    pub fn as_time(&self) -> Option<Time> {
        match self {
            Self::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as embedded object.
    pub fn as_class(&self) -> Option<&dyn BaseObject> {
        match self {
            Self::Class(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// Try to get as graph object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Text form of the value. Lists are joined with `delimiter`; absent
    /// values and objects render as an empty string.
    pub fn to_text(&self, delimiter: char) -> String {
        match self {
            Self::None | Self::Class(_) | Self::Object(_) => String::new(),
            Self::Bool(v) => if *v { "true" } else { "false" }.to_string(),
            Self::Int8(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::Int32(v) | Self::Enum(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Float32(v) => v.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::ComplexF32(v) => v.to_string(),
            Self::ComplexF64(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Time(v) => format_time(v),
            Self::List(items) => {
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(delimiter);
                    }
                    out.push_str(&item.to_text(delimiter));
                }
                out
            }
        }
    }

    /// Parse the text form of a value of type `ty`. Class and object kinds
    /// have no text form and never parse.
    pub fn parse(ty: ValueType, text: &str, delimiter: char) -> Option<Value> {
        if !ty.list {
            return parse_scalar(ty.kind, text);
        }
        let text = text.trim();
        if text.is_empty() {
            return Some(Self::List(Vec::new()));
        }
        let items: Option<Vec<Value>> = if delimiter.is_whitespace() {
            text.split_whitespace()
                .map(|item| parse_scalar(ty.kind, item))
                .collect()
        } else {
            text.split(delimiter)
                .map(|item| parse_scalar(ty.kind, item.trim()))
                .collect()
        };
        items.map(Self::List)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::ComplexF32(a), Self::ComplexF32(b)) => a == b,
            (Self::ComplexF64(a), Self::ComplexF64(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a.equals(b.as_ref()),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

/// Render a time in the archive text format.
pub fn format_time(time: &Time) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a time in any of the accepted archive text formats.
pub fn parse_time(text: &str) -> Option<Time> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    for format in TIME_PARSE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Parse a boolean the way the XML backend does.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_complex<T: std::str::FromStr>(text: &str) -> Option<Complex<T>> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    Some(Complex::new(re.trim().parse().ok()?, im.trim().parse().ok()?))
}

fn parse_scalar(kind: ValueKind, text: &str) -> Option<Value> {
    let trimmed = text.trim();
    match kind {
        ValueKind::Bool => parse_bool(trimmed).map(Value::Bool),
        ValueKind::Int8 => trimmed.parse().ok().map(Value::Int8),
        ValueKind::Int16 => trimmed.parse().ok().map(Value::Int16),
        ValueKind::Int32 => trimmed.parse().ok().map(Value::Int32),
        ValueKind::Int64 => trimmed.parse().ok().map(Value::Int64),
        ValueKind::Float32 => trimmed.parse().ok().map(Value::Float32),
        ValueKind::Float64 => trimmed.parse().ok().map(Value::Float64),
        ValueKind::ComplexF32 => parse_complex(trimmed).map(Value::ComplexF32),
        ValueKind::ComplexF64 => parse_complex(trimmed).map(Value::ComplexF64),
        ValueKind::String => Some(Value::String(text.to_string())),
        ValueKind::Time => parse_time(trimmed).map(Value::Time),
        ValueKind::Enum => trimmed.parse().ok().map(Value::Enum),
        ValueKind::Class | ValueKind::Object => None,
    }
}

/// Trait for converting from Value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, MetaError>;
}

/// Trait for converting to Value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Primitive that maps to exactly one [`ValueKind`].
pub trait Scalar: FromValue + IntoValue + Clone {
    const KIND: ValueKind;
}

fn mismatch(expected: &str, got: &Value) -> MetaError {
    MetaError::TypeMismatch {
        expected: expected.to_string(),
        got: got.describe(),
    }
}

macro_rules! impl_scalar {
    ($ty:ty, $variant:ident, $kind:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, MetaError> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(mismatch(ValueKind::$kind.type_name(), other)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl Scalar for $ty {
            const KIND: ValueKind = ValueKind::$kind;
        }
    };
}

impl_scalar!(bool, Bool, Bool);
impl_scalar!(i8, Int8, Int8);
impl_scalar!(i16, Int16, Int16);
impl_scalar!(i32, Int32, Int32);
impl_scalar!(i64, Int64, Int64);
impl_scalar!(f32, Float32, Float32);
impl_scalar!(f64, Float64, Float64);
impl_scalar!(Complex<f32>, ComplexF32, ComplexF32);
impl_scalar!(Complex<f64>, ComplexF64, ComplexF64);
impl_scalar!(String, String, String);
impl_scalar!(Time, Time, Time);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, MetaError> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::None, IntoValue::into_value)
    }
}

impl<T: Scalar> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, MetaError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch(&ValueType::list(T::KIND).to_string(), other)),
        }
    }
}

impl<T: Scalar> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: IntoValue> From<T> for Value {
    fn from(v: T) -> Self {
        v.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_primitive_values() {
        let v = Value::from(42i32);
        assert_eq!(v.as_i32(), Some(42));
        assert_eq!(v.as_i64(), Some(42));
        assert_eq!(v.as_f64(), None);

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.to_text(' '), "hello");
    }

    #[test]
    fn test_time_text() {
        let t = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 5)
            .unwrap()
            .with_nanosecond(250_000_000)
            .unwrap();
        assert_eq!(format_time(&t), "2024-03-01T12:30:05.250000Z");
        assert_eq!(parse_time("2024-03-01T12:30:05.25Z"), Some(t));
        assert_eq!(
            parse_time("2024-03-01 12:30:05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap())
        );
        assert_eq!(
            parse_time("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn test_bool_and_complex_text() {
        assert_eq!(
            Value::parse(ValueType::scalar(ValueKind::Bool), "1", ' '),
            Some(Value::Bool(true))
        );
        assert_eq!(
            Value::parse(ValueType::scalar(ValueKind::Bool), "yes", ' '),
            None
        );
        let c = Value::ComplexF64(Complex::new(1.5, -2.0));
        assert_eq!(c.to_text(' '), "(1.5,-2)");
        assert_eq!(
            Value::parse(ValueType::scalar(ValueKind::ComplexF64), "(1.5, -2)", ' '),
            Some(c)
        );
    }

    #[test]
    fn test_list_text_uses_delimiter() {
        let list = vec![1.5f64, 2.0, -3.25].into_value();
        assert_eq!(list.to_text(' '), "1.5 2 -3.25");
        assert_eq!(list.to_text(','), "1.5,2,-3.25");

        let parsed = Value::parse(ValueType::list(ValueKind::Float64), "1.5  2\n-3.25", ' ');
        assert_eq!(parsed, Some(list.clone()));
        let parsed = Value::parse(ValueType::list(ValueKind::Float64), "1.5, 2,-3.25", ',');
        assert_eq!(parsed, Some(list));

        assert_eq!(
            Value::parse(ValueType::list(ValueKind::Int32), "1 x 3", ' '),
            None
        );
        assert_eq!(
            Value::parse(ValueType::list(ValueKind::Int32), "", ' '),
            Some(Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_conversions_report_mismatch() {
        let v = Value::from(1.0f64);
        match i32::from_value(&v) {
            Err(MetaError::TypeMismatch { expected, got }) => {
                assert_eq!(expected, "int");
                assert_eq!(got, "float");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Option::<f64>::from_value(&Value::None).unwrap(), None);
        assert_eq!(
            Vec::<i32>::from_value(&vec![1i32, 2].into_value()).unwrap(),
            vec![1, 2]
        );
    }
}
