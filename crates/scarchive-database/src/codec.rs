// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping between object fields and table columns.
//!
//! One object maps to one row. Scalars map to a column named after the
//! field; embedded value objects are flattened by prefixing their members'
//! columns with the field name, nested prefixes joined by `_`:
//!
//! ```text
//! time.value             -> time_value, time_value_ms
//! backazimuth (optional) -> backazimuth_value, ..., backazimuth_used
//! creationInfo.author    -> creationInfo_author
//! ```
//!
//! The top-level `publicID` is not a column of the class table; it lives in
//! `PublicObject`. Child containers are never part of the row.

use crate::driver::{Row, SqlValue};
use chrono::Timelike;
use scarchive::archive::{Archive, ArchiveState, Hint, Version};
use scarchive::meta::{parse_time, Time, Value, ValueKind, ValueType};
use scarchive::object::ObjectRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column name to value, ordered for stable statement text.
pub(crate) type Attributes = BTreeMap<String, SqlValue>;

/// Field name of the publicID.
pub(crate) const PUBLIC_ID: &str = "publicID";

const USED_POSTFIX: &str = "used";
const MICROSECONDS_POSTFIX: &str = "ms";

const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Parse a stored boolean.
pub fn parse_db_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" => Some(true),
        "0" | "f" | "false" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Text form of a time column, with or without the fraction.
pub fn format_db_time(time: &Time, split: bool) -> String {
    if split {
        time.format(SECONDS_FORMAT).to_string()
    } else {
        time.format(TIME_FORMAT).to_string()
    }
}

/// Archive backend moving fields in and out of one table row.
pub(crate) struct RowCodec {
    state: ArchiveState,
    column_prefix: String,
    prefix: String,
    marks: Vec<usize>,
    pushed: bool,
    column: String,
    // reading
    row: Option<Row>,
    field: Option<String>,
    // writing
    attributes: Attributes,
    index: Attributes,
    split_index: bool,
}

impl RowCodec {
    pub fn new(registry: Arc<ObjectRegistry>, column_prefix: &str) -> Self {
        Self {
            state: ArchiveState::with_registry(true, registry),
            column_prefix: column_prefix.to_string(),
            prefix: String::new(),
            marks: Vec::new(),
            pushed: false,
            column: String::new(),
            row: None,
            field: None,
            attributes: Attributes::new(),
            index: Attributes::new(),
            split_index: false,
        }
    }

    /// Codec sharing registry, column prefix and version with `self`.
    pub fn sibling(&self) -> Self {
        let mut codec = Self::new(self.state.registry.clone(), &self.column_prefix);
        codec.state.version = self.state.version;
        codec
    }

    pub fn column_prefix(&self) -> &str {
        &self.column_prefix
    }

    /// Schema version the rows were written with.
    pub fn set_schema_version(&mut self, version: Version) {
        self.state.version = version;
    }

    pub fn set_registry(&mut self, registry: Arc<ObjectRegistry>) {
        self.state.registry = registry;
    }

    fn begin(&mut self, reading: bool) {
        let version = self.state.version;
        self.state.reset(reading, version);
        self.state.hint = Hint::NONE.ignore_children();
        self.prefix.clear();
        self.marks.clear();
        self.pushed = false;
        self.column.clear();
        self.field = None;
    }

    /// Start collecting the columns of one object. With `split_index`,
    /// index attributes are collected apart from the others.
    pub fn begin_write(&mut self, split_index: bool) {
        self.begin(false);
        self.row = None;
        self.attributes.clear();
        self.index.clear();
        self.split_index = split_index;
    }

    /// Start reading one object from `row`.
    pub fn begin_read(&mut self, row: Row) {
        self.begin(true);
        self.row = Some(row);
    }

    /// Collected `(attributes, index attributes)`.
    pub fn take_attributes(&mut self) -> (Attributes, Attributes) {
        (
            std::mem::take(&mut self.attributes),
            std::mem::take(&mut self.index),
        )
    }

    fn push_prefix(&mut self, name: &str) {
        self.marks.push(self.prefix.len());
        if !self.prefix.is_empty() {
            self.prefix.push('_');
        }
        self.prefix.push_str(name);
    }

    fn pop_prefix(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.prefix.truncate(mark);
        }
    }

    fn drop_stale_prefix(&mut self) {
        if std::mem::take(&mut self.pushed) {
            self.pop_prefix();
        }
    }

    fn attribute_name(&self) -> String {
        let name = if self.prefix.is_empty() {
            self.column.clone()
        } else if self.column.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}_{}", self.prefix, self.column)
        };
        format!("{}{}", self.column_prefix, name)
    }

    fn with_postfix<R>(&mut self, postfix: &str, body: impl FnOnce(&mut Self) -> R) -> R {
        let column = std::mem::take(&mut self.column);
        self.column = format!("{}_{}", column, postfix);
        let result = body(self);
        self.column = column;
        result
    }

    fn write_attribute(&mut self, value: SqlValue) {
        if self.prefix.is_empty() && self.column == PUBLIC_ID {
            return;
        }
        let name = self.attribute_name();
        if self.split_index && self.state.hint.index_attribute {
            self.index.insert(name, value);
        } else {
            self.attributes.insert(name, value);
        }
    }

    fn read_attribute(&mut self) -> bool {
        let name = self.attribute_name();
        self.field = self
            .row
            .as_ref()
            .and_then(|row| row.get(&name))
            .and_then(|value| value.to_text().map(|text| text.into_owned()));
        self.field.is_some()
    }

    fn read_microseconds(&mut self, time: Time) -> Time {
        let micros = self.with_postfix(MICROSECONDS_POSTFIX, |codec| {
            codec.read_attribute();
            codec.field.as_deref().and_then(|text| text.trim().parse::<u32>().ok())
        });
        micros
            .and_then(|us| time.with_nanosecond(us.saturating_mul(1000)))
            .unwrap_or(time)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::None => SqlValue::Null,
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int8(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int16(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int32(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::Enum(v) => SqlValue::Integer(i64::from(*v)),
        Value::Float32(v) => SqlValue::Real(f64::from(*v)),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::String(v) => SqlValue::Text(v.clone()),
        Value::Time(v) => SqlValue::Text(format_db_time(v, false)),
        Value::Class(_) | Value::Object(_) => {
            tracing::warn!("[database] objects have no column value");
            SqlValue::Null
        }
        other => SqlValue::Text(other.to_text(' ')),
    }
}

impl Archive for RowCodec {
    fn state(&self) -> &ArchiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArchiveState {
        &mut self.state
    }

    fn locate_object_by_name(
        &mut self,
        name: &str,
        target_class: Option<&str>,
        nullable: bool,
    ) -> bool {
        self.drop_stale_prefix();
        let hint = self.hint();

        if !self.is_reading() {
            if target_class.is_some() {
                if hint.db_table {
                    tracing::warn!(
                        "[database] {}: separate tables are not supported, flattened",
                        name
                    );
                }
                if !name.is_empty() {
                    self.push_prefix(name);
                    self.pushed = true;
                }
                if nullable {
                    self.column = USED_POSTFIX.to_string();
                    self.write_attribute(SqlValue::Integer(1));
                }
            } else {
                self.column = name.to_string();
            }
            return true;
        }

        if target_class.is_some() && hint.static_type {
            if !name.is_empty() {
                self.push_prefix(name);
                self.pushed = true;
            }
            self.column = name.to_string();
            if nullable {
                self.column = USED_POSTFIX.to_string();
                self.read_attribute();
                let used = self.field.as_deref().and_then(parse_db_bool).unwrap_or(false);
                if !used {
                    self.drop_stale_prefix();
                    return false;
                }
            }
            return true;
        }

        self.column = name.to_string();
        self.read_attribute()
    }

    fn locate_next_object_by_name(&mut self, _name: &str, _target_class: Option<&str>) -> bool {
        false
    }

    fn locate_null_object_by_name(&mut self, name: &str, target_class: Option<&str>, _first: bool) {
        self.drop_stale_prefix();
        if name.is_empty() {
            self.column = target_class.unwrap_or_default().to_string();
        } else {
            if target_class.is_some() {
                if !self.hint().db_table {
                    self.column = format!("{}_{}", name, USED_POSTFIX);
                    self.write_attribute(SqlValue::Integer(0));
                }
                return;
            }
            self.column = name.to_string();
        }
        self.write_attribute(SqlValue::Null);
    }

    fn determine_class_name(&mut self) -> Option<String> {
        None
    }

    fn set_class_name(&mut self, _class_name: Option<&str>) {}

    fn serialize_nested(&mut self, body: &mut dyn FnMut(&mut dyn Archive)) {
        let pushed = std::mem::take(&mut self.pushed);
        body(self);
        self.drop_stale_prefix();
        if pushed {
            self.pop_prefix();
        }
    }

    fn read_value(&mut self, ty: ValueType) -> Option<Value> {
        let value = self.field.as_deref().and_then(|text| match (ty.list, ty.kind) {
            (false, ValueKind::Bool) => parse_db_bool(text).map(Value::Bool),
            (false, ValueKind::String) => Some(Value::String(text.to_string())),
            (false, ValueKind::Time) => parse_time(text).map(Value::Time),
            _ => Value::parse(ty, text, ' '),
        });
        let value = match value {
            Some(Value::Time(time)) if self.hint().split_time => {
                Some(Value::Time(self.read_microseconds(time)))
            }
            other => other,
        };
        if value.is_none() {
            tracing::debug!(
                "[database] invalid content in {}: {:?}",
                self.attribute_name(),
                self.field
            );
            self.set_validity(false);
        }
        value
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Time(time) if self.hint().split_time => {
                self.write_attribute(SqlValue::Text(format_db_time(time, true)));
                let micros = i64::from(time.timestamp_subsec_micros());
                self.with_postfix(MICROSECONDS_POSTFIX, |codec| {
                    codec.write_attribute(SqlValue::Integer(micros));
                });
            }
            other => {
                let value = to_sql_value(other);
                self.write_attribute(value);
            }
        }
    }
}
