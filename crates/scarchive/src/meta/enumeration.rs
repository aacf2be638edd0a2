// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

/// Legal name/value pairs of an enumeration.
pub struct MetaEnum {
    name: &'static str,
    keys: &'static [(i32, &'static str)],
}

impl MetaEnum {
    pub const fn new(name: &'static str, keys: &'static [(i32, &'static str)]) -> Self {
        Self { name, keys }
    }

    /// Enumeration type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Name of the i-th key in declaration order.
    pub fn key(&self, index: usize) -> Option<&'static str> {
        self.keys.get(index).map(|(_, name)| *name)
    }

    /// Integer value of a key name.
    pub fn value_for(&self, name: &str) -> Option<i32> {
        self.keys
            .iter()
            .find(|(_, key)| *key == name)
            .map(|(value, _)| *value)
    }

    /// Key name of an integer value.
    pub fn name_for(&self, value: i32) -> Option<&'static str> {
        self.keys
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| *name)
    }
}

impl fmt::Debug for MetaEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaEnum")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .finish()
    }
}

/// Rust enum bound to its [`MetaEnum`].
pub trait EnumType: Copy + PartialEq + Send + Sync + 'static {
    fn meta_enum() -> &'static MetaEnum;

    fn to_i32(self) -> i32;

    fn from_i32(value: i32) -> Option<Self>;

    /// Key name, as written by text formats.
    fn to_name(self) -> &'static str {
        Self::meta_enum().name_for(self.to_i32()).unwrap_or("")
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::meta_enum().value_for(name).and_then(Self::from_i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COLORS: MetaEnum = MetaEnum::new("Color", &[(0, "red"), (1, "green"), (5, "blue")]);

    #[test]
    fn test_lookup_both_ways() {
        assert_eq!(COLORS.key_count(), 3);
        assert_eq!(COLORS.key(2), Some("blue"));
        assert_eq!(COLORS.key(3), None);
        assert_eq!(COLORS.value_for("blue"), Some(5));
        assert_eq!(COLORS.value_for("BLUE"), None);
        assert_eq!(COLORS.name_for(1), Some("green"));
        assert_eq!(COLORS.name_for(2), None);
    }
}
