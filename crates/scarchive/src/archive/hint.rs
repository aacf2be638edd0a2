// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

/// Per-call mapping hints.
///
/// Each flag is interpreted by the backends that care about it and ignored by
/// the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hint {
    /// Concrete type known from context, no class name round-trip.
    pub static_type: bool,
    /// Do not descend into child containers.
    pub ignore_children: bool,
    /// XML: child element text instead of an attribute.
    pub xml_element: bool,
    /// XML: node content, written as CDATA.
    pub xml_cdata: bool,
    /// Always (de)serialize, even when empty.
    pub mandatory: bool,
    /// Database: children live in their own table.
    pub db_table: bool,
    /// Database: time stored as seconds plus a microseconds column.
    pub split_time: bool,
    /// Field is part of the composite index.
    pub index_attribute: bool,
}

impl Hint {
    pub const NONE: Hint = Hint {
        static_type: false,
        ignore_children: false,
        xml_element: false,
        xml_cdata: false,
        mandatory: false,
        db_table: false,
        split_time: false,
        index_attribute: false,
    };

    pub const fn static_type(mut self) -> Self {
        self.static_type = true;
        self
    }

    pub const fn ignore_children(mut self) -> Self {
        self.ignore_children = true;
        self
    }

    pub const fn element(mut self) -> Self {
        self.xml_element = true;
        self
    }

    pub const fn cdata(mut self) -> Self {
        self.xml_cdata = true;
        self
    }

    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub const fn db_table(mut self) -> Self {
        self.db_table = true;
        self
    }

    pub const fn split_time(mut self) -> Self {
        self.split_time = true;
        self
    }

    pub const fn index(mut self) -> Self {
        self.index_attribute = true;
        self
    }

    /// Union of both flag sets.
    pub const fn merge(self, other: Hint) -> Self {
        Hint {
            static_type: self.static_type | other.static_type,
            ignore_children: self.ignore_children | other.ignore_children,
            xml_element: self.xml_element | other.xml_element,
            xml_cdata: self.xml_cdata | other.xml_cdata,
            mandatory: self.mandatory | other.mandatory,
            db_table: self.db_table | other.db_table,
            split_time: self.split_time | other.split_time,
            index_attribute: self.index_attribute | other.index_attribute,
        }
    }

    /// Hint for a nested field: the field's own flags, keeping the
    /// archive-wide `ignore_children` of the current hint.
    pub const fn child_of(self, parent: Hint) -> Self {
        let mut hint = self;
        hint.ignore_children |= parent.ignore_children;
        hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_compose() {
        let hint = Hint::NONE.element().mandatory();
        assert!(hint.xml_element && hint.mandatory);
        assert!(!hint.static_type && !hint.xml_cdata);
        assert_eq!(Hint::default(), Hint::NONE);
    }

    #[test]
    fn test_child_keeps_ignore_children() {
        let archive = Hint::NONE.ignore_children().element();
        let field = Hint::NONE.static_type();
        let child = field.child_of(archive);
        assert!(child.ignore_children && child.static_type);
        assert!(!child.xml_element);
        assert_eq!(field.merge(archive), Hint::NONE.static_type().ignore_children().element());
    }
}
