// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Run-time type information.
//!
//! Every serializable class owns one static [`Rtti`] that names it and links
//! to its parent type. Type tests walk that chain and never depend on the
//! compiler's own type identification, so class names written into a stream
//! stay stable across builds.

use std::fmt;

/// Static type descriptor of a polymorphic class.
pub struct Rtti {
    class_name: &'static str,
    parent: Option<&'static Rtti>,
}

impl Rtti {
    /// Create a descriptor. Used in `static` items only.
    pub const fn new(class_name: &'static str, parent: Option<&'static Rtti>) -> Self {
        Self { class_name, parent }
    }

    /// Registered class name.
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Parent type, `None` for the hierarchy root.
    pub fn parent(&self) -> Option<&'static Rtti> {
        self.parent
    }

    /// Returns true when `self` is `other` or derives from it.
    pub fn is_type_of(&self, other: &Rtti) -> bool {
        let mut current = Some(self);
        while let Some(rtti) = current {
            if rtti == other {
                return true;
            }
            current = rtti.parent;
        }
        false
    }

    /// Returns true when `self` is a strict ancestor of `other`.
    pub fn before(&self, other: &Rtti) -> bool {
        other.parent.is_some_and(|p| p.is_type_of(self))
    }

    /// Number of ancestors above this type.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent;
        while let Some(rtti) = current {
            depth += 1;
            current = rtti.parent;
        }
        depth
    }
}

// Class names are unique per factory pool, so the name is the identity.
impl PartialEq for Rtti {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.class_name == other.class_name
    }
}

impl Eq for Rtti {}

impl fmt::Debug for Rtti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rtti")
            .field("class_name", &self.class_name)
            .field("parent", &self.parent.map(Rtti::class_name))
            .finish()
    }
}

impl fmt::Display for Rtti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ROOT: Rtti = Rtti::new("Root", None);
    static MIDDLE: Rtti = Rtti::new("Middle", Some(&ROOT));
    static LEAF: Rtti = Rtti::new("Leaf", Some(&MIDDLE));
    static OTHER: Rtti = Rtti::new("Other", Some(&ROOT));

    #[test]
    fn test_is_type_of_walks_chain() {
        assert!(LEAF.is_type_of(&LEAF));
        assert!(LEAF.is_type_of(&MIDDLE));
        assert!(LEAF.is_type_of(&ROOT));
        assert!(!ROOT.is_type_of(&LEAF));
        assert!(!OTHER.is_type_of(&MIDDLE));
    }

    #[test]
    fn test_before_and_depth() {
        assert!(ROOT.before(&LEAF));
        assert!(!LEAF.before(&LEAF));
        assert_eq!(ROOT.depth(), 0);
        assert_eq!(LEAF.depth(), 2);
        assert_eq!(LEAF.to_string(), "Leaf");
    }
}
