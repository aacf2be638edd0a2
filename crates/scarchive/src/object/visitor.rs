// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::ObjectRef;

/// Order in which a subtree is visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalMode {
    /// Parent before children.
    #[default]
    TopDown,
    /// Children before parent.
    BottomUp,
}

/// Callback interface for walking an object tree.
pub trait Visitor {
    fn mode(&self) -> TraversalMode {
        TraversalMode::TopDown
    }

    /// Handle one node. In top-down mode returning false skips the node's
    /// children; in bottom-up mode the result is ignored.
    fn visit(&mut self, object: &ObjectRef) -> bool;

    /// Called after all children of a top-down visited node were handled.
    fn finished(&mut self) {}
}

/// Drive `visitor` over `object` and its descendants.
///
/// The child list is snapshotted under a short read lock and released
/// before any callback runs.
pub(super) fn walk(object: &ObjectRef, visitor: &mut dyn Visitor) {
    match visitor.mode() {
        TraversalMode::TopDown => {
            if !visitor.visit(object) {
                return;
            }
            let children = object.read().children();
            for child in &children {
                walk(child, visitor);
            }
            visitor.finished();
        }
        TraversalMode::BottomUp => {
            let children = object.read().children();
            for child in &children {
                walk(child, visitor);
            }
            visitor.visit(object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Arrival, Comment, Origin};
    use crate::object::ObjectRegistry;

    struct Recorder {
        mode: TraversalMode,
        seen: Vec<String>,
        finished: usize,
        prune: Option<&'static str>,
    }

    impl Recorder {
        fn new(mode: TraversalMode) -> Self {
            Self {
                mode,
                seen: Vec::new(),
                finished: 0,
                prune: None,
            }
        }
    }

    impl Visitor for Recorder {
        fn mode(&self) -> TraversalMode {
            self.mode
        }

        fn visit(&mut self, object: &ObjectRef) -> bool {
            self.seen.push(object.class_name().to_string());
            self.prune != Some(object.class_name())
        }

        fn finished(&mut self) {
            self.finished += 1;
        }
    }

    fn tree() -> (std::sync::Arc<ObjectRegistry>, ObjectRef) {
        let registry = ObjectRegistry::new();
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        {
            let mut guard = origin.write();
            assert!(guard.add_comment(Comment::with_id(&registry, "c", "t")));
            assert!(guard.add_arrival(Arrival::with_pick(&registry, "p1", "P")));
        }
        (registry, ObjectRef::new(origin))
    }

    #[test]
    fn test_top_down_order() {
        let (_registry, root) = tree();
        let mut recorder = Recorder::new(TraversalMode::TopDown);
        root.accept(&mut recorder);
        assert_eq!(recorder.seen, ["Origin", "Comment", "Arrival"]);
        assert_eq!(recorder.finished, 3);
    }

    #[test]
    fn test_bottom_up_order() {
        let (_registry, root) = tree();
        let mut recorder = Recorder::new(TraversalMode::BottomUp);
        root.accept(&mut recorder);
        assert_eq!(recorder.seen, ["Comment", "Arrival", "Origin"]);
        assert_eq!(recorder.finished, 0);
    }

    #[test]
    fn test_prune_skips_children() {
        let (_registry, root) = tree();
        let mut recorder = Recorder::new(TraversalMode::TopDown);
        recorder.prune = Some("Origin");
        root.accept(&mut recorder);
        assert_eq!(recorder.seen, ["Origin"]);
        assert_eq!(recorder.finished, 0);
    }
}
