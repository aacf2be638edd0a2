// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Change notifiers.
//!
//! A notifier records one structural change (add, remove, update) of an
//! object below a parent identified by its publicID. Notifiers accumulate in
//! the registry's [`NotifierLog`] and are drained by whoever forwards changes,
//! typically to a messaging layer. [`Notifier::apply`] replays a change on
//! another object tree.

use super::{ObjectKey, ObjectRef, ObjectRegistry, TraversalMode, Visitor};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Undefined,
    Add,
    Remove,
    Update,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Undefined => 0,
            Self::Add => 1,
            Self::Remove => 2,
            Self::Update => 3,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing a pending notifier with a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Unrelated changes, both are kept.
    Different,
    /// Same change twice.
    Equal,
    /// The new change cancels the pending one.
    Opposite,
    /// The new change supersedes the pending one.
    Override,
}

use self::CompareResult::{Different as D, Equal as E, Override as V};

// Row: pending operation, column: new operation.
const COMPARE: [[CompareResult; 4]; 4] = [
    [D, D, D, D],
    [D, E, D, E],
    [D, D, E, E],
    [D, V, V, E],
];

/// One recorded change.
#[derive(Clone)]
pub struct Notifier {
    parent_id: String,
    operation: Operation,
    object: ObjectRef,
}

impl Notifier {
    pub fn new(parent_id: &str, operation: Operation, object: ObjectRef) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            operation,
            object,
        }
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Compare `self`, a pending notifier, with a newer one.
    pub fn cmp(&self, newer: &Notifier) -> CompareResult {
        if !self.object.ptr_eq(&newer.object) || self.parent_id != newer.parent_id {
            return CompareResult::Different;
        }
        COMPARE[self.operation.index()][newer.operation.index()]
    }

    /// Replay the change on the tree known to `registry`.
    ///
    /// The parent is looked up by id. An update whose parent is unknown is
    /// applied to the registered object with the same publicID instead.
    /// Notifier creation is disabled while the change is applied.
    pub fn apply(&self, registry: &ObjectRegistry) -> bool {
        let log = registry.notifiers();
        let Some(parent) = registry.find(&self.parent_id) else {
            if self.operation != Operation::Update {
                return false;
            }
            let Some(public_id) = self.object.public_id() else {
                return false;
            };
            let Some(target) = registry.find(&public_id) else {
                return false;
            };
            if target.ptr_eq(&self.object) {
                return false;
            }
            let previous = log.set_enabled(false);
            let assigned = {
                let source = self.object.read();
                target.write().assign(&*source)
            };
            if assigned {
                target.update();
            }
            log.set_enabled(previous);
            return assigned;
        };

        let previous = log.set_enabled(false);
        let result = match self.operation {
            Operation::Add => self.object.attach_to(&parent),
            Operation::Remove => self.object.detach_from(&parent),
            Operation::Update => {
                if parent.ptr_eq(&self.object) {
                    false
                } else {
                    let source = self.object.read();
                    parent.write().update_child(&*source)
                }
            }
            Operation::Undefined => false,
        };
        log.set_enabled(previous);
        result
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("parent_id", &self.parent_id)
            .field("operation", &self.operation)
            .field("object", &self.object)
            .finish()
    }
}

/// Pending notifiers of one registry.
pub struct NotifierLog {
    enabled: AtomicBool,
    check_on_create: AtomicBool,
    pending: Mutex<Vec<Notifier>>,
}

impl NotifierLog {
    pub(super) fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            check_on_create: AtomicBool::new(true),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Toggle notifier creation, returning the previous state.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    pub fn is_check_enabled(&self) -> bool {
        self.check_on_create.load(Ordering::Acquire)
    }

    /// Whether new notifiers are merged with pending ones.
    pub fn set_check_enabled(&self, enabled: bool) {
        self.check_on_create.store(enabled, Ordering::Release);
    }

    /// Record a change.
    ///
    /// Returns `None` when creation is disabled, the parent id is empty, or
    /// the change merged with a pending one. An equal pending change
    /// swallows the new one; an opposite one is dropped together with the
    /// new one.
    pub fn create(
        &self,
        parent_id: &str,
        operation: Operation,
        object: &ObjectRef,
    ) -> Option<Notifier> {
        if !self.is_enabled() || parent_id.is_empty() {
            return None;
        }
        let notifier = Notifier::new(parent_id, operation, object.clone());
        let mut pending = self.pending.lock();
        if self.is_check_enabled() {
            for i in 0..pending.len() {
                match pending[i].cmp(&notifier) {
                    CompareResult::Equal => return None,
                    CompareResult::Opposite => {
                        pending.remove(i);
                        return None;
                    }
                    CompareResult::Different | CompareResult::Override => {}
                }
            }
        }
        pending.push(notifier.clone());
        Some(notifier)
    }

    /// Drain the pending notifiers in creation order.
    pub fn take_all(&self) -> Vec<Notifier> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

impl fmt::Debug for NotifierLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierLog")
            .field("enabled", &self.is_enabled())
            .field("pending", &self.len())
            .finish()
    }
}

/// Visitor emitting one notifier per node of a subtree.
///
/// Removals are emitted bottom-up so that children are announced before
/// their parent disappears; additions and updates top-down.
pub struct NotifierCreator {
    registry: Arc<ObjectRegistry>,
    operation: Operation,
    root: Option<(ObjectKey, String)>,
}

impl NotifierCreator {
    pub fn new(registry: Arc<ObjectRegistry>, operation: Operation) -> Self {
        Self {
            registry,
            operation,
            root: None,
        }
    }

    /// Use `parent_id` for the subtree root instead of looking up its
    /// parent, which may be locked by the caller.
    pub fn with_root_parent(mut self, root: ObjectKey, parent_id: &str) -> Self {
        self.root = Some((root, parent_id.to_string()));
        self
    }

    fn parent_id_of(&self, object: &ObjectRef) -> Option<String> {
        if let Some((key, id)) = &self.root {
            if *key == object.key() {
                return Some(id.clone());
            }
        }
        object.parent()?.public_id()
    }
}

impl Visitor for NotifierCreator {
    fn mode(&self) -> TraversalMode {
        match self.operation {
            Operation::Remove => TraversalMode::BottomUp,
            _ => TraversalMode::TopDown,
        }
    }

    fn visit(&mut self, object: &ObjectRef) -> bool {
        let Some(parent_id) = self.parent_id_of(object) else {
            return false;
        };
        self.registry
            .notifiers()
            .create(&parent_id, self.operation, object)
            .is_some()
    }
}
