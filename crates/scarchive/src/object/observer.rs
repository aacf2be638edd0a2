// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide object observers.
//!
//! Observers are held weakly in a copy-on-write list: notification loads a
//! snapshot without locking, registration swaps in a new list.

use super::{ObjectKey, ObjectRef};
use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock, Weak};

/// Receives structural events of every object in the process.
pub trait ObjectObserver: Send + Sync {
    fn object_added(&self, _parent: ObjectKey, _child: &ObjectRef) {}

    fn object_removed(&self, _parent: ObjectKey, _child: &ObjectRef) {}

    fn object_modified(&self, _object: &ObjectRef) {}

    /// The object is being dropped; only its key is left.
    fn object_destroyed(&self, _key: ObjectKey) {}
}

type ObserverList = Vec<Weak<dyn ObjectObserver>>;

fn observers() -> &'static ArcSwap<ObserverList> {
    static OBSERVERS: OnceLock<ArcSwap<ObserverList>> = OnceLock::new();
    OBSERVERS.get_or_init(|| ArcSwap::new(Arc::new(Vec::new())))
}

/// Register an observer. It stays registered until removed or dropped.
pub fn add_observer(observer: &Arc<dyn ObjectObserver>) {
    let weak = Arc::downgrade(observer);
    observers().rcu(|list| {
        let mut next: ObserverList = list
            .iter()
            .filter(|o| o.strong_count() > 0)
            .cloned()
            .collect();
        next.push(weak.clone());
        next
    });
}

/// Unregister an observer. Returns false if it was not registered.
pub fn remove_observer(observer: &Arc<dyn ObjectObserver>) -> bool {
    let target = Arc::as_ptr(observer) as *const ();
    let mut removed = false;
    observers().rcu(|list| {
        removed = false;
        list.iter()
            .filter(|o| {
                let hit = o.as_ptr() as *const () == target;
                removed |= hit;
                !hit && o.strong_count() > 0
            })
            .cloned()
            .collect::<ObserverList>()
    });
    removed
}

fn for_each(f: impl Fn(&dyn ObjectObserver)) {
    let list = observers().load();
    for observer in list.iter().filter_map(Weak::upgrade) {
        f(observer.as_ref());
    }
}

pub(crate) fn notify_added(parent: ObjectKey, child: &ObjectRef) {
    for_each(|o| o.object_added(parent, child));
}

pub(crate) fn notify_removed(parent: ObjectKey, child: &ObjectRef) {
    for_each(|o| o.object_removed(parent, child));
}

pub(crate) fn notify_modified(object: &ObjectRef) {
    for_each(|o| o.object_modified(object));
}

pub(super) fn notify_destroyed(key: ObjectKey) {
    for_each(|o| o.object_destroyed(key));
}
