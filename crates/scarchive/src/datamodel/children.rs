// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link bookkeeping shared by the typed child containers.
//!
//! Validation (parent already set, duplicate index or publicID) stays with
//! each owner; these helpers only perform the accepted change.

use crate::object::{
    notify_added, notify_removed, NotifierCreator, Object, ObjectCore, ObjectRef, ObjectType,
    Operation, PublicObjectCore,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owner side of a container: its core and its publicID.
pub(crate) struct Owner<'a> {
    pub core: &'a ObjectCore,
    pub public_id: &'a str,
}

impl<'a> Owner<'a> {
    pub fn new(core: &'a ObjectCore, public: &'a PublicObjectCore) -> Self {
        Self {
            core,
            public_id: public.public_id(),
        }
    }
}

/// Append `child`, link it to the owner and announce the subtree.
pub(crate) fn adopt<T: ObjectType>(
    owner: Owner<'_>,
    list: &mut Vec<Arc<RwLock<T>>>,
    child: Arc<RwLock<T>>,
) {
    let handle = ObjectRef::new(child.clone());
    child
        .write()
        .core_mut()
        .set_parent(owner.core.weak_this().cloned());
    list.push(child);

    let registry = owner.core.registry();
    if registry.notifiers().is_enabled() {
        let mut creator = NotifierCreator::new(registry.clone(), Operation::Add)
            .with_root_parent(handle.key(), owner.public_id);
        handle.accept(&mut creator);
    }
    notify_added(owner.core.key(), &handle);
}

/// Unlink and drop the child at `index`.
///
/// Public children announce their whole subtree; non-public ones a single
/// removal.
pub(crate) fn release<T: ObjectType>(
    owner: Owner<'_>,
    list: &mut Vec<Arc<RwLock<T>>>,
    index: usize,
) -> bool {
    let Some(child) = list.get(index).cloned() else {
        return false;
    };
    let handle = ObjectRef::new(child.clone());

    let registry = owner.core.registry();
    if registry.notifiers().is_enabled() {
        if child.read().public_core().is_some() {
            let mut creator = NotifierCreator::new(registry.clone(), Operation::Remove)
                .with_root_parent(handle.key(), owner.public_id);
            handle.accept(&mut creator);
        } else {
            registry
                .notifiers()
                .create(owner.public_id, Operation::Remove, &handle);
        }
    }

    child.write().core_mut().set_parent(None);
    notify_removed(owner.core.key(), &handle);
    list.remove(index);
    true
}

/// Position of `child` in the owner's list, after checking that the owner
/// is its parent.
pub(crate) fn position_of<T: ObjectType>(
    owner: &ObjectCore,
    list: &[Arc<RwLock<T>>],
    child: &Arc<RwLock<T>>,
    context: &str,
) -> Option<usize> {
    if child.read().core().parent_key() != Some(owner.key()) {
        log::error!("{} -> element has another parent", context);
        return None;
    }
    let position = list.iter().position(|item| Arc::ptr_eq(item, child));
    if position.is_none() {
        log::error!(
            "{} -> child object has not been found although the parent pointer matches",
            context
        );
    }
    position
}

/// True when `object` is the value stored behind `cell`.
pub(crate) fn is_same<T: ObjectType>(cell: &Arc<RwLock<T>>, object: &dyn Object) -> bool {
    std::ptr::addr_eq(cell.data_ptr(), object as *const dyn Object)
}

/// Copy `source` into the child `target` and announce the update under the
/// owner's publicID.
pub(crate) fn update_in_place<T: ObjectType>(
    owner_id: &str,
    target: &Arc<RwLock<T>>,
    source: &dyn Object,
) -> bool {
    if is_same(target, source) {
        return true;
    }
    if !target.write().assign(source) {
        return false;
    }
    ObjectRef::new(target.clone()).update_below(owner_id);
    true
}

/// Clear the back links of every child. Used when the owner goes away.
pub(crate) fn orphan_all<T: ObjectType>(list: &[Arc<RwLock<T>>]) {
    for child in list {
        child.write().core_mut().set_parent(None);
    }
}
