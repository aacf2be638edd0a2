// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object graph: polymorphic objects, ownership links and identity.
//!
//! # Hierarchy
//!
//! | Trait | Adds |
//! |-------|------|
//! | [`BaseObject`] | class name, meta description, `serialize`, clone, equality |
//! | [`Object`] | weak parent link, child enumeration, assignment |
//! | public objects | a [`PublicObjectCore`] with a registry-wide unique publicID |
//!
//! Graph objects live behind `Arc<RwLock<T>>`. A parent owns its children
//! through strong references in typed containers; a child only holds a weak
//! link back, so dropping a parent never requires the child's cooperation.
//!
//! [`ObjectRef`] is the type-erased strong handle used wherever the concrete
//! type is not known statically (notifiers, visitors, the class factory).
//!
//! # Locking
//!
//! Locks are never held across visitor or observer callbacks. Ownership
//! operations take the child's lock while the caller holds the parent's,
//! never the other way round.

mod notifier;
mod observer;
mod public;
mod registry;
mod visitor;

pub use notifier::{CompareResult, Notifier, NotifierCreator, NotifierLog, Operation};
pub use observer::{add_observer, remove_observer, ObjectObserver};
pub use public::{create_public, set_public_id, PublicObjectCore, PUBLIC_OBJECT_TYPE};
pub use registry::{ObjectRegistry, DEFAULT_ID_PATTERN};
pub use visitor::{TraversalMode, Visitor};

pub(crate) use observer::{notify_added, notify_modified, notify_removed};

use crate::archive::Archive;
use crate::meta::MetaObject;
use crate::rtti::Rtti;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Root of the polymorphic hierarchy.
pub static BASE_OBJECT_TYPE: Rtti = Rtti::new("BaseObject", None);
/// Root of the graph objects.
pub static OBJECT_TYPE: Rtti = Rtti::new("Object", Some(&BASE_OBJECT_TYPE));

/// Abstract hierarchy roots known to every factory.
pub fn root_types() -> [&'static Rtti; 3] {
    [&BASE_OBJECT_TYPE, &OBJECT_TYPE, &PUBLIC_OBJECT_TYPE]
}

/// Meta description shared by every graph object, without properties.
pub fn object_meta() -> &'static MetaObject {
    static META: OnceLock<MetaObject> = OnceLock::new();
    META.get_or_init(|| MetaObject::new(&OBJECT_TYPE, None))
}

/// Polymorphic, serializable object.
pub trait BaseObject: Any + Send + Sync {
    /// Type descriptor of the concrete class.
    fn rtti(&self) -> &'static Rtti;

    /// Property description of the concrete class.
    fn meta(&self) -> &'static MetaObject;

    /// Read or write the object, depending on the archive direction.
    fn serialize(&mut self, ar: &mut dyn Archive);

    fn clone_box(&self) -> Box<dyn BaseObject>;

    /// Value equality with another object of the same class.
    fn equals(&self, other: &dyn BaseObject) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn class_name(&self) -> &'static str {
        self.rtti().class_name()
    }

    /// Identity part of public objects.
    fn public_core(&self) -> Option<&PublicObjectCore> {
        None
    }

    fn public_core_mut(&mut self) -> Option<&mut PublicObjectCore> {
        None
    }
}

impl Clone for Box<dyn BaseObject> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn BaseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_core() {
            Some(core) => write!(f, "{}({})", self.class_name(), core.public_id()),
            None => f.write_str(self.class_name()),
        }
    }
}

/// Statically known class.
pub trait Class: BaseObject + Sized {
    fn type_info() -> &'static Rtti;

    fn meta_object() -> &'static MetaObject;
}

/// Graph object with a parent link.
pub trait Object: BaseObject {
    fn core(&self) -> &ObjectCore;

    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Direct children in declaration order.
    fn children(&self) -> Vec<ObjectRef> {
        Vec::new()
    }

    /// Copy the attributes of `other` (same class), leaving identity, parent
    /// and children untouched.
    fn assign(&mut self, other: &dyn Object) -> bool;

    /// Find the child matching `child` by index or publicID and assign it.
    fn update_child(&mut self, _child: &dyn Object) -> bool {
        false
    }

    /// True when `other` has the same composite index, or the same publicID
    /// for public objects.
    fn index_matches(&self, other: &dyn Object) -> bool;

    fn parent(&self) -> Option<ObjectRef> {
        self.core().parent()
    }

    fn public_id(&self) -> Option<&str> {
        self.public_core().map(PublicObjectCore::public_id)
    }
}

/// Concrete graph object class.
pub trait ObjectType: Object + Class {
    /// New detached instance without a publicID.
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>>;

    /// Add `this` to `parent` if the parent kind accepts it.
    fn attach_to(_this: &Arc<RwLock<Self>>, _parent: &ObjectRef) -> bool {
        false
    }

    /// Remove `this` from `parent`.
    fn detach_from(_this: &Arc<RwLock<Self>>, _parent: &ObjectRef) -> bool {
        false
    }
}

/// Process-unique identity of a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(u64);

impl ObjectKey {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Link state every graph object embeds.
pub struct ObjectCore {
    key: ObjectKey,
    this: Option<WeakObjectRef>,
    parent: Option<WeakObjectRef>,
    registry: Arc<ObjectRegistry>,
}

impl ObjectCore {
    /// Core of an object being built with `Arc::new_cyclic`.
    pub fn new<T: ObjectType>(registry: &Arc<ObjectRegistry>, this: &Weak<RwLock<T>>) -> Self {
        let key = ObjectKey::next();
        Self {
            key,
            this: Some(WeakObjectRef::new(this.clone(), key)),
            parent: None,
            registry: registry.clone(),
        }
    }

    /// Core for a copy that is not (yet) shared.
    pub fn detached(registry: &Arc<ObjectRegistry>) -> Self {
        Self {
            key: ObjectKey::next(),
            this: None,
            parent: None,
            registry: registry.clone(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Strong handle to the owning object.
    pub fn this(&self) -> Option<ObjectRef> {
        self.this.as_ref().and_then(WeakObjectRef::upgrade)
    }

    pub fn weak_this(&self) -> Option<&WeakObjectRef> {
        self.this.as_ref()
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.as_ref().and_then(WeakObjectRef::upgrade)
    }

    pub fn parent_key(&self) -> Option<ObjectKey> {
        self.parent.as_ref().map(WeakObjectRef::key)
    }

    pub fn has_parent(&self) -> bool {
        self.parent.as_ref().is_some_and(WeakObjectRef::is_alive)
    }

    /// Replace the parent link. Used by the owning container only.
    pub fn set_parent(&mut self, parent: Option<WeakObjectRef>) {
        self.parent = parent;
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }
}

impl Drop for ObjectCore {
    fn drop(&mut self) {
        observer::notify_destroyed(self.key);
    }
}

impl fmt::Debug for ObjectCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCore")
            .field("key", &self.key)
            .field("parent", &self.parent_key())
            .finish()
    }
}

type LinkFn = fn(&ObjectRef, &ObjectRef) -> bool;

fn attach_thunk<T: ObjectType>(this: &ObjectRef, parent: &ObjectRef) -> bool {
    this.downcast::<T>()
        .is_some_and(|object| T::attach_to(&object, parent))
}

fn detach_thunk<T: ObjectType>(this: &ObjectRef, parent: &ObjectRef) -> bool {
    this.downcast::<T>()
        .is_some_and(|object| T::detach_from(&object, parent))
}

/// Type-erased strong handle to a graph object.
#[derive(Clone)]
pub struct ObjectRef {
    object: Arc<RwLock<dyn Object>>,
    any: Arc<dyn Any + Send + Sync>,
    key: ObjectKey,
    rtti: &'static Rtti,
    attach: LinkFn,
    detach: LinkFn,
}

impl ObjectRef {
    pub fn new<T: ObjectType>(object: Arc<RwLock<T>>) -> Self {
        let key = object.read().core().key();
        Self::with_key(object, key)
    }

    fn with_key<T: ObjectType>(object: Arc<RwLock<T>>, key: ObjectKey) -> Self {
        let any: Arc<dyn Any + Send + Sync> = object.clone();
        Self {
            object,
            any,
            key,
            rtti: T::type_info(),
            attach: attach_thunk::<T>,
            detach: detach_thunk::<T>,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, dyn Object> {
        self.object.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, dyn Object> {
        self.object.write()
    }

    /// Typed handle, `None` when the object is of another class.
    pub fn downcast<T: ObjectType>(&self) -> Option<Arc<RwLock<T>>> {
        self.any.clone().downcast::<RwLock<T>>().ok()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.key == other.key
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }

    pub fn type_info(&self) -> &'static Rtti {
        self.rtti
    }

    pub fn class_name(&self) -> &'static str {
        self.rtti.class_name()
    }

    pub fn is_type_of(&self, rtti: &Rtti) -> bool {
        self.rtti.is_type_of(rtti)
    }

    /// PublicID of a public object.
    pub fn public_id(&self) -> Option<String> {
        self.read().public_id().map(str::to_string)
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.read().parent()
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef {
            object: Arc::downgrade(&self.object),
            any: Arc::downgrade(&self.any),
            key: self.key,
            rtti: self.rtti,
            attach: self.attach,
            detach: self.detach,
        }
    }

    /// Add this object to `parent` through the parent's typed container.
    pub fn attach_to(&self, parent: &ObjectRef) -> bool {
        (self.attach)(self, parent)
    }

    /// Remove this object from `parent`.
    pub fn detach_from(&self, parent: &ObjectRef) -> bool {
        (self.detach)(self, parent)
    }

    /// Remove this object from its current parent.
    pub fn detach(&self) -> bool {
        match self.parent() {
            Some(parent) => self.detach_from(&parent),
            None => false,
        }
    }

    /// Walk this object and its descendants.
    pub fn accept(&self, visitor: &mut dyn Visitor) {
        visitor::walk(self, visitor);
    }

    /// Announce a modification: an update notifier for the parent and an
    /// `object_modified` event for observers.
    pub fn update(&self) {
        let parent_id = self.parent().and_then(|p| p.public_id()).unwrap_or_default();
        self.update_below(&parent_id);
    }

    /// Same as [`update`](Self::update) with the parent's publicID supplied
    /// by a caller that holds the parent's lock.
    pub fn update_below(&self, parent_id: &str) {
        let registry = self.read().core().registry().clone();
        registry
            .notifiers()
            .create(parent_id, Operation::Update, self);
        notify_modified(self);
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object.try_read() {
            Some(guard) => match guard.public_id() {
                Some(id) => write!(f, "{}({}){}", self.class_name(), id, self.key),
                None => write!(f, "{}{}", self.class_name(), self.key),
            },
            None => write!(f, "{}{} <locked>", self.class_name(), self.key),
        }
    }
}

/// Weak counterpart of [`ObjectRef`].
#[derive(Clone)]
pub struct WeakObjectRef {
    object: Weak<RwLock<dyn Object>>,
    any: Weak<dyn Any + Send + Sync>,
    key: ObjectKey,
    rtti: &'static Rtti,
    attach: LinkFn,
    detach: LinkFn,
}

impl WeakObjectRef {
    fn new<T: ObjectType>(object: Weak<RwLock<T>>, key: ObjectKey) -> Self {
        let any: Weak<dyn Any + Send + Sync> = object.clone();
        Self {
            object,
            any,
            key,
            rtti: T::type_info(),
            attach: attach_thunk::<T>,
            detach: detach_thunk::<T>,
        }
    }

    pub fn upgrade(&self) -> Option<ObjectRef> {
        Some(ObjectRef {
            object: self.object.upgrade()?,
            any: self.any.upgrade()?,
            key: self.key,
            rtti: self.rtti,
            attach: self.attach,
            detach: self.detach,
        })
    }

    pub fn key(&self) -> ObjectKey {
        self.key
    }

    pub fn class_name(&self) -> &'static str {
        self.rtti.class_name()
    }

    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weak({}{})", self.class_name(), self.key)
    }
}

/// Rebuild a typed handle from the object's own weak link.
pub fn handle_of<T: ObjectType>(object: &T) -> Option<Arc<RwLock<T>>> {
    object.core().this()?.downcast::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Comment, Pick};

    #[test]
    fn test_handles_share_identity() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create(&registry).expect("pick");
        let a = ObjectRef::new(pick.clone());
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.class_name(), "Pick");
        assert!(a.downcast::<Pick>().is_some());
        assert!(a.downcast::<Comment>().is_none());

        let weak = a.downgrade();
        assert!(weak.is_alive());
        drop((a, b, pick));
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_parent_drop_clears_back_links() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create(&registry).expect("pick");
        let comment = Comment::with_id(&registry, "c1", "text");
        assert!(pick.write().add_comment(comment.clone()));
        assert!(comment.read().core().has_parent());

        drop(pick);
        assert!(!comment.read().core().has_parent());
        assert!(comment.read().parent().is_none());
    }

    #[test]
    fn test_self_handle() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create(&registry).expect("pick");
        let again = handle_of(&*pick.read()).expect("self link");
        assert!(Arc::ptr_eq(&pick, &again));
    }
}
