// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{object_meta, ObjectKey, ObjectRef, ObjectRegistry, WeakObjectRef, OBJECT_TYPE};
use crate::archive::{Archive, Hint};
use crate::meta::{MetaError, MetaObject, MetaProperty};
use crate::object::{BaseObject, Class, ObjectType};
use crate::rtti::Rtti;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Graph objects addressable by a unique publicID.
pub static PUBLIC_OBJECT_TYPE: Rtti = Rtti::new("PublicObject", Some(&OBJECT_TYPE));

fn public_core_of(obj: &dyn BaseObject) -> Result<&PublicObjectCore, MetaError> {
    obj.public_core().ok_or_else(|| MetaError::TypeMismatch {
        expected: "PublicObject".to_string(),
        got: obj.class_name().to_string(),
    })
}

impl PublicObjectCore {
    /// Meta description of the publicID shared by all public classes.
    pub fn meta() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&PUBLIC_OBJECT_TYPE, Some(object_meta())).with_property(
                MetaProperty::erased::<String>(
                    "publicID",
                    "string",
                    |obj| Ok(public_core_of(obj)?.public_id().to_string()),
                    |obj, id| {
                        let class_name = obj.class_name();
                        let core = obj.public_core_mut().ok_or_else(|| MetaError::TypeMismatch {
                            expected: "PublicObject".to_string(),
                            got: class_name.to_string(),
                        })?;
                        if core.set_public_id(&id) {
                            Ok(())
                        } else {
                            Err(MetaError::InvalidOperation(format!(
                                "publicID {} already in use",
                                id
                            )))
                        }
                    },
                ),
            )
        })
    }
}

/// Identity part of a public object.
///
/// Registration is tied to the publicID: changing the id moves the registry
/// entry, dropping the core removes it. A core whose id could not be
/// registered keeps the id but is not findable.
pub struct PublicObjectCore {
    public_id: String,
    registered: bool,
    this: Option<WeakObjectRef>,
    registry: Arc<ObjectRegistry>,
}

impl PublicObjectCore {
    /// Unregistered identity for the object behind `this`.
    pub fn new(registry: &Arc<ObjectRegistry>, this: Option<WeakObjectRef>) -> Self {
        Self {
            public_id: String::new(),
            registered: false,
            this,
            registry: registry.clone(),
        }
    }

    /// Identity for a value copy: same publicID, never registered.
    pub fn detached_copy(&self) -> Self {
        Self {
            public_id: self.public_id.clone(),
            registered: false,
            this: None,
            registry: self.registry.clone(),
        }
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }

    fn key(&self) -> Option<ObjectKey> {
        self.this.as_ref().map(WeakObjectRef::key)
    }

    /// Change the publicID, moving the registry entry along.
    ///
    /// Returns false when the new id could not be registered. The id is
    /// taken anyway.
    pub fn set_public_id(&mut self, public_id: &str) -> bool {
        self.deregister();
        self.public_id = public_id.to_string();
        self.register()
    }

    /// Enter the current publicID in the registry.
    ///
    /// Succeeds without registering when registration is disabled.
    pub fn register(&mut self) -> bool {
        if !self.registry.is_registration_enabled() {
            return true;
        }
        if self.registered {
            return true;
        }
        let Some(this) = self.this.as_ref() else {
            return false;
        };
        if !self.registry.register(&self.public_id, this) {
            return false;
        }
        self.registered = true;
        true
    }

    /// Remove the publicID from the registry.
    pub fn deregister(&mut self) -> bool {
        if !self.registered {
            return false;
        }
        self.registered = false;
        match self.key() {
            Some(key) => self.registry.deregister(&self.public_id, key),
            None => false,
        }
    }

    /// Take over the publicID of `other` if this object has none yet.
    pub fn assign_from(&mut self, other: &PublicObjectCore) {
        if self.public_id.is_empty() && !other.public_id.is_empty() {
            self.set_public_id(&other.public_id);
        }
    }

    /// Read or write the publicID.
    ///
    /// On read an absent publicID is generated from the registry pattern
    /// when id generation is enabled. A failed registration is not an
    /// archive error.
    pub fn serialize(&mut self, ar: &mut dyn Archive, class_name: &str) {
        if ar.is_reading() {
            self.deregister();
            let mut public_id = String::new();
            ar.field("publicID", &mut public_id, Hint::NONE);
            if public_id.is_empty() && self.registry.is_id_generation_enabled() {
                public_id = self.registry.generate_id(class_name);
            }
            self.public_id = public_id;
            if !self.register() {
                log::debug!(
                    "[registry] {} {} read but not registered",
                    class_name,
                    self.public_id
                );
            }
        } else {
            ar.field("publicID", &mut self.public_id, Hint::NONE);
        }
    }
}

impl Drop for PublicObjectCore {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl PartialEq for PublicObjectCore {
    fn eq(&self, other: &Self) -> bool {
        self.public_id == other.public_id
    }
}

impl fmt::Debug for PublicObjectCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicObjectCore")
            .field("public_id", &self.public_id)
            .field("registered", &self.registered)
            .finish()
    }
}

/// New instance of `T` registered under `public_id`.
///
/// Fails while registration is enabled and the id is in use. The id is
/// claimed in the same registry step that checks it.
pub fn create_public<T: ObjectType>(
    registry: &Arc<ObjectRegistry>,
    public_id: &str,
) -> Option<Arc<RwLock<T>>> {
    let class_name = T::type_info().class_name();
    if public_id.is_empty() {
        log::error!("{}::create(): empty publicID", class_name);
        return None;
    }
    let object = T::instantiate(registry);
    if !object.write().public_core_mut()?.set_public_id(public_id) {
        log::error!("{}::create(): id {} already in use", class_name, public_id);
        return None;
    }
    Some(object)
}

/// Change the publicID of a shared object.
///
/// Returns false for objects that are not public or when the new id is
/// already taken.
pub fn set_public_id(object: &ObjectRef, public_id: &str) -> bool {
    let mut guard = object.write();
    match guard.public_core_mut() {
        Some(core) => core.set_public_id(public_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Comment, Pick};
    use crate::object::Object;

    #[test]
    fn test_set_public_id_moves_entry() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create_with_id(&registry, "a").expect("a");
        let handle = ObjectRef::new(pick.clone());

        assert!(set_public_id(&handle, "b"));
        assert!(registry.find("a").is_none());
        assert!(registry.find("b").is_some_and(|found| found.ptr_eq(&handle)));

        let other = Pick::create_with_id(&registry, "c").expect("c");
        assert!(!set_public_id(&ObjectRef::new(other.clone()), "b"));
        assert_eq!(other.read().public_id(), Some("b"));
        assert!(registry.find("b").is_some_and(|found| found.ptr_eq(&handle)));
    }

    #[test]
    fn test_non_public_objects_have_no_id() {
        let registry = ObjectRegistry::new();
        let comment = ObjectRef::new(Comment::instantiate(&registry));
        assert!(!set_public_id(&comment, "x"));
        assert_eq!(comment.public_id(), None);
    }

    #[test]
    fn test_public_id_property() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create_with_id(&registry, "prop").expect("prop");
        let meta = Pick::meta_object();
        let property = meta.property("publicID").expect("inherited");
        assert_eq!(property.read_string(&*pick.read()).expect("read"), "prop");
        property
            .write_string(&mut *pick.write(), "renamed")
            .expect("write");
        assert!(registry.find("renamed").is_some());
        assert!(registry.find("prop").is_none());
    }

    #[test]
    fn test_public_id_property_refuses_taken_id() {
        let registry = ObjectRegistry::new();
        let _taken = Pick::create_with_id(&registry, "taken").expect("taken");
        let pick = Pick::create_with_id(&registry, "free").expect("free");
        let property = Pick::meta_object().property("publicID").expect("inherited");
        let result = property.write_string(&mut *pick.write(), "taken");
        assert!(matches!(result, Err(MetaError::InvalidOperation(_))));
        assert!(!pick.read().public_core().expect("public").is_registered());
    }

    #[test]
    fn test_concurrent_creation_registers_once() {
        let registry = ObjectRegistry::new();
        let barrier = std::sync::Barrier::new(8);
        let created: Vec<Arc<RwLock<Pick>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        create_public::<Pick>(&registry, "Pick/shared")
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().expect("thread"))
                .collect()
        });
        assert_eq!(created.len(), 1);
        let found = registry.find("Pick/shared").expect("registered");
        assert!(found.ptr_eq(&ObjectRef::new(created[0].clone())));
        assert!(created[0].read().public_core().expect("public").is_registered());
    }

    #[test]
    fn test_copies_are_unregistered() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create_with_id(&registry, "orig").expect("orig");
        let copy = pick.read().public_core().expect("public").detached_copy();
        assert_eq!(copy.public_id(), "orig");
        assert!(!copy.is_registered());
        drop(copy);
        assert!(registry.find("orig").is_some());
    }
}
