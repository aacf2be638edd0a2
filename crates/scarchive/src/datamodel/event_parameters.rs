// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::children::{self, Owner};
use super::{version_supported, Origin, Pick};
use crate::archive::{Archive, Hint};
use crate::meta::{MetaObject, MetaProperty};
use crate::object::{
    BaseObject, Class, Object, ObjectCore, ObjectRef, ObjectRegistry, ObjectType,
    PublicObjectCore, PUBLIC_OBJECT_TYPE,
};
use crate::rtti::Rtti;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, OnceLock};

pub static EVENT_PARAMETERS_TYPE: Rtti =
    Rtti::new("EventParameters", Some(&PUBLIC_OBJECT_TYPE));

/// Root container of a catalogue: picks and origins.
pub struct EventParameters {
    core: ObjectCore,
    public: PublicObjectCore,
    picks: Vec<Arc<RwLock<Pick>>>,
    origins: Vec<Arc<RwLock<Origin>>>,
}

public_constructors!(EventParameters);

/// Resolve a public child against the registry before it is added.
///
/// A registered object with the same publicID replaces the candidate unless
/// it already has a parent, in which case the add is refused.
fn resolve_cached<T: ObjectType>(
    registry: &ObjectRegistry,
    owner: &ObjectCore,
    candidate: Arc<RwLock<T>>,
) -> Option<Arc<RwLock<T>>> {
    let class_name = T::type_info().class_name();
    {
        let guard = candidate.read();
        if guard.core().has_parent() {
            log::error!("EventParameters::add({}) -> element has already a parent", class_name);
            return None;
        }
    }
    if !registry.is_registration_enabled() {
        return Some(candidate);
    }
    let public_id = candidate.read().public_id().unwrap_or_default().to_string();
    let Some(cached) = registry.find_as::<T>(&public_id) else {
        return Some(candidate);
    };
    let parent = cached.read().core().parent_key();
    match parent {
        Some(key) if key == owner.key() => {
            log::debug!(
                "EventParameters::add({}) -> element with same publicID has been added already",
                class_name
            );
            None
        }
        Some(_) if cached.read().core().has_parent() => {
            log::debug!(
                "EventParameters::add({}) -> element with same publicID has been added \
                 already to another EventParameters",
                class_name
            );
            None
        }
        _ => Some(cached),
    }
}

fn find_public<T: ObjectType>(list: &[Arc<RwLock<T>>], public_id: &str) -> Option<Arc<RwLock<T>>> {
    list.iter()
        .find(|item| item.read().public_id() == Some(public_id))
        .cloned()
}

impl EventParameters {
    pub fn pick_count(&self) -> usize {
        self.picks.len()
    }

    pub fn pick(&self, i: usize) -> Option<Arc<RwLock<Pick>>> {
        self.picks.get(i).cloned()
    }

    pub fn find_pick(&self, public_id: &str) -> Option<Arc<RwLock<Pick>>> {
        find_public(&self.picks, public_id)
    }

    /// Add a pick. With registration enabled the registered pick carrying
    /// the same publicID is added in its place.
    pub fn add_pick(&mut self, pick: Arc<RwLock<Pick>>) -> bool {
        let registry = self.core.registry().clone();
        let Some(pick) = resolve_cached(&registry, &self.core, pick) else {
            return false;
        };
        children::adopt(Owner::new(&self.core, &self.public), &mut self.picks, pick);
        true
    }

    pub fn remove_pick(&mut self, pick: &Arc<RwLock<Pick>>) -> bool {
        let context = "EventParameters::remove(Pick)";
        match children::position_of(&self.core, &self.picks, pick, context) {
            Some(i) => children::release(Owner::new(&self.core, &self.public), &mut self.picks, i),
            None => false,
        }
    }

    pub fn remove_pick_at(&mut self, i: usize) -> bool {
        children::release(Owner::new(&self.core, &self.public), &mut self.picks, i)
    }

    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }

    pub fn origin(&self, i: usize) -> Option<Arc<RwLock<Origin>>> {
        self.origins.get(i).cloned()
    }

    pub fn find_origin(&self, public_id: &str) -> Option<Arc<RwLock<Origin>>> {
        find_public(&self.origins, public_id)
    }

    pub fn add_origin(&mut self, origin: Arc<RwLock<Origin>>) -> bool {
        let registry = self.core.registry().clone();
        let Some(origin) = resolve_cached(&registry, &self.core, origin) else {
            return false;
        };
        children::adopt(Owner::new(&self.core, &self.public), &mut self.origins, origin);
        true
    }

    pub fn remove_origin(&mut self, origin: &Arc<RwLock<Origin>>) -> bool {
        let context = "EventParameters::remove(Origin)";
        match children::position_of(&self.core, &self.origins, origin, context) {
            Some(i) => {
                children::release(Owner::new(&self.core, &self.public), &mut self.origins, i)
            }
            None => false,
        }
    }

    pub fn remove_origin_at(&mut self, i: usize) -> bool {
        children::release(Owner::new(&self.core, &self.public), &mut self.origins, i)
    }

    /// Registered public child of this object with the id of `child`.
    fn own_public_child<T: ObjectType>(&self, child: &dyn Object) -> Option<Arc<RwLock<T>>> {
        let public_id = child.public_id()?;
        let found = self.core.registry().find_as::<T>(public_id)?;
        if children::is_same(&found, child) {
            return Some(found);
        }
        let linked = found.read().core().parent_key() == Some(self.core.key());
        linked.then_some(found)
    }
}

impl BaseObject for EventParameters {
    fn rtti(&self) -> &'static Rtti {
        &EVENT_PARAMETERS_TYPE
    }

    fn meta(&self) -> &'static MetaObject {
        Self::meta_object()
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !version_supported(ar, "EventParameters") {
            return;
        }
        self.public.serialize(ar, "EventParameters");
        if !ar.success() || ar.hint().ignore_children {
            return;
        }
        let picks = ar.children("pick", &self.picks, Hint::NONE.static_type());
        for pick in picks {
            self.add_pick(pick);
        }
        let origins = ar.children("origin", &self.origins, Hint::NONE.static_type());
        for origin in origins {
            self.add_origin(origin);
        }
    }

    fn clone_box(&self) -> Box<dyn BaseObject> {
        Box::new(Self {
            core: ObjectCore::detached(self.core.registry()),
            public: self.public.detached_copy(),
            picks: Vec::new(),
            origins: Vec::new(),
        })
    }

    fn equals(&self, other: &dyn BaseObject) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn public_core(&self) -> Option<&PublicObjectCore> {
        Some(&self.public)
    }

    fn public_core_mut(&mut self) -> Option<&mut PublicObjectCore> {
        Some(&mut self.public)
    }
}

impl Class for EventParameters {
    fn type_info() -> &'static Rtti {
        &EVENT_PARAMETERS_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&EVENT_PARAMETERS_TYPE, Some(PublicObjectCore::meta()))
                .with_property(MetaProperty::array::<Self, Pick>(
                    "pick",
                    Self::pick_count,
                    Self::pick,
                    Self::add_pick,
                    Self::remove_pick_at,
                ))
                .with_property(MetaProperty::array::<Self, Origin>(
                    "origin",
                    Self::origin_count,
                    Self::origin,
                    Self::add_origin,
                    Self::remove_origin_at,
                ))
        })
    }
}

impl Object for EventParameters {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn children(&self) -> Vec<ObjectRef> {
        let picks = self.picks.iter().cloned().map(ObjectRef::new);
        let origins = self.origins.iter().cloned().map(ObjectRef::new);
        picks.chain(origins).collect()
    }

    fn assign(&mut self, other: &dyn Object) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.public.assign_from(&other.public);
        true
    }

    fn update_child(&mut self, child: &dyn Object) -> bool {
        let owner_id = self.public.public_id();
        if child.as_any().is::<Pick>() {
            return match self.own_public_child::<Pick>(child) {
                Some(target) => children::update_in_place(owner_id, &target, child),
                None => false,
            };
        }
        if child.as_any().is::<Origin>() {
            return match self.own_public_child::<Origin>(child) {
                Some(target) => children::update_in_place(owner_id, &target, child),
                None => false,
            };
        }
        false
    }

    fn index_matches(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.public == other.public)
    }
}

impl ObjectType for EventParameters {
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|this| {
            let core = ObjectCore::new::<Self>(registry, this);
            let public = PublicObjectCore::new(registry, core.weak_this().cloned());
            RwLock::new(Self {
                core,
                public,
                picks: Vec::new(),
                origins: Vec::new(),
            })
        })
    }
}

impl Drop for EventParameters {
    fn drop(&mut self) {
        children::orphan_all(&self.picks);
        children::orphan_all(&self.origins);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::Comment;
    use crate::object::Operation;

    #[test]
    fn test_add_substitutes_registered_pick() {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "ep").expect("ep");
        let live = Pick::create_with_id(&registry, "p").expect("live");

        registry.set_registration_enabled(false);
        let shadow = Pick::create_with_id(&registry, "p").expect("shadow");
        registry.set_registration_enabled(true);

        assert!(ep.write().add_pick(shadow.clone()));
        let added = ep.read().pick(0).expect("pick");
        assert!(Arc::ptr_eq(&added, &live));
        assert!(!shadow.read().core().has_parent());

        assert!(!ep.write().add_pick(shadow), "same publicID already added");
        assert_eq!(ep.read().pick_count(), 1);
    }

    #[test]
    fn test_add_refuses_pick_owned_elsewhere() {
        let registry = ObjectRegistry::new();
        let first = EventParameters::create_with_id(&registry, "ep1").expect("ep1");
        let second = EventParameters::create_with_id(&registry, "ep2").expect("ep2");
        let pick = Pick::create_with_id(&registry, "p").expect("pick");
        assert!(first.write().add_pick(pick.clone()));
        assert!(!second.write().add_pick(pick.clone()));

        registry.set_registration_enabled(false);
        let copy = Pick::create_with_id(&registry, "p").expect("copy");
        registry.set_registration_enabled(true);
        assert!(!second.write().add_pick(copy));
        assert_eq!(second.read().pick_count(), 0);
    }

    #[test]
    fn test_find_and_detach_by_public_id() {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "ep").expect("ep");
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        assert!(ObjectRef::new(origin.clone()).attach_to(&ObjectRef::new(ep.clone())));
        assert!(ep.read().find_origin("o").is_some());
        assert!(ep.read().find_origin("x").is_none());

        assert!(ObjectRef::new(origin.clone()).detach());
        assert_eq!(ep.read().origin_count(), 0);
    }

    #[test]
    fn test_add_announces_subtree() {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "ep").expect("ep");
        let pick = Pick::create_with_id(&registry, "p").expect("pick");
        assert!(pick.write().add_comment(Comment::with_id(&registry, "c", "note")));

        registry.notifiers().set_enabled(true);
        assert!(ep.write().add_pick(pick));
        let pending = registry.notifiers().take_all();
        registry.notifiers().set_enabled(false);

        let summary = pending
            .iter()
            .map(|n| (n.parent_id().to_string(), n.object().class_name(), n.operation()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                ("ep".to_string(), "Pick", Operation::Add),
                ("p".to_string(), "Comment", Operation::Add),
            ]
        );
    }

    #[test]
    fn test_update_public_child() {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "ep").expect("ep");
        let live = Pick::create_with_id(&registry, "p").expect("live");
        assert!(ep.write().add_pick(live.clone()));

        registry.set_registration_enabled(false);
        let incoming = Pick::create_with_id(&registry, "p").expect("incoming");
        registry.set_registration_enabled(true);
        incoming.write().set_method_id("relocated");

        assert!(ep.write().update_child(&*incoming.read()));
        assert_eq!(live.read().method_id(), "relocated");

        let stranger = Pick::create_with_id(&registry, "unattached").expect("stranger");
        assert!(!ep.write().update_child(&*stranger.read()));
    }
}
