// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::children::{self, Owner};
use super::{
    version_supported, Arrival, ArrivalIndex, Comment, CommentIndex, CreationInfo,
    EvaluationMode, EventParameters, RealQuantity, TimeQuantity,
};
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

pub static ORIGIN_TYPE: Rtti = Rtti::new("Origin", Some(&PUBLIC_OBJECT_TYPE));

#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    time: TimeQuantity,
    latitude: RealQuantity,
    longitude: RealQuantity,
    depth: Option<RealQuantity>,
    method_id: String,
    earth_model_id: String,
    evaluation_mode: Option<EvaluationMode>,
    creation_info: Option<CreationInfo>,
}

/// Hypocenter solution with the arrivals it was located from.
pub struct Origin {
    core: ObjectCore,
    public: PublicObjectCore,
    attrs: Attributes,
    comments: Vec<Arc<RwLock<Comment>>>,
    arrivals: Vec<Arc<RwLock<Arrival>>>,
}

public_constructors!(Origin);

impl Origin {
    pub fn time(&self) -> &TimeQuantity {
        &self.attrs.time
    }

    pub fn set_time(&mut self, time: TimeQuantity) {
        self.attrs.time = time;
    }

    pub fn latitude(&self) -> &RealQuantity {
        &self.attrs.latitude
    }

    pub fn set_latitude(&mut self, latitude: RealQuantity) {
        self.attrs.latitude = latitude;
    }

    pub fn longitude(&self) -> &RealQuantity {
        &self.attrs.longitude
    }

    pub fn set_longitude(&mut self, longitude: RealQuantity) {
        self.attrs.longitude = longitude;
    }

    pub fn depth(&self) -> Option<&RealQuantity> {
        self.attrs.depth.as_ref()
    }

    pub fn set_depth(&mut self, depth: Option<RealQuantity>) {
        self.attrs.depth = depth;
    }

    pub fn method_id(&self) -> &str {
        &self.attrs.method_id
    }

    pub fn set_method_id(&mut self, method_id: &str) {
        self.attrs.method_id = method_id.to_string();
    }

    pub fn earth_model_id(&self) -> &str {
        &self.attrs.earth_model_id
    }

    pub fn set_earth_model_id(&mut self, earth_model_id: &str) {
        self.attrs.earth_model_id = earth_model_id.to_string();
    }

    pub fn evaluation_mode(&self) -> Option<EvaluationMode> {
        self.attrs.evaluation_mode
    }

    pub fn set_evaluation_mode(&mut self, mode: Option<EvaluationMode>) {
        self.attrs.evaluation_mode = mode;
    }

    pub fn creation_info(&self) -> Option<&CreationInfo> {
        self.attrs.creation_info.as_ref()
    }

    pub fn set_creation_info(&mut self, info: Option<CreationInfo>) {
        self.attrs.creation_info = info;
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn comment(&self, i: usize) -> Option<Arc<RwLock<Comment>>> {
        self.comments.get(i).cloned()
    }

    pub fn find_comment(&self, index: &CommentIndex) -> Option<Arc<RwLock<Comment>>> {
        self.comments
            .iter()
            .find(|comment| comment.read().index() == index)
            .cloned()
    }

    pub fn add_comment(&mut self, comment: Arc<RwLock<Comment>>) -> bool {
        let index = {
            let guard = comment.read();
            if guard.core().has_parent() {
                log::error!("Origin::add(Comment) -> element has already a parent");
                return false;
            }
            guard.index().clone()
        };
        if self.find_comment(&index).is_some() {
            log::error!(
                "Origin::add(Comment) -> an element with the same index has been added already"
            );
            return false;
        }
        children::adopt(Owner::new(&self.core, &self.public), &mut self.comments, comment);
        true
    }

    pub fn remove_comment(&mut self, comment: &Arc<RwLock<Comment>>) -> bool {
        let context = "Origin::remove(Comment)";
        match children::position_of(&self.core, &self.comments, comment, context) {
            Some(i) => {
                children::release(Owner::new(&self.core, &self.public), &mut self.comments, i)
            }
            None => false,
        }
    }

    pub fn remove_comment_at(&mut self, i: usize) -> bool {
        children::release(Owner::new(&self.core, &self.public), &mut self.comments, i)
    }

    pub fn remove_comment_by_index(&mut self, index: &CommentIndex) -> bool {
        match self.find_comment(index) {
            Some(comment) => self.remove_comment(&comment),
            None => false,
        }
    }

    pub fn arrival_count(&self) -> usize {
        self.arrivals.len()
    }

    pub fn arrival(&self, i: usize) -> Option<Arc<RwLock<Arrival>>> {
        self.arrivals.get(i).cloned()
    }

    pub fn find_arrival(&self, index: &ArrivalIndex) -> Option<Arc<RwLock<Arrival>>> {
        self.arrivals
            .iter()
            .find(|arrival| arrival.read().index() == index)
            .cloned()
    }

    pub fn add_arrival(&mut self, arrival: Arc<RwLock<Arrival>>) -> bool {
        let index = {
            let guard = arrival.read();
            if guard.core().has_parent() {
                log::error!("Origin::add(Arrival) -> element has already a parent");
                return false;
            }
            guard.index().clone()
        };
        if self.find_arrival(&index).is_some() {
            log::error!(
                "Origin::add(Arrival) -> an element with the same index has been added already"
            );
            return false;
        }
        children::adopt(Owner::new(&self.core, &self.public), &mut self.arrivals, arrival);
        true
    }

    pub fn remove_arrival(&mut self, arrival: &Arc<RwLock<Arrival>>) -> bool {
        let context = "Origin::remove(Arrival)";
        match children::position_of(&self.core, &self.arrivals, arrival, context) {
            Some(i) => {
                children::release(Owner::new(&self.core, &self.public), &mut self.arrivals, i)
            }
            None => false,
        }
    }

    pub fn remove_arrival_at(&mut self, i: usize) -> bool {
        children::release(Owner::new(&self.core, &self.public), &mut self.arrivals, i)
    }

    pub fn remove_arrival_by_index(&mut self, index: &ArrivalIndex) -> bool {
        match self.find_arrival(index) {
            Some(arrival) => self.remove_arrival(&arrival),
            None => false,
        }
    }
}

impl BaseObject for Origin {
    fn rtti(&self) -> &'static Rtti {
        &ORIGIN_TYPE
    }

    fn meta(&self) -> &'static MetaObject {
        Self::meta_object()
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !version_supported(ar, "Origin") {
            return;
        }
        self.public.serialize(ar, "Origin");
        if !ar.success() {
            return;
        }

        let attrs = &mut self.attrs;
        let quantity = Hint::NONE.static_type().element();
        ar.field("time", &mut attrs.time, quantity.mandatory());
        ar.field("latitude", &mut attrs.latitude, quantity.mandatory());
        ar.field("longitude", &mut attrs.longitude, quantity.mandatory());
        ar.field("depth", &mut attrs.depth, quantity);
        ar.field("methodID", &mut attrs.method_id, Hint::NONE.element());
        ar.field("earthModelID", &mut attrs.earth_model_id, Hint::NONE.element());
        ar.field("evaluationMode", &mut attrs.evaluation_mode, Hint::NONE.element());
        ar.field("creationInfo", &mut attrs.creation_info, quantity);

        if ar.hint().ignore_children {
            return;
        }
        let comments = ar.children("comment", &self.comments, Hint::NONE.static_type());
        for comment in comments {
            self.add_comment(comment);
        }
        let arrivals = ar.children("arrival", &self.arrivals, Hint::NONE.static_type());
        for arrival in arrivals {
            self.add_arrival(arrival);
        }
    }

    fn clone_box(&self) -> Box<dyn BaseObject> {
        Box::new(Self {
            core: ObjectCore::detached(self.core.registry()),
            public: self.public.detached_copy(),
            attrs: self.attrs.clone(),
            comments: Vec::new(),
            arrivals: Vec::new(),
        })
    }

    fn equals(&self, other: &dyn BaseObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.attrs == other.attrs)
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

impl Class for Origin {
    fn type_info() -> &'static Rtti {
        &ORIGIN_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            let quantity = Hint::NONE.static_type().element();
            MetaObject::new(&ORIGIN_TYPE, Some(PublicObjectCore::meta()))
                .with_property(
                    MetaProperty::simple::<Self, TimeQuantity>(
                        "time",
                        "TimeQuantity",
                        |o| o.attrs.time.clone(),
                        |o, v| o.attrs.time = v,
                    )
                    .with_hint(quantity.mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, RealQuantity>(
                        "latitude",
                        "RealQuantity",
                        |o| o.attrs.latitude.clone(),
                        |o, v| o.attrs.latitude = v,
                    )
                    .with_hint(quantity.mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, RealQuantity>(
                        "longitude",
                        "RealQuantity",
                        |o| o.attrs.longitude.clone(),
                        |o, v| o.attrs.longitude = v,
                    )
                    .with_hint(quantity.mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<RealQuantity>>(
                        "depth",
                        "RealQuantity",
                        |o| o.attrs.depth.clone(),
                        |o, v| o.attrs.depth = v,
                    )
                    .with_hint(quantity),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "methodID",
                        "string",
                        |o| o.attrs.method_id.clone(),
                        |o, v| o.attrs.method_id = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "earthModelID",
                        "string",
                        |o| o.attrs.earth_model_id.clone(),
                        |o, v| o.attrs.earth_model_id = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::enumeration::<Self, EvaluationMode>(
                        "evaluationMode",
                        |o| o.attrs.evaluation_mode,
                        |o, v| o.attrs.evaluation_mode = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<CreationInfo>>(
                        "creationInfo",
                        "CreationInfo",
                        |o| o.attrs.creation_info.clone(),
                        |o, v| o.attrs.creation_info = v,
                    )
                    .with_hint(quantity),
                )
                .with_property(MetaProperty::array::<Self, Comment>(
                    "comment",
                    Self::comment_count,
                    Self::comment,
                    Self::add_comment,
                    Self::remove_comment_at,
                ))
                .with_property(MetaProperty::array::<Self, Arrival>(
                    "arrival",
                    Self::arrival_count,
                    Self::arrival,
                    Self::add_arrival,
                    Self::remove_arrival_at,
                ))
        })
    }
}

impl Object for Origin {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn children(&self) -> Vec<ObjectRef> {
        let comments = self.comments.iter().cloned().map(ObjectRef::new);
        let arrivals = self.arrivals.iter().cloned().map(ObjectRef::new);
        comments.chain(arrivals).collect()
    }

    fn assign(&mut self, other: &dyn Object) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.public.assign_from(&other.public);
        self.attrs = other.attrs.clone();
        true
    }

    fn update_child(&mut self, child: &dyn Object) -> bool {
        let owner_id = self.public.public_id();
        if let Some(source) = child.as_any().downcast_ref::<Comment>() {
            return match self.find_comment(source.index()) {
                Some(target) => children::update_in_place(owner_id, &target, child),
                None => false,
            };
        }
        if let Some(source) = child.as_any().downcast_ref::<Arrival>() {
            return match self.find_arrival(source.index()) {
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

impl ObjectType for Origin {
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|this| {
            let core = ObjectCore::new::<Self>(registry, this);
            let public = PublicObjectCore::new(registry, core.weak_this().cloned());
            RwLock::new(Self {
                core,
                public,
                attrs: Attributes::default(),
                comments: Vec::new(),
                arrivals: Vec::new(),
            })
        })
    }

    fn attach_to(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        match parent.downcast::<EventParameters>() {
            Some(ep) => ep.write().add_origin(this.clone()),
            None => {
                log::error!("Origin::attach_to({}) -> wrong class type", parent.class_name());
                false
            }
        }
    }

    fn detach_from(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        let Some(ep) = parent.downcast::<EventParameters>() else {
            log::error!("Origin::detach_from({}) -> wrong class type", parent.class_name());
            return false;
        };
        let (linked, public_id) = {
            let guard = this.read();
            (
                guard.core.parent_key() == Some(parent.key()),
                guard.public.public_id().to_string(),
            )
        };
        let mut ep = ep.write();
        if linked {
            return ep.remove_origin(this);
        }
        match ep.find_origin(&public_id) {
            Some(origin) => ep.remove_origin(&origin),
            None => false,
        }
    }
}

impl Drop for Origin {
    fn drop(&mut self) {
        children::orphan_all(&self.comments);
        children::orphan_all(&self.arrivals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::Pick;
    use crate::object::Operation;

    #[test]
    fn test_children_in_declaration_order() {
        let registry = ObjectRegistry::new();
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        let mut guard = origin.write();
        assert!(guard.add_arrival(Arrival::with_pick(&registry, "p1", "P")));
        assert!(guard.add_comment(Comment::with_id(&registry, "c", "note")));
        assert!(!guard.add_arrival(Arrival::with_pick(&registry, "p1", "S")));

        let classes = guard
            .children()
            .iter()
            .map(ObjectRef::class_name)
            .collect::<Vec<_>>();
        assert_eq!(classes, ["Comment", "Arrival"]);
    }

    #[test]
    fn test_remove_public_parent_emits_subtree() {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "ep").expect("ep");
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        {
            let mut guard = origin.write();
            assert!(guard.add_comment(Comment::with_id(&registry, "c", "note")));
            assert!(guard.add_arrival(Arrival::with_pick(&registry, "p1", "P")));
        }
        assert!(ep.write().add_origin(origin.clone()));

        registry.notifiers().set_enabled(true);
        assert!(ep.write().remove_origin(&origin));
        let pending = registry.notifiers().take_all();
        registry.notifiers().set_enabled(false);

        let summary = pending
            .iter()
            .map(|n| (n.parent_id().to_string(), n.object().class_name()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                ("o".to_string(), "Comment"),
                ("o".to_string(), "Arrival"),
                ("ep".to_string(), "Origin"),
            ]
        );
        assert!(pending.iter().all(|n| n.operation() == Operation::Remove));
        assert!(!origin.read().core().has_parent());
    }

    #[test]
    fn test_update_child_by_index() {
        let registry = ObjectRegistry::new();
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        let live = Arrival::with_pick(&registry, "p1", "P");
        assert!(origin.write().add_arrival(live.clone()));

        let incoming = Arrival::with_pick(&registry, "p1", "Pn");
        incoming.write().set_weight(Some(0.5));
        assert!(origin.write().update_child(&*incoming.read()));
        assert_eq!(live.read().phase(), "Pn");
        assert_eq!(live.read().weight(), Some(0.5));

        let pick = Pick::instantiate(&registry);
        assert!(!origin.write().update_child(&*pick.read()));
    }
}
