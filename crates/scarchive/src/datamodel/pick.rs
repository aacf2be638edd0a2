// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::children::{self, Owner};
use super::{
    version_supported, Comment, CommentIndex, CreationInfo, EvaluationMode, EventParameters,
    PickOnset, RealQuantity, TimeQuantity,
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

pub static PICK_TYPE: Rtti = Rtti::new("Pick", Some(&PUBLIC_OBJECT_TYPE));

#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    time: TimeQuantity,
    filter_id: String,
    method_id: String,
    backazimuth: Option<RealQuantity>,
    onset: Option<PickOnset>,
    phase_hint: Option<String>,
    evaluation_mode: Option<EvaluationMode>,
    creation_info: Option<CreationInfo>,
}

/// Phase arrival time measured on a waveform.
pub struct Pick {
    core: ObjectCore,
    public: PublicObjectCore,
    attrs: Attributes,
    comments: Vec<Arc<RwLock<Comment>>>,
}

public_constructors!(Pick);

impl Pick {
    pub fn time(&self) -> &TimeQuantity {
        &self.attrs.time
    }

    pub fn set_time(&mut self, time: TimeQuantity) {
        self.attrs.time = time;
    }

    pub fn filter_id(&self) -> &str {
        &self.attrs.filter_id
    }

    pub fn set_filter_id(&mut self, filter_id: &str) {
        self.attrs.filter_id = filter_id.to_string();
    }

    pub fn method_id(&self) -> &str {
        &self.attrs.method_id
    }

    pub fn set_method_id(&mut self, method_id: &str) {
        self.attrs.method_id = method_id.to_string();
    }

    pub fn backazimuth(&self) -> Option<&RealQuantity> {
        self.attrs.backazimuth.as_ref()
    }

    pub fn set_backazimuth(&mut self, backazimuth: Option<RealQuantity>) {
        self.attrs.backazimuth = backazimuth;
    }

    pub fn onset(&self) -> Option<PickOnset> {
        self.attrs.onset
    }

    pub fn set_onset(&mut self, onset: Option<PickOnset>) {
        self.attrs.onset = onset;
    }

    pub fn phase_hint(&self) -> Option<&str> {
        self.attrs.phase_hint.as_deref()
    }

    pub fn set_phase_hint(&mut self, phase_hint: Option<String>) {
        self.attrs.phase_hint = phase_hint;
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

    /// Add a detached comment. Fails when the comment has a parent or a
    /// comment with the same index is already present.
    pub fn add_comment(&mut self, comment: Arc<RwLock<Comment>>) -> bool {
        let index = {
            let guard = comment.read();
            if guard.core().has_parent() {
                log::error!("Pick::add(Comment) -> element has already a parent");
                return false;
            }
            guard.index().clone()
        };
        if self.find_comment(&index).is_some() {
            log::error!(
                "Pick::add(Comment) -> an element with the same index has been added already"
            );
            return false;
        }
        children::adopt(Owner::new(&self.core, &self.public), &mut self.comments, comment);
        true
    }

    pub fn remove_comment(&mut self, comment: &Arc<RwLock<Comment>>) -> bool {
        let context = "Pick::remove(Comment)";
        let Some(i) = children::position_of(&self.core, &self.comments, comment, context) else {
            return false;
        };
        children::release(Owner::new(&self.core, &self.public), &mut self.comments, i)
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
}

impl BaseObject for Pick {
    fn rtti(&self) -> &'static Rtti {
        &PICK_TYPE
    }

    fn meta(&self) -> &'static MetaObject {
        Self::meta_object()
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !version_supported(ar, "Pick") {
            return;
        }
        self.public.serialize(ar, "Pick");
        if !ar.success() {
            return;
        }

        let attrs = &mut self.attrs;
        ar.field("time", &mut attrs.time, Hint::NONE.static_type().element().mandatory());
        ar.field("filterID", &mut attrs.filter_id, Hint::NONE.element());
        ar.field("methodID", &mut attrs.method_id, Hint::NONE.element());
        ar.field("backazimuth", &mut attrs.backazimuth, Hint::NONE.static_type().element());
        ar.field("onset", &mut attrs.onset, Hint::NONE.element());
        ar.field("phaseHint", &mut attrs.phase_hint, Hint::NONE.static_type().element());
        ar.field("evaluationMode", &mut attrs.evaluation_mode, Hint::NONE.element());
        ar.field("creationInfo", &mut attrs.creation_info, Hint::NONE.static_type().element());

        if ar.hint().ignore_children {
            return;
        }
        let read = ar.children("comment", &self.comments, Hint::NONE.static_type());
        for comment in read {
            self.add_comment(comment);
        }
    }

    fn clone_box(&self) -> Box<dyn BaseObject> {
        Box::new(Self {
            core: ObjectCore::detached(self.core.registry()),
            public: self.public.detached_copy(),
            attrs: self.attrs.clone(),
            comments: Vec::new(),
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

impl Class for Pick {
    fn type_info() -> &'static Rtti {
        &PICK_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&PICK_TYPE, Some(PublicObjectCore::meta()))
                .with_property(
                    MetaProperty::simple::<Self, TimeQuantity>(
                        "time",
                        "TimeQuantity",
                        |p| p.attrs.time.clone(),
                        |p, v| p.attrs.time = v,
                    )
                    .with_hint(Hint::NONE.static_type().element().mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "filterID",
                        "string",
                        |p| p.attrs.filter_id.clone(),
                        |p, v| p.attrs.filter_id = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "methodID",
                        "string",
                        |p| p.attrs.method_id.clone(),
                        |p, v| p.attrs.method_id = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<RealQuantity>>(
                        "backazimuth",
                        "RealQuantity",
                        |p| p.attrs.backazimuth.clone(),
                        |p, v| p.attrs.backazimuth = v,
                    )
                    .with_hint(Hint::NONE.static_type().element()),
                )
                .with_property(
                    MetaProperty::enumeration::<Self, PickOnset>(
                        "onset",
                        |p| p.attrs.onset,
                        |p, v| p.attrs.onset = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<String>>(
                        "phaseHint",
                        "string",
                        |p| p.attrs.phase_hint.clone(),
                        |p, v| p.attrs.phase_hint = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::enumeration::<Self, EvaluationMode>(
                        "evaluationMode",
                        |p| p.attrs.evaluation_mode,
                        |p, v| p.attrs.evaluation_mode = v,
                    )
                    .with_hint(Hint::NONE.element()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<CreationInfo>>(
                        "creationInfo",
                        "CreationInfo",
                        |p| p.attrs.creation_info.clone(),
                        |p, v| p.attrs.creation_info = v,
                    )
                    .with_hint(Hint::NONE.static_type().element()),
                )
                .with_property(MetaProperty::array::<Self, Comment>(
                    "comment",
                    Self::comment_count,
                    Self::comment,
                    Self::add_comment,
                    Self::remove_comment_at,
                ))
        })
    }
}

impl Object for Pick {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn children(&self) -> Vec<ObjectRef> {
        self.comments.iter().cloned().map(ObjectRef::new).collect()
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
        let Some(source) = child.as_any().downcast_ref::<Comment>() else {
            return false;
        };
        match self.find_comment(source.index()) {
            Some(target) => children::update_in_place(self.public.public_id(), &target, child),
            None => false,
        }
    }

    fn index_matches(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.public == other.public)
    }
}

impl ObjectType for Pick {
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|this| {
            let core = ObjectCore::new::<Self>(registry, this);
            let public = PublicObjectCore::new(registry, core.weak_this().cloned());
            RwLock::new(Self {
                core,
                public,
                attrs: Attributes::default(),
                comments: Vec::new(),
            })
        })
    }

    fn attach_to(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        match parent.downcast::<EventParameters>() {
            Some(ep) => ep.write().add_pick(this.clone()),
            None => {
                log::error!("Pick::attach_to({}) -> wrong class type", parent.class_name());
                false
            }
        }
    }

    fn detach_from(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        let Some(ep) = parent.downcast::<EventParameters>() else {
            log::error!("Pick::detach_from({}) -> wrong class type", parent.class_name());
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
            return ep.remove_pick(this);
        }
        match ep.find_pick(&public_id) {
            Some(pick) => ep.remove_pick(&pick),
            None => false,
        }
    }
}

impl Drop for Pick {
    fn drop(&mut self) {
        children::orphan_all(&self.comments);
    }
}
