// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{version_supported, CreationInfo, Origin, Pick};
use crate::archive::{Archive, Hint};
use crate::meta::{MetaObject, MetaProperty, Time};
use crate::object::{
    object_meta, BaseObject, Class, Object, ObjectCore, ObjectRef, ObjectRegistry, ObjectType,
    OBJECT_TYPE,
};
use crate::rtti::Rtti;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, OnceLock};

pub static COMMENT_TYPE: Rtti = Rtti::new("Comment", Some(&OBJECT_TYPE));

/// Composite index of a [`Comment`] within its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommentIndex {
    pub id: String,
}

impl CommentIndex {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    text: String,
    start: Option<Time>,
    end: Option<Time>,
    creation_info: Option<CreationInfo>,
}

/// Free text note attached to a pick or an origin.
pub struct Comment {
    core: ObjectCore,
    index: CommentIndex,
    attrs: Attributes,
}

impl Comment {
    /// New detached comment.
    pub fn with_id(registry: &Arc<ObjectRegistry>, id: &str, text: &str) -> Arc<RwLock<Self>> {
        let comment = Self::instantiate(registry);
        {
            let mut guard = comment.write();
            guard.index.id = id.to_string();
            guard.attrs.text = text.to_string();
        }
        comment
    }

    pub fn index(&self) -> &CommentIndex {
        &self.index
    }

    pub fn id(&self) -> &str {
        &self.index.id
    }

    pub fn set_id(&mut self, id: &str) {
        self.index.id = id.to_string();
    }

    pub fn text(&self) -> &str {
        &self.attrs.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.attrs.text = text.to_string();
    }

    pub fn start(&self) -> Option<Time> {
        self.attrs.start
    }

    pub fn set_start(&mut self, start: Option<Time>) {
        self.attrs.start = start;
    }

    pub fn end(&self) -> Option<Time> {
        self.attrs.end
    }

    pub fn set_end(&mut self, end: Option<Time>) {
        self.attrs.end = end;
    }

    pub fn creation_info(&self) -> Option<&CreationInfo> {
        self.attrs.creation_info.as_ref()
    }

    pub fn set_creation_info(&mut self, info: Option<CreationInfo>) {
        self.attrs.creation_info = info;
    }
}

impl BaseObject for Comment {
    fn rtti(&self) -> &'static Rtti {
        &COMMENT_TYPE
    }

    fn meta(&self) -> &'static MetaObject {
        Self::meta_object()
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !version_supported(ar, "Comment") {
            return;
        }
        ar.field("text", &mut self.attrs.text, Hint::NONE.element().mandatory());
        ar.field("id", &mut self.index.id, Hint::NONE.element().index());
        if ar.supports_version(0, 10) {
            ar.field("start", &mut self.attrs.start, Hint::NONE.element().split_time());
            ar.field("end", &mut self.attrs.end, Hint::NONE.element().split_time());
        }
        ar.field(
            "creationInfo",
            &mut self.attrs.creation_info,
            Hint::NONE.static_type().element(),
        );
    }

    fn clone_box(&self) -> Box<dyn BaseObject> {
        Box::new(Self {
            core: ObjectCore::detached(self.core.registry()),
            index: self.index.clone(),
            attrs: self.attrs.clone(),
        })
    }

    fn equals(&self, other: &dyn BaseObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.index == other.index && self.attrs == other.attrs)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Class for Comment {
    fn type_info() -> &'static Rtti {
        &COMMENT_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&COMMENT_TYPE, Some(object_meta()))
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "text",
                        "string",
                        |c| c.attrs.text.clone(),
                        |c, v| c.attrs.text = v,
                    )
                    .with_hint(Hint::NONE.element().mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "id",
                        "string",
                        |c| c.index.id.clone(),
                        |c, v| c.index.id = v,
                    )
                    .index()
                    .with_hint(Hint::NONE.element().index()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<Time>>(
                        "start",
                        "datetime",
                        |c| c.attrs.start,
                        |c, v| c.attrs.start = v,
                    )
                    .with_hint(Hint::NONE.element().split_time()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<Time>>(
                        "end",
                        "datetime",
                        |c| c.attrs.end,
                        |c, v| c.attrs.end = v,
                    )
                    .with_hint(Hint::NONE.element().split_time()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<CreationInfo>>(
                        "creationInfo",
                        "CreationInfo",
                        |c| c.attrs.creation_info.clone(),
                        |c, v| c.attrs.creation_info = v,
                    )
                    .with_hint(Hint::NONE.static_type().element()),
                )
        })
    }
}

impl Object for Comment {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn assign(&mut self, other: &dyn Object) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.index = other.index.clone();
        self.attrs = other.attrs.clone();
        true
    }

    fn index_matches(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.index == other.index)
    }
}

/// Classes owning a comment container.
enum Holder {
    Pick(Arc<RwLock<Pick>>),
    Origin(Arc<RwLock<Origin>>),
}

impl Holder {
    fn of(parent: &ObjectRef) -> Option<Self> {
        if let Some(pick) = parent.downcast::<Pick>() {
            return Some(Self::Pick(pick));
        }
        parent.downcast::<Origin>().map(Self::Origin)
    }
}

impl ObjectType for Comment {
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|this| {
            RwLock::new(Self {
                core: ObjectCore::new::<Self>(registry, this),
                index: CommentIndex::default(),
                attrs: Attributes::default(),
            })
        })
    }

    fn attach_to(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        match Holder::of(parent) {
            Some(Holder::Pick(pick)) => pick.write().add_comment(this.clone()),
            Some(Holder::Origin(origin)) => origin.write().add_comment(this.clone()),
            None => {
                log::error!("Comment::attach_to({}) -> wrong class type", parent.class_name());
                false
            }
        }
    }

    fn detach_from(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        let Some(holder) = Holder::of(parent) else {
            log::error!("Comment::detach_from({}) -> wrong class type", parent.class_name());
            return false;
        };
        // A copy of the child is removed by index from the parent.
        let (linked, index) = {
            let guard = this.read();
            (guard.core.parent_key() == Some(parent.key()), guard.index.clone())
        };
        match holder {
            Holder::Pick(pick) => {
                let mut pick = pick.write();
                if linked {
                    pick.remove_comment(this)
                } else {
                    pick.remove_comment_by_index(&index)
                }
            }
            Holder::Origin(origin) => {
                let mut origin = origin.write();
                if linked {
                    origin.remove_comment(this)
                } else {
                    origin.remove_comment_by_index(&index)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::EventParameters;

    #[test]
    fn test_attach_and_detach_through_handles() {
        let registry = ObjectRegistry::new();
        let origin = Origin::create_with_id(&registry, "o").expect("origin");
        let comment = ObjectRef::new(Comment::with_id(&registry, "c", "text"));
        let parent = ObjectRef::new(origin.clone());

        assert!(comment.attach_to(&parent));
        assert_eq!(origin.read().comment_count(), 1);
        assert!(comment.parent().is_some_and(|p| p.ptr_eq(&parent)));

        assert!(comment.detach());
        assert_eq!(origin.read().comment_count(), 0);
        assert!(comment.parent().is_none());
        assert!(!comment.detach());
    }

    #[test]
    fn test_detach_copy_by_index() {
        let registry = ObjectRegistry::new();
        let pick = Pick::create_with_id(&registry, "p").expect("pick");
        assert!(pick.write().add_comment(Comment::with_id(&registry, "c", "one")));

        let copy = ObjectRef::new(Comment::with_id(&registry, "c", "two"));
        assert!(copy.detach_from(&ObjectRef::new(pick.clone())));
        assert_eq!(pick.read().comment_count(), 0);
    }

    #[test]
    fn test_wrong_parent_class() {
        let registry = ObjectRegistry::new();
        let ep = ObjectRef::new(EventParameters::create_with_id(&registry, "ep").expect("ep"));
        let comment = ObjectRef::new(Comment::with_id(&registry, "c", "text"));
        assert!(!comment.attach_to(&ep));
        assert!(!comment.detach_from(&ep));
    }

    #[test]
    fn test_assign_and_equality() {
        let registry = ObjectRegistry::new();
        let a = Comment::with_id(&registry, "c", "text");
        let b = Comment::with_id(&registry, "c", "other");
        assert!(!a.read().equals(&*b.read()));
        assert!(a.read().index_matches(&*b.read()));

        let source = b.read();
        assert!(a.write().assign(&*source));
        assert!(a.read().equals(&*source));

        let copy = a.read().clone_box();
        assert!(copy.equals(&*source));
        assert_eq!(copy.class_name(), "Comment");
    }
}
