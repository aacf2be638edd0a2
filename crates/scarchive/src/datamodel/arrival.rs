// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{version_supported, CreationInfo, Origin};
use crate::archive::{Archive, Hint};
use crate::meta::{MetaObject, MetaProperty};
use crate::object::{
    object_meta, BaseObject, Class, Object, ObjectCore, ObjectRef, ObjectRegistry, ObjectType,
    OBJECT_TYPE,
};
use crate::rtti::Rtti;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, OnceLock};

pub static ARRIVAL_TYPE: Rtti = Rtti::new("Arrival", Some(&OBJECT_TYPE));

/// Composite index of an [`Arrival`]: the pick it associates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArrivalIndex {
    pub pick_id: String,
}

impl ArrivalIndex {
    pub fn new(pick_id: &str) -> Self {
        Self {
            pick_id: pick_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    phase: String,
    time_residual: Option<f64>,
    distance: Option<f64>,
    azimuth: Option<f64>,
    weight: Option<f64>,
    creation_info: Option<CreationInfo>,
}

/// Association of a pick with an origin.
pub struct Arrival {
    core: ObjectCore,
    index: ArrivalIndex,
    attrs: Attributes,
}

impl Arrival {
    /// New detached arrival referencing the pick `pick_id`.
    pub fn with_pick(
        registry: &Arc<ObjectRegistry>,
        pick_id: &str,
        phase: &str,
    ) -> Arc<RwLock<Self>> {
        let arrival = Self::instantiate(registry);
        {
            let mut guard = arrival.write();
            guard.index.pick_id = pick_id.to_string();
            guard.attrs.phase = phase.to_string();
        }
        arrival
    }

    pub fn index(&self) -> &ArrivalIndex {
        &self.index
    }

    pub fn pick_id(&self) -> &str {
        &self.index.pick_id
    }

    pub fn set_pick_id(&mut self, pick_id: &str) {
        self.index.pick_id = pick_id.to_string();
    }

    pub fn phase(&self) -> &str {
        &self.attrs.phase
    }

    pub fn set_phase(&mut self, phase: &str) {
        self.attrs.phase = phase.to_string();
    }

    pub fn time_residual(&self) -> Option<f64> {
        self.attrs.time_residual
    }

    pub fn set_time_residual(&mut self, value: Option<f64>) {
        self.attrs.time_residual = value;
    }

    pub fn distance(&self) -> Option<f64> {
        self.attrs.distance
    }

    pub fn set_distance(&mut self, value: Option<f64>) {
        self.attrs.distance = value;
    }

    pub fn azimuth(&self) -> Option<f64> {
        self.attrs.azimuth
    }

    pub fn set_azimuth(&mut self, value: Option<f64>) {
        self.attrs.azimuth = value;
    }

    pub fn weight(&self) -> Option<f64> {
        self.attrs.weight
    }

    pub fn set_weight(&mut self, value: Option<f64>) {
        self.attrs.weight = value;
    }

    pub fn creation_info(&self) -> Option<&CreationInfo> {
        self.attrs.creation_info.as_ref()
    }

    pub fn set_creation_info(&mut self, info: Option<CreationInfo>) {
        self.attrs.creation_info = info;
    }
}

impl BaseObject for Arrival {
    fn rtti(&self) -> &'static Rtti {
        &ARRIVAL_TYPE
    }

    fn meta(&self) -> &'static MetaObject {
        Self::meta_object()
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !version_supported(ar, "Arrival") {
            return;
        }
        let attrs = &mut self.attrs;
        ar.field("pickID", &mut self.index.pick_id, Hint::NONE.element().index());
        ar.field("phase", &mut attrs.phase, Hint::NONE.element().mandatory());
        ar.field("timeResidual", &mut attrs.time_residual, Hint::NONE.element());
        ar.field("distance", &mut attrs.distance, Hint::NONE.element());
        ar.field("azimuth", &mut attrs.azimuth, Hint::NONE.element());
        ar.field("weight", &mut attrs.weight, Hint::NONE.element());
        ar.field(
            "creationInfo",
            &mut attrs.creation_info,
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

fn optional_float(
    name: &'static str,
    get: fn(&Arrival) -> Option<f64>,
    set: fn(&mut Arrival, Option<f64>),
) -> MetaProperty {
    MetaProperty::simple::<Arrival, Option<f64>>(name, "float", get, set)
        .with_hint(Hint::NONE.element())
}

impl Class for Arrival {
    fn type_info() -> &'static Rtti {
        &ARRIVAL_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&ARRIVAL_TYPE, Some(object_meta()))
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "pickID",
                        "string",
                        |a| a.index.pick_id.clone(),
                        |a, v| a.index.pick_id = v,
                    )
                    .index()
                    .reference()
                    .with_hint(Hint::NONE.element().index()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "phase",
                        "string",
                        |a| a.attrs.phase.clone(),
                        |a, v| a.attrs.phase = v,
                    )
                    .with_hint(Hint::NONE.element().mandatory()),
                )
                .with_property(optional_float(
                    "timeResidual",
                    |a| a.attrs.time_residual,
                    |a, v| a.attrs.time_residual = v,
                ))
                .with_property(optional_float(
                    "distance",
                    |a| a.attrs.distance,
                    |a, v| a.attrs.distance = v,
                ))
                .with_property(optional_float(
                    "azimuth",
                    |a| a.attrs.azimuth,
                    |a, v| a.attrs.azimuth = v,
                ))
                .with_property(optional_float(
                    "weight",
                    |a| a.attrs.weight,
                    |a, v| a.attrs.weight = v,
                ))
                .with_property(
                    MetaProperty::simple::<Self, Option<CreationInfo>>(
                        "creationInfo",
                        "CreationInfo",
                        |a| a.attrs.creation_info.clone(),
                        |a, v| a.attrs.creation_info = v,
                    )
                    .with_hint(Hint::NONE.static_type().element()),
                )
        })
    }
}

impl Object for Arrival {
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

impl ObjectType for Arrival {
    fn instantiate(registry: &Arc<ObjectRegistry>) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|this| {
            RwLock::new(Self {
                core: ObjectCore::new::<Self>(registry, this),
                index: ArrivalIndex::default(),
                attrs: Attributes::default(),
            })
        })
    }

    fn attach_to(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        match parent.downcast::<Origin>() {
            Some(origin) => origin.write().add_arrival(this.clone()),
            None => {
                log::error!("Arrival::attach_to({}) -> wrong class type", parent.class_name());
                false
            }
        }
    }

    fn detach_from(this: &Arc<RwLock<Self>>, parent: &ObjectRef) -> bool {
        let Some(origin) = parent.downcast::<Origin>() else {
            log::error!("Arrival::detach_from({}) -> wrong class type", parent.class_name());
            return false;
        };
        let (linked, index) = {
            let guard = this.read();
            (guard.core.parent_key() == Some(parent.key()), guard.index.clone())
        };
        let mut origin = origin.write();
        if linked {
            origin.remove_arrival(this)
        } else {
            origin.remove_arrival_by_index(&index)
        }
    }
}
