// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Embedded value types.
//!
//! Value types have no identity and no parent: they are owned in place by
//! the object that declares them and serialize through the generic
//! property walk.

use crate::archive::Hint;
use crate::meta::{MetaObject, MetaProperty, Time};
use crate::object::{Class, BASE_OBJECT_TYPE};
use crate::rtti::Rtti;
use std::sync::OnceLock;

pub static REAL_QUANTITY_TYPE: Rtti = Rtti::new("RealQuantity", Some(&BASE_OBJECT_TYPE));
pub static TIME_QUANTITY_TYPE: Rtti = Rtti::new("TimeQuantity", Some(&BASE_OBJECT_TYPE));
pub static CREATION_INFO_TYPE: Rtti = Rtti::new("CreationInfo", Some(&BASE_OBJECT_TYPE));

const ELEMENT: Hint = Hint::NONE.element();

/// Physical quantity with optional uncertainties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealQuantity {
    value: f64,
    uncertainty: Option<f64>,
    lower_uncertainty: Option<f64>,
    upper_uncertainty: Option<f64>,
    confidence_level: Option<f64>,
}

impl RealQuantity {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_uncertainty(mut self, uncertainty: f64) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty
    }

    pub fn set_uncertainty(&mut self, uncertainty: Option<f64>) {
        self.uncertainty = uncertainty;
    }

    pub fn lower_uncertainty(&self) -> Option<f64> {
        self.lower_uncertainty
    }

    pub fn set_lower_uncertainty(&mut self, value: Option<f64>) {
        self.lower_uncertainty = value;
    }

    pub fn upper_uncertainty(&self) -> Option<f64> {
        self.upper_uncertainty
    }

    pub fn set_upper_uncertainty(&mut self, value: Option<f64>) {
        self.upper_uncertainty = value;
    }

    pub fn confidence_level(&self) -> Option<f64> {
        self.confidence_level
    }

    pub fn set_confidence_level(&mut self, value: Option<f64>) {
        self.confidence_level = value;
    }
}

impl Class for RealQuantity {
    fn type_info() -> &'static Rtti {
        &REAL_QUANTITY_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&REAL_QUANTITY_TYPE, None)
                .with_property(
                    MetaProperty::simple::<Self, f64>(
                        "value",
                        "float",
                        |q| q.value,
                        |q, v| q.value = v,
                    )
                    .with_hint(ELEMENT.mandatory()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "uncertainty",
                        "float",
                        |q| q.uncertainty,
                        |q, v| q.uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "lowerUncertainty",
                        "float",
                        |q| q.lower_uncertainty,
                        |q, v| q.lower_uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "upperUncertainty",
                        "float",
                        |q| q.upper_uncertainty,
                        |q, v| q.upper_uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "confidenceLevel",
                        "float",
                        |q| q.confidence_level,
                        |q, v| q.confidence_level = v,
                    )
                    .with_hint(ELEMENT),
                )
        })
    }
}

value_class!(RealQuantity, REAL_QUANTITY_TYPE);

/// Point in time with optional uncertainties in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeQuantity {
    value: Time,
    uncertainty: Option<f64>,
    lower_uncertainty: Option<f64>,
    upper_uncertainty: Option<f64>,
    confidence_level: Option<f64>,
}

impl TimeQuantity {
    pub fn new(value: Time) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_uncertainty(mut self, uncertainty: f64) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn value(&self) -> Time {
        self.value
    }

    pub fn set_value(&mut self, value: Time) {
        self.value = value;
    }

    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty
    }

    pub fn set_uncertainty(&mut self, uncertainty: Option<f64>) {
        self.uncertainty = uncertainty;
    }

    pub fn lower_uncertainty(&self) -> Option<f64> {
        self.lower_uncertainty
    }

    pub fn upper_uncertainty(&self) -> Option<f64> {
        self.upper_uncertainty
    }

    pub fn confidence_level(&self) -> Option<f64> {
        self.confidence_level
    }
}

impl Class for TimeQuantity {
    fn type_info() -> &'static Rtti {
        &TIME_QUANTITY_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&TIME_QUANTITY_TYPE, None)
                .with_property(
                    MetaProperty::simple::<Self, Time>(
                        "value",
                        "datetime",
                        |q| q.value,
                        |q, v| q.value = v,
                    )
                    .with_hint(ELEMENT.mandatory().split_time()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "uncertainty",
                        "float",
                        |q| q.uncertainty,
                        |q, v| q.uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "lowerUncertainty",
                        "float",
                        |q| q.lower_uncertainty,
                        |q, v| q.lower_uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "upperUncertainty",
                        "float",
                        |q| q.upper_uncertainty,
                        |q, v| q.upper_uncertainty = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<f64>>(
                        "confidenceLevel",
                        "float",
                        |q| q.confidence_level,
                        |q, v| q.confidence_level = v,
                    )
                    .with_hint(ELEMENT),
                )
        })
    }
}

value_class!(TimeQuantity, TIME_QUANTITY_TYPE);

/// Provenance of an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationInfo {
    agency_id: String,
    agency_uri: String,
    author: String,
    author_uri: String,
    creation_time: Option<Time>,
    modification_time: Option<Time>,
    version: String,
}

impl CreationInfo {
    pub fn new(agency_id: &str, author: &str) -> Self {
        Self {
            agency_id: agency_id.to_string(),
            author: author.to_string(),
            ..Self::default()
        }
    }

    pub fn with_creation_time(mut self, time: Time) -> Self {
        self.creation_time = Some(time);
        self
    }

    pub fn agency_id(&self) -> &str {
        &self.agency_id
    }

    pub fn set_agency_id(&mut self, agency_id: &str) {
        self.agency_id = agency_id.to_string();
    }

    pub fn agency_uri(&self) -> &str {
        &self.agency_uri
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: &str) {
        self.author = author.to_string();
    }

    pub fn author_uri(&self) -> &str {
        &self.author_uri
    }

    pub fn creation_time(&self) -> Option<Time> {
        self.creation_time
    }

    pub fn set_creation_time(&mut self, time: Option<Time>) {
        self.creation_time = time;
    }

    pub fn modification_time(&self) -> Option<Time> {
        self.modification_time
    }

    pub fn set_modification_time(&mut self, time: Option<Time>) {
        self.modification_time = time;
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }
}

impl Class for CreationInfo {
    fn type_info() -> &'static Rtti {
        &CREATION_INFO_TYPE
    }

    fn meta_object() -> &'static MetaObject {
        static META: OnceLock<MetaObject> = OnceLock::new();
        META.get_or_init(|| {
            MetaObject::new(&CREATION_INFO_TYPE, None)
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "agencyID",
                        "string",
                        |c| c.agency_id.clone(),
                        |c, v| c.agency_id = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "agencyURI",
                        "string",
                        |c| c.agency_uri.clone(),
                        |c, v| c.agency_uri = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "author",
                        "string",
                        |c| c.author.clone(),
                        |c, v| c.author = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "authorURI",
                        "string",
                        |c| c.author_uri.clone(),
                        |c, v| c.author_uri = v,
                    )
                    .with_hint(ELEMENT),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<Time>>(
                        "creationTime",
                        "datetime",
                        |c| c.creation_time,
                        |c, v| c.creation_time = v,
                    )
                    .with_hint(ELEMENT.split_time()),
                )
                .with_property(
                    MetaProperty::simple::<Self, Option<Time>>(
                        "modificationTime",
                        "datetime",
                        |c| c.modification_time,
                        |c, v| c.modification_time = v,
                    )
                    .with_hint(ELEMENT.split_time()),
                )
                .with_property(
                    MetaProperty::simple::<Self, String>(
                        "version",
                        "string",
                        |c| c.version.clone(),
                        |c, v| c.version = v,
                    )
                    .with_hint(ELEMENT),
                )
        })
    }
}

value_class!(CreationInfo, CREATION_INFO_TYPE);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Value;
    use crate::object::BaseObject;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_property_access_by_name() {
        let meta = RealQuantity::meta_object();
        let mut quantity = RealQuantity::new(4.5);
        assert_eq!(meta.read(&quantity, "value").expect("value"), Value::Float64(4.5));
        assert_eq!(meta.read(&quantity, "uncertainty").expect("unc"), Value::None);

        meta.write(&mut quantity, "uncertainty", Value::Float64(0.5))
            .expect("write");
        assert_eq!(quantity.uncertainty(), Some(0.5));
        assert!(meta.write(&mut quantity, "value", Value::None).is_err());
        assert!(meta.write(&mut quantity, "nope", Value::Float64(1.0)).is_err());
    }

    #[test]
    fn test_value_class_equality_through_trait() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("time");
        let a = TimeQuantity::new(time).with_uncertainty(0.1);
        let b = a.clone();
        let c = TimeQuantity::new(time);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert!(!a.equals(&RealQuantity::new(0.0)));
        assert_eq!(a.class_name(), "TimeQuantity");
        assert!(a.rtti().is_type_of(&BASE_OBJECT_TYPE));
    }

    #[test]
    fn test_string_properties_are_not_optional() {
        let meta = CreationInfo::meta_object();
        let info = CreationInfo::new("GFZ", "tester");
        let author = meta.property("author").expect("author");
        assert!(!author.is_optional());
        assert_eq!(author.read_string(&info).expect("read"), "tester");
        let created = meta.property("creationTime").expect("creationTime");
        assert!(created.is_optional());
        assert!(created.hint().split_time);
        assert_eq!(created.read_string(&info).expect("read"), "");
    }
}
