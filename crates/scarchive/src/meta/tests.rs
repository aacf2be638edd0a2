// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::datamodel::{Comment, CreationInfo, Pick, PickOnset, RealQuantity};
use crate::object::{Class, ObjectRef, ObjectRegistry};

#[test]
fn test_property_chain_reaches_base_class() {
    let meta = Pick::meta_object();
    assert_eq!(meta.rtti().class_name(), "Pick");
    assert_eq!(meta.base().map(|b| b.rtti().class_name()), Some("PublicObject"));

    let public_id = meta.property("publicID").expect("inherited");
    assert_eq!(public_id.type_name(), "string");
    assert!(meta.property("nonsense").is_none());

    let names: Vec<_> = meta.properties().iter().map(|p| p.name()).collect();
    assert_eq!(names.first(), Some(&"publicID"));
    assert_eq!(names.last(), Some(&"comment"));
    assert_eq!(meta.property_count(), names.len());
    assert_eq!(meta.property_at(0).map(MetaProperty::name), Some("publicID"));
    assert_eq!(meta.property_at(1).map(MetaProperty::name), Some("time"));
    assert!(meta.property_at(names.len()).is_none());
}

#[test]
fn test_flags_follow_declared_types() {
    let meta = Pick::meta_object();

    let time = meta.property("time").expect("time");
    assert!(time.is_class());
    assert!(!time.is_optional());

    let backazimuth = meta.property("backazimuth").expect("backazimuth");
    assert!(backazimuth.is_class());
    assert!(backazimuth.is_optional());

    let onset = meta.property("onset").expect("onset");
    assert!(onset.is_enum());
    assert!(onset.is_optional());
    assert_eq!(onset.type_name(), "PickOnset");
    assert_eq!(onset.enumerator().map(MetaEnum::key_count), Some(3));

    let comment = meta.property("comment").expect("comment");
    assert!(comment.is_array());
    assert_eq!(comment.type_name(), "Comment");

    let id = Comment::meta_object().property("id").expect("id");
    assert!(id.is_index());
}

#[test]
fn test_read_and_write_by_name() {
    let registry = ObjectRegistry::new();
    let pick = Pick::create_with_id(&registry, "Pick/meta").expect("pick");
    let meta = Pick::meta_object();
    let mut guard = pick.write();

    assert_eq!(meta.read(&*guard, "publicID").unwrap(), Value::from("Pick/meta".to_string()));
    assert_eq!(meta.read(&*guard, "phaseHint").unwrap(), Value::None);

    meta.write(&mut *guard, "phaseHint", Value::from("Pg".to_string())).unwrap();
    assert_eq!(guard.phase_hint(), Some("Pg"));

    meta.write(&mut *guard, "backazimuth", Value::from(RealQuantity::new(271.0))).unwrap();
    assert_eq!(guard.backazimuth().map(RealQuantity::value), Some(271.0));

    meta.write(&mut *guard, "creationInfo", Value::from(CreationInfo::new("GFZ", "bob")))
        .unwrap();
    assert!(guard.creation_info().is_some());

    assert_eq!(
        meta.write(&mut *guard, "missing", Value::None),
        Err(MetaError::PropertyNotFound("missing".to_string()))
    );
    assert!(matches!(
        meta.write(&mut *guard, "time", Value::None),
        Err(MetaError::InvalidOperation(_))
    ));
    assert!(matches!(
        meta.write(&mut *guard, "filterID", Value::from(3i32)),
        Err(MetaError::TypeMismatch { .. })
    ));
}

#[test]
fn test_text_forms() {
    let meta = RealQuantity::meta_object();
    let mut quantity = RealQuantity::new(1.5);

    let uncertainty = meta.property("uncertainty").expect("uncertainty");
    assert_eq!(uncertainty.read_string(&quantity).unwrap(), "");
    uncertainty.write_string(&mut quantity, "0.125").unwrap();
    assert_eq!(quantity.uncertainty(), Some(0.125));
    uncertainty.write_string(&mut quantity, "").unwrap();
    assert_eq!(quantity.uncertainty(), None);
    assert!(uncertainty.write_string(&mut quantity, "wide").is_err());

    let value = meta.property("value").expect("value");
    assert!(value.write_string(&mut quantity, "").is_err());
    assert_eq!(quantity.value(), 1.5);
}

#[test]
fn test_enumeration_text_by_key_name() {
    let registry = ObjectRegistry::new();
    let pick = Pick::create_with_id(&registry, "Pick/onset").expect("pick");
    let onset = Pick::meta_object().property("onset").expect("onset");
    let mut guard = pick.write();

    onset.write_string(&mut *guard, "impulsive").unwrap();
    assert_eq!(guard.onset(), Some(PickOnset::Impulsive));
    assert_eq!(onset.read_string(&*guard).unwrap(), "impulsive");
    assert_eq!(onset.read(&*guard).unwrap(), Value::Enum(1));

    assert!(onset.write_string(&mut *guard, "Impulsive").is_err());
    assert_eq!(guard.onset(), Some(PickOnset::Impulsive));

    onset.write(&mut *guard, Value::Int32(2)).unwrap();
    assert_eq!(guard.onset(), Some(PickOnset::Questionable));
    assert!(onset.write(&mut *guard, Value::Int32(9)).is_err());

    onset.write_string(&mut *guard, "").unwrap();
    assert_eq!(guard.onset(), None);
}

#[test]
fn test_array_operations() {
    let registry = ObjectRegistry::new();
    let pick = Pick::create_with_id(&registry, "Pick/array").expect("pick");
    let comments = Pick::meta_object().property("comment").expect("comment");
    let mut guard = pick.write();

    assert_eq!(comments.array_element_count(&*guard), Some(0));
    let first = Comment::with_id(&registry, "a", "first");
    assert!(comments.array_add_object(&mut *guard, Value::Object(ObjectRef::new(first))));
    let second = Comment::with_id(&registry, "b", "second");
    assert!(comments.array_add_object(&mut *guard, Value::Object(ObjectRef::new(second))));
    assert_eq!(comments.array_element_count(&*guard), Some(2));

    let duplicate = Comment::with_id(&registry, "a", "again");
    assert!(!comments.array_add_object(&mut *guard, Value::Object(ObjectRef::new(duplicate))));
    assert!(!comments.array_add_object(&mut *guard, Value::from(1.0f64)));

    let element = comments.array_object(&*guard, 1).expect("element");
    let element = element.as_object().and_then(ObjectRef::downcast::<Comment>).expect("comment");
    assert_eq!(element.read().text(), "second");
    assert!(comments.array_object(&*guard, 2).is_none());

    assert!(comments.array_remove_object(&mut *guard, 0));
    assert_eq!(comments.array_element_count(&*guard), Some(1));
    assert!(!comments.array_remove_object(&mut *guard, 5));

    let scalar = Pick::meta_object().property("filterID").expect("filterID");
    assert_eq!(scalar.array_element_count(&*guard), None);
    assert!(comments.read(&*guard).is_err());
}

#[test]
fn test_wrong_receiver_is_a_type_mismatch() {
    let quantity = RealQuantity::new(2.0);
    let onset = Pick::meta_object().property("onset").expect("onset");
    assert!(matches!(onset.read(&quantity), Err(MetaError::TypeMismatch { .. })));
}
