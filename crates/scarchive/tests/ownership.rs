// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability
#![allow(clippy::float_cmp)] // Test assertions with constants

//! Ownership and change notification across the public API.
//!
//! Covers the parent/child contract of the data model:
//! - a child has at most one parent and a unique index within it
//! - every successful add or remove produces exactly one notifier
//! - a dropped parent leaves no dangling back-reference

use scarchive::datamodel::{Arrival, Comment, EventParameters, Origin, Pick};
use scarchive::object::{Object, ObjectRef, ObjectRegistry, Operation};

#[test]
fn duplicate_comment_is_refused_without_notification() {
    let registry = ObjectRegistry::new();
    registry.notifiers().set_enabled(true);
    let pick = Pick::create_with_id(&registry, "Pick/dup").expect("pick");

    assert!(pick.write().add_comment(Comment::with_id(&registry, "x", "first")));
    let pending = registry.notifiers().take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation(), Operation::Add);
    assert_eq!(pending[0].parent_id(), "Pick/dup");

    assert!(!pick.write().add_comment(Comment::with_id(&registry, "x", "second")));
    assert!(registry.notifiers().is_empty());
    assert_eq!(pick.read().comment_count(), 1);
    assert_eq!(pick.read().comment(0).expect("comment").read().text(), "first");
}

#[test]
fn notifications_are_off_by_default() {
    let registry = ObjectRegistry::new();
    let pick = Pick::create_with_id(&registry, "Pick/quiet").expect("pick");
    assert!(pick.write().add_comment(Comment::with_id(&registry, "x", "text")));
    assert!(registry.notifiers().is_empty());
}

#[test]
fn child_has_a_single_parent() {
    let registry = ObjectRegistry::new();
    let first = Origin::create_with_id(&registry, "Origin/a").expect("a");
    let second = Origin::create_with_id(&registry, "Origin/b").expect("b");
    let arrival = Arrival::with_pick(&registry, "Pick/1", "P");

    assert!(first.write().add_arrival(arrival.clone()));
    assert!(!second.write().add_arrival(arrival.clone()));
    assert_eq!(second.read().arrival_count(), 0);

    let parent = arrival.read().parent().expect("parent");
    assert!(parent.ptr_eq(&ObjectRef::new(first.clone())));

    let handle = ObjectRef::new(arrival.clone());
    assert!(handle.detach());
    assert!(arrival.read().parent().is_none());
    assert_eq!(first.read().arrival_count(), 0);

    assert!(handle.attach_to(&ObjectRef::new(second.clone())));
    assert_eq!(second.read().arrival_count(), 1);
}

#[test]
fn attach_to_wrong_parent_kind_fails() {
    let registry = ObjectRegistry::new();
    let ep = EventParameters::create_with_id(&registry, "EP").expect("ep");
    let comment = ObjectRef::new(Comment::with_id(&registry, "x", "text"));
    assert!(!comment.attach_to(&ObjectRef::new(ep)));
    assert!(comment.parent().is_none());
}

#[test]
fn dropped_parent_leaves_no_back_reference() {
    let registry = ObjectRegistry::new();
    let comment = Comment::with_id(&registry, "x", "survivor");
    {
        let pick = Pick::create_with_id(&registry, "Pick/gone").expect("pick");
        assert!(pick.write().add_comment(comment.clone()));
        assert!(comment.read().parent().is_some());
    }
    assert!(comment.read().parent().is_none());
    assert!(registry.find("Pick/gone").is_none());
}

#[test]
fn remove_emits_notifier_for_the_parent() {
    let registry = ObjectRegistry::new();
    let ep = EventParameters::create_with_id(&registry, "EP/1").expect("ep");
    let pick = Pick::create_with_id(&registry, "Pick/r").expect("pick");
    assert!(ep.write().add_pick(pick.clone()));

    registry.notifiers().set_enabled(true);
    assert!(ep.write().remove_pick(&pick));
    let pending = registry.notifiers().take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation(), Operation::Remove);
    assert_eq!(pending[0].parent_id(), "EP/1");
    assert!(pending[0].object().ptr_eq(&ObjectRef::new(pick.clone())));
    assert!(pick.read().parent().is_none());
    assert_eq!(ep.read().pick_count(), 0);
}

#[test]
fn public_ids_are_unique_per_registry() {
    let registry = ObjectRegistry::new();
    let pick = Pick::create_with_id(&registry, "Pick/same").expect("pick");
    assert!(Pick::create_with_id(&registry, "Pick/same").is_none());

    let other = ObjectRegistry::new();
    assert!(Pick::create_with_id(&other, "Pick/same").is_some());

    let found = Pick::find(&registry, "Pick/same").expect("found");
    assert!(std::sync::Arc::ptr_eq(&found, &pick));
    assert_eq!(pick.read().public_id(), Some("Pick/same"));
}
