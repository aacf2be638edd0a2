// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability
#![allow(clippy::float_cmp)] // Test assertions with constants

//! Database round trips through the public API.
//!
//! Stores object graphs in SQLite, reads them back with a fresh registry
//! and compares the result.

use chrono::{TimeZone, Utc};
use scarchive::datamodel::{
    Arrival, Comment, CreationInfo, EvaluationMode, EventParameters, Origin, Pick, RealQuantity,
    TimeQuantity, ARRIVAL_TYPE, ORIGIN_TYPE, PICK_TYPE,
};
use scarchive::object::{BaseObject, ObjectRef, ObjectRegistry, Operation};
use scarchive_database::{
    DatabaseArchive, DatabaseConfig, DatabaseDriver, DatabaseObjectWriter, SqlValue, SqliteDriver,
};
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn origin_with_arrivals(registry: &Arc<ObjectRegistry>) -> Arc<parking_lot::RwLock<Origin>> {
    let origin = Origin::create_with_id(registry, "Origin/B").expect("origin");
    {
        let mut o = origin.write();
        let time = Utc.with_ymd_and_hms(2023, 11, 10, 8, 0, 1).unwrap()
            + chrono::Duration::microseconds(250_125);
        o.set_time(TimeQuantity::new(time));
        o.set_latitude(RealQuantity::new(-21.5).with_uncertainty(3.0));
        o.set_longitude(RealQuantity::new(-68.25));
        o.set_evaluation_mode(Some(EvaluationMode::Manual));
        o.set_creation_info(Some(
            CreationInfo::new("GFZ", "scolv")
                .with_creation_time(Utc.with_ymd_and_hms(2023, 11, 10, 8, 5, 0).unwrap()),
        ));
        for (pick, phase) in [("Pick/a", "P"), ("Pick/b", "S"), ("Pick/c", "PcP")] {
            assert!(o.add_arrival(Arrival::with_pick(registry, pick, phase)));
        }
    }
    origin
}

/// Second archive on the same database with its own registry.
fn reader(db: &DatabaseArchive) -> (Arc<ObjectRegistry>, DatabaseArchive) {
    let registry = ObjectRegistry::new();
    let driver = db.driver().expect("driver").clone();
    let archive = DatabaseArchive::new(driver)
        .expect("archive")
        .with_registry(registry.clone());
    (registry, archive)
}

#[test]
fn test_arrivals_stream_in_insertion_order() {
    init_logging();
    let registry = ObjectRegistry::new();
    let origin = origin_with_arrivals(&registry);
    let mut db = DatabaseArchive::open(&DatabaseConfig::default())
        .expect("open")
        .with_registry(registry.clone());

    let handle = ObjectRef::new(origin.clone());
    assert!(db.insert(&handle, ""));
    for i in 0..3 {
        let arrival = origin.read().arrival(i).expect("arrival");
        assert!(db.insert(&ObjectRef::new(arrival), ""));
    }

    let (_, reader) = reader(&db);
    let mut it = reader.get_objects("Origin/B", &ARRIVAL_TYPE, false);
    let parent_oid = db.cached_id(&handle);
    let mut picks = Vec::new();
    while let Some(arrival) = it.get_as::<Arrival>() {
        assert_eq!(it.parent_oid(), parent_oid);
        picks.push(arrival.read().pick_id().to_string());
        it.advance();
    }
    assert_eq!(picks, ["Pick/a", "Pick/b", "Pick/c"]);
    assert_eq!(it.fetched(), 3);
    assert_eq!(reader.get_object_count("Origin/B", &ARRIVAL_TYPE), 3);
}

#[test]
fn test_origin_reads_back_equal() {
    let registry = ObjectRegistry::new();
    let origin = origin_with_arrivals(&registry);
    let mut db = DatabaseArchive::open(&DatabaseConfig::default())
        .expect("open")
        .with_registry(registry.clone());
    assert!(DatabaseObjectWriter::new(&mut db).write(&ObjectRef::new(origin.clone()), ""));

    let (copies, reader) = reader(&db);
    let copy = reader.get::<Origin>("Origin/B").expect("stored origin");
    {
        let copy = copy.read();
        assert!(copy.equals(&*origin.read()));
        assert_eq!(copy.time().value().timestamp_subsec_micros(), 250_125);
        assert_eq!(copy.arrival_count(), 0, "children are separate rows");
    }
    assert!(copies.find("Origin/B").is_some());

    let parent = ObjectRef::new(copy.clone());
    for arrival in reader.get_objects_of(Some(&parent), &ARRIVAL_TYPE, false) {
        let arrival = arrival.downcast::<Arrival>().expect("arrival");
        assert!(copy.write().add_arrival(arrival));
    }
    assert_eq!(copy.read().arrival_count(), 3);
    assert_eq!(copy.read().arrival(2).expect("third").read().phase(), "PcP");
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.db");
    let config = DatabaseConfig::builder()
        .source(path.to_string_lossy())
        .page_size(2)
        .build();

    {
        let registry = ObjectRegistry::new();
        let ep = EventParameters::create_with_id(&registry, "EP").expect("ep");
        for i in 0..5 {
            let pick = Pick::create_with_id(&registry, &format!("Pick/{}", i)).expect("pick");
            let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, i).unwrap();
            pick.write().set_time(TimeQuantity::new(time));
            pick.write().add_comment(Comment::with_id(&registry, "q", "impulsive"));
            assert!(ep.write().add_pick(pick));
        }
        let mut db = DatabaseArchive::open(&config).expect("open").with_registry(registry);
        let mut writer = DatabaseObjectWriter::new(&mut db);
        assert!(writer.write(&ObjectRef::new(ep), ""));
        assert_eq!(writer.count(), 11);
    }

    let registry = ObjectRegistry::new();
    let db = DatabaseArchive::open(&config).expect("reopen").with_registry(registry);
    let seconds: Vec<u32> = db
        .get_objects("EP", &PICK_TYPE, false)
        .filter_map(|pick| pick.downcast::<Pick>())
        .map(|pick| chrono::Timelike::second(&pick.read().time().value()))
        .collect();
    assert_eq!(seconds, [0, 1, 2, 3, 4]);

    let pick = db.get_object(&PICK_TYPE, "Pick/3").expect("pick");
    assert_eq!(db.parent_public_id(&pick).as_deref(), Some("EP"));
}

#[test]
fn test_update_and_remove_through_writer() {
    let registry = ObjectRegistry::new();
    let origin = origin_with_arrivals(&registry);
    let handle = ObjectRef::new(origin.clone());
    let mut db = DatabaseArchive::open(&DatabaseConfig::default())
        .expect("open")
        .with_registry(registry.clone());
    let root = EventParameters::create_with_id(&registry, "EP").expect("ep");
    assert!(db.insert(&ObjectRef::new(root), ""));
    assert!(DatabaseObjectWriter::new(&mut db).write(&handle, "EP"));

    {
        let mut o = origin.write();
        o.set_depth(Some(RealQuantity::new(33.0)));
        let arrival = o.arrival(1).expect("arrival");
        arrival.write().set_weight(Some(0.25));
    }
    let mut writer = DatabaseObjectWriter::with_operation(&mut db, Operation::Update);
    assert!(writer.write(&handle, "EP"));
    assert_eq!(writer.count(), 4);

    let (_, reader) = reader(&db);
    let copy = reader.get::<Origin>("Origin/B").expect("origin");
    assert_eq!(copy.read().depth().map(RealQuantity::value), Some(33.0));
    let weights: Vec<Option<f64>> = reader
        .get_objects("Origin/B", &ARRIVAL_TYPE, false)
        .filter_map(|a| a.downcast::<Arrival>())
        .map(|a| a.read().weight())
        .collect();
    assert_eq!(weights, [None, Some(0.25), None]);

    let arrival = ObjectRef::new(origin.read().arrival(0).expect("arrival"));
    assert!(db.remove(&arrival, ""));
    assert_eq!(db.get_object_count("Origin/B", &ARRIVAL_TYPE), 2);

    let mut writer = DatabaseObjectWriter::with_operation(&mut db, Operation::Remove);
    assert!(!writer.write(&handle, ""), "first arrival is gone already");
    assert_eq!(writer.errors(), 1);
    assert!(db.get_object(&ORIGIN_TYPE, "Origin/B").is_none());
    assert_eq!(db.get_object_count("Origin/B", &ARRIVAL_TYPE), 0);
}

#[test]
fn test_column_prefix_and_custom_driver_queries() {
    let config = DatabaseConfig::builder().column_prefix("m_").build();
    let driver: Arc<dyn DatabaseDriver> = Arc::new(SqliteDriver::open(&config).expect("driver"));
    let registry = ObjectRegistry::new();
    let mut db = DatabaseArchive::new(driver.clone())
        .expect("archive")
        .with_registry(registry.clone());

    let origin = origin_with_arrivals(&registry);
    assert!(DatabaseObjectWriter::new(&mut db).write(&ObjectRef::new(origin), ""));

    let mut cursor = driver
        .query("SELECT \"m_phase\" FROM Arrival ORDER BY _oid", &[])
        .expect("phase column");
    let mut phases = Vec::new();
    while let Some(row) = cursor.fetch_row().expect("row") {
        phases.push(row.value(0).and_then(SqlValue::to_text).map(|t| t.into_owned()));
    }
    assert_eq!(phases.len(), 3);
    assert_eq!(phases[0].as_deref(), Some("P"));

    let (_, reader) = reader(&db);
    let copy = reader.get::<Origin>("Origin/B").expect("origin");
    assert_eq!(copy.read().latitude().uncertainty(), Some(3.0));
    assert_eq!(copy.read().creation_info().map(CreationInfo::agency_id), Some("GFZ"));
}

#[test]
fn test_custom_query_keeps_its_order() {
    let config = DatabaseConfig::builder().page_size(2).build();
    let registry = ObjectRegistry::new();
    let mut db = DatabaseArchive::open(&config)
        .expect("open")
        .with_registry(registry.clone());
    let ep = EventParameters::create_with_id(&registry, "EP").expect("ep");
    for (id, second) in [("Pick/early", 5), ("Pick/late", 50), ("Pick/middle", 20)] {
        let pick = Pick::create_with_id(&registry, id).expect("pick");
        let time = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, second).unwrap();
        pick.write().set_time(TimeQuantity::new(time));
        assert!(ep.write().add_pick(pick));
    }
    assert!(DatabaseObjectWriter::new(&mut db).write(&ObjectRef::new(ep), ""));

    let query = "SELECT PublicObject.publicID, Pick.* FROM PublicObject, Pick \
                 WHERE PublicObject._oid = Pick._oid ORDER BY Pick.time_value DESC";
    let ids: Vec<String> = db
        .get_object_iterator(query, &PICK_TYPE)
        .filter_map(|pick| pick.public_id())
        .collect();
    assert_eq!(ids, ["Pick/late", "Pick/middle", "Pick/early"]);

    let latest = db.query_object(&PICK_TYPE, query).expect("latest pick");
    assert_eq!(latest.public_id().as_deref(), Some("Pick/late"));

    let stored: Vec<String> = db
        .get_objects("EP", &PICK_TYPE, false)
        .filter_map(|pick| pick.public_id())
        .collect();
    assert_eq!(stored, ["Pick/early", "Pick/late", "Pick/middle"]);
}
