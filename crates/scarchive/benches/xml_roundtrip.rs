// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML Archive Benchmark
//!
//! Measures serialization throughput of an event parameter catalog:
//! - writing a catalog into an in-memory document
//! - parsing and rebuilding the object graph
//! - the same with gzip compression

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_wrap)]

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parking_lot::RwLock;
use scarchive::datamodel::{
    Arrival, Comment, EventParameters, Origin, Pick, RealQuantity, TimeQuantity,
};
use scarchive::object::{ObjectRef, ObjectRegistry};
use scarchive::xml::{Compression, XmlArchive, XmlArchiveConfig};
use std::sync::Arc;

fn catalog(picks: usize) -> (Arc<ObjectRegistry>, Arc<RwLock<EventParameters>>) {
    let registry = ObjectRegistry::new();
    let ep = EventParameters::create_with_id(&registry, "EP").expect("ep");
    let origin = Origin::create_with_id(&registry, "Origin/bench").expect("origin");
    {
        let mut o = origin.write();
        o.set_latitude(RealQuantity::new(38.3));
        o.set_longitude(RealQuantity::new(142.4));
    }
    for i in 0..picks {
        let id = format!("Pick/{}", i);
        let pick = Pick::create_with_id(&registry, &id).expect("pick");
        {
            let mut p = pick.write();
            let time = Utc.timestamp_opt(1_300_000_000 + i as i64, 0).unwrap();
            p.set_time(TimeQuantity::new(time).with_uncertainty(0.05));
            p.set_phase_hint(Some("P".to_string()));
            p.add_comment(Comment::with_id(&registry, "snr", "12.5"));
        }
        ep.write().add_pick(pick);
        origin.write().add_arrival(Arrival::with_pick(&registry, &id, "P"));
    }
    ep.write().add_origin(origin);
    (registry, ep)
}

fn write(
    config: &XmlArchiveConfig,
    registry: &Arc<ObjectRegistry>,
    ep: &Arc<RwLock<EventParameters>>,
) -> Vec<u8> {
    let mut ar = XmlArchive::with_registry(config.clone(), registry.clone());
    ar.create_bytes();
    ar.write_object(&ObjectRef::new(ep.clone()));
    ar.close_to_bytes().expect("close")
}

fn read(config: &XmlArchiveConfig, bytes: &[u8]) -> Arc<RwLock<EventParameters>> {
    let mut ar = XmlArchive::with_registry(config.clone(), ObjectRegistry::new());
    ar.open_bytes(bytes).expect("open");
    ar.read_object::<EventParameters>().expect("ep")
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("xml_write");
    let config = XmlArchiveConfig::default();
    for picks in [10usize, 100, 1000] {
        let (registry, ep) = catalog(picks);
        group.throughput(Throughput::Elements(picks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(picks), &picks, |b, _| {
            b.iter(|| black_box(write(&config, &registry, &ep)));
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("xml_read");
    let config = XmlArchiveConfig::default();
    for picks in [10usize, 100, 1000] {
        let (registry, ep) = catalog(picks);
        let bytes = write(&config, &registry, &ep);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(picks), &bytes, |b, bytes| {
            b.iter(|| black_box(read(&config, bytes)));
        });
    }
    group.finish();
}

fn bench_gzip_round_trip(c: &mut Criterion) {
    let config = XmlArchiveConfig::default().with_compression(Compression::Gzip);
    let (registry, ep) = catalog(100);
    c.bench_function("xml_gzip_round_trip_100", |b| {
        b.iter(|| {
            let bytes = write(&config, &registry, &ep);
            black_box(read(&config, &bytes))
        });
    });
}

criterion_group!(benches, bench_write, bench_read, bench_gzip_round_trip);
criterion_main!(benches);
