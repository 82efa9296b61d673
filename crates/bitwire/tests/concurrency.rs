// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Concurrent first-use: simultaneous map builds produce exactly one
// converter slot and exactly one generation, with every thread observing
// the same instance.

use bitwire::{
    Bitwire, Converter, GenContext, ObjectBuilder, Result, Settings, TypeId, TypeRegistry, Value,
    VersionInfo,
};
use bitwire::{Decoder, Encoder};
use bitwire::types::TypeDef;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// Extension converter whose generation hook counts invocations.
struct CountingConverter {
    target: TypeId,
    generations: Arc<AtomicUsize>,
}

impl Converter for CountingConverter {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn exact_types(&self) -> Vec<TypeId> {
        vec![self.target]
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        _cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        // The hot path under test: must run exactly once per version.
        self.generations.fetch_add(1, Ordering::SeqCst);
        Ok(VersionInfo::new(def.clone(), version, Vec::new(), true))
    }

    fn write(&self, _value: &Value, _shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        enc.write_bit(true);
        Ok(())
    }

    fn read(&self, shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        let _ = dec.read_bit()?;
        Ok(Value::Object(bitwire::ObjectValue {
            ty: shape.def().id,
            fields: Vec::new(),
        }))
    }
}

fn tracked_registry() -> (TypeRegistry, TypeId) {
    let mut reg = TypeRegistry::new();
    let tracked = reg
        .define(ObjectBuilder::new("Tracked").member("x", TypeId::U32))
        .expect("define");
    (reg, tracked)
}

#[test]
fn test_simultaneous_get_map_produces_one_converter() {
    const THREADS: usize = 8;
    let (reg, tracked) = tracked_registry();
    let generations = Arc::new(AtomicUsize::new(0));
    let wire = Arc::new(
        Bitwire::new(
            Settings::builder()
                .converter(Arc::new(CountingConverter {
                    target: tracked,
                    generations: generations.clone(),
                }))
                .build(),
            reg,
        )
        .expect("bitwire"),
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let wire = wire.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            wire.get_map(tracked).expect("map")
        }));
    }
    let items: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    // Exactly one generation ran, and everyone holds the same slot.
    assert_eq!(generations.load(Ordering::SeqCst), 1);
    for item in &items[1..] {
        assert!(Arc::ptr_eq(&item.slot, &items[0].slot));
    }
}

#[test]
fn test_concurrent_sessions_do_not_interfere() {
    const THREADS: usize = 6;
    let mut reg = TypeRegistry::new();
    let opt_str = reg.option_of(TypeId::STR);
    let record = reg
        .define(
            ObjectBuilder::new("Record")
                .member("seq", TypeId::U64)
                .member("note", opt_str),
        )
        .expect("define");
    let wire = Arc::new(Bitwire::new(Settings::default(), reg).expect("bitwire"));

    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let wire = wire.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..50u64 {
                let seq = (t as u64) << 32 | i;
                let note = if i % 3 == 0 {
                    Value::Null
                } else {
                    Value::Str(format!("note {}", seq))
                };
                let value = Value::object(
                    wire.registry(),
                    record,
                    &[("seq", Value::U64(seq)), ("note", note)],
                )
                .expect("value");
                let bytes = wire.to_bytes(&value, record).expect("encode");
                let decoded = wire.from_bytes(&bytes, record).expect("decode");
                assert_eq!(decoded, value);
            }
        }));
    }
    for h in handles {
        h.join().expect("thread");
    }
}

#[test]
fn test_concurrent_multi_version_resolution_publishes_once_per_version() {
    const THREADS: usize = 8;
    let mut reg = TypeRegistry::new();
    let multi = reg
        .define(
            ObjectBuilder::new("Multi")
                .member("a", TypeId::U32)
                .member_since("b", TypeId::U32, 1)
                .member_since("c", TypeId::U32, 2)
                .latest_version(2),
        )
        .expect("define");
    let wire = Arc::new(Bitwire::new(Settings::default(), reg).expect("bitwire"));
    let item = wire.get_map(multi).expect("map");

    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let wire = wire.clone();
        let slot = item.slot.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let version = (t % 3) as u16;
            slot.version_info(version, wire.generator())
                .expect("version info")
        }));
    }
    let shapes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    // All observers of one version share the single published shape.
    for (t, shape) in shapes.iter().enumerate() {
        assert_eq!(shape.version(), (t % 3) as u16);
        for (u, other) in shapes.iter().enumerate() {
            if t % 3 == u % 3 {
                assert!(Arc::ptr_eq(shape, other));
            }
        }
    }
}
