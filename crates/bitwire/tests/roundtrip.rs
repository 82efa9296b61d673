// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Round-trip coverage for the built-in converter families plus byte-exact
// golden vectors pinning the header-bit layout.

#![allow(clippy::float_cmp)]

use bitwire::{
    Bitwire, Endianness, ObjectBuilder, Settings, TextEncoding, TypeId, TypeRegistry, Value,
    VarintMode,
};

fn wire_with(settings: Settings) -> Bitwire {
    Bitwire::new(settings, TypeRegistry::new()).expect("bitwire")
}

fn roundtrip(wire: &Bitwire, value: &Value, ty: TypeId) -> Value {
    let bytes = wire.to_bytes(value, ty).expect("encode");
    wire.from_bytes(&bytes, ty).expect("decode")
}

#[test]
fn test_numeric_extremes_roundtrip_both_varint_modes() {
    for mode in [VarintMode::Precise, VarintMode::Fast] {
        let wire = wire_with(Settings::builder().varint(mode).build());
        let probes: Vec<(Value, TypeId)> = vec![
            (Value::Bool(false), TypeId::BOOL),
            (Value::Bool(true), TypeId::BOOL),
            (Value::U8(0), TypeId::U8),
            (Value::U8(u8::MAX), TypeId::U8),
            (Value::U16(0), TypeId::U16),
            (Value::U16(u16::MAX), TypeId::U16),
            (Value::U32(0), TypeId::U32),
            (Value::U32(u32::MAX), TypeId::U32),
            (Value::U64(0), TypeId::U64),
            (Value::U64(u64::MAX), TypeId::U64),
            (Value::I8(i8::MIN), TypeId::I8),
            (Value::I8(i8::MAX), TypeId::I8),
            (Value::I16(i16::MIN), TypeId::I16),
            (Value::I16(i16::MAX), TypeId::I16),
            (Value::I32(i32::MIN), TypeId::I32),
            (Value::I32(i32::MAX), TypeId::I32),
            (Value::I64(i64::MIN), TypeId::I64),
            (Value::I64(i64::MAX), TypeId::I64),
            (Value::F32(f32::MIN), TypeId::F32),
            (Value::F32(f32::MAX), TypeId::F32),
            (Value::F64(f64::MIN), TypeId::F64),
            (Value::F64(f64::MAX), TypeId::F64),
            (Value::Char('\0'), TypeId::CHAR),
            (Value::Char('\u{10FFFF}'), TypeId::CHAR),
        ];
        for (value, ty) in probes {
            assert_eq!(roundtrip(&wire, &value, ty), value, "mode {:?}", mode);
        }
    }
}

#[test]
fn test_golden_u32_default_settings() {
    let wire = wire_with(Settings::default());
    let bytes = wire.to_bytes(&Value::U32(1), TypeId::U32).expect("encode");
    // versioning header 1, version 0 (lone terminator bit), precise varint
    // prefix 10, payload 0000_0001 -> 1010_0000 0001_0000
    assert_eq!(bytes, vec![0xA0, 0x10]);
}

#[test]
fn test_golden_u32_fast_unversioned() {
    let wire = wire_with(
        Settings::builder()
            .varint(VarintMode::Fast)
            .versioning(false)
            .emit_version_header(false)
            .build(),
    );
    let bytes = wire.to_bytes(&Value::U32(1), TypeId::U32).expect("encode");
    // fast flag 1, single byte 0000_0001 -> 1000_0000 1000_0000
    assert_eq!(bytes, vec![0x80, 0x80]);
}

#[test]
fn test_golden_nullable_bool_packs_into_one_byte() {
    let mut registry = TypeRegistry::new();
    let opt_bool = registry.option_of(TypeId::BOOL);
    let wire = Bitwire::new(
        Settings::builder().emit_version_header(false).build(),
        registry,
    )
    .expect("bitwire");

    let bytes = wire
        .to_bytes(&Value::Bool(true), opt_bool)
        .expect("encode");
    // presence 1, version 0, payload bit 1 -> 1010_0000
    assert_eq!(bytes, vec![0xA0]);
    assert_eq!(
        wire.from_bytes(&bytes, opt_bool).expect("decode"),
        Value::Bool(true)
    );
}

#[test]
fn test_fixed_width_payload_honors_endianness() {
    let probe = Value::F64(f64::from_bits(0x0102_0304_0506_0708));
    for endianness in [Endianness::Little, Endianness::Big] {
        let wire = wire_with(
            Settings::builder()
                .endianness(endianness)
                .versioning(false)
                .emit_version_header(false)
                .build(),
        );
        let bytes = wire.to_bytes(&probe, TypeId::F64).expect("encode");
        // no header bits at all: payload is the raw fixed-width value
        match endianness {
            Endianness::Little => assert_eq!(bytes[0], 0x08),
            Endianness::Big => assert_eq!(bytes[0], 0x01),
        }
        assert_eq!(wire.from_bytes(&bytes, TypeId::F64).expect("decode"), probe);
    }
}

#[test]
fn test_strings_utf8_and_utf16() {
    for text in [TextEncoding::Utf8, TextEncoding::Utf16] {
        let wire = wire_with(Settings::builder().text(text).build());
        for s in ["", "plain ascii", "snowman \u{2603}", "crab \u{1F980}"] {
            let value = Value::Str(s.to_string());
            assert_eq!(roundtrip(&wire, &value, TypeId::STR), value, "{:?}", text);
        }
    }
}

#[test]
fn test_bytes_roundtrip() {
    let wire = wire_with(Settings::default());
    for blob in [vec![], vec![0u8], vec![0xFF; 300]] {
        let value = Value::Bytes(blob);
        assert_eq!(roundtrip(&wire, &value, TypeId::BYTES), value);
    }
}

#[test]
fn test_list_of_nullable_strings() {
    let mut registry = TypeRegistry::new();
    let opt_str = registry.option_of(TypeId::STR);
    let list = registry.list_of(opt_str);
    let wire = Bitwire::new(Settings::default(), registry).expect("bitwire");

    let value = Value::List(vec![
        Value::Str("first".into()),
        Value::Null,
        Value::Str("third".into()),
    ]);
    assert_eq!(roundtrip(&wire, &value, list), value);

    let empty = Value::List(Vec::new());
    assert_eq!(roundtrip(&wire, &empty, list), empty);
}

#[test]
fn test_nested_object_roundtrip() {
    let mut registry = TypeRegistry::new();
    let point = registry
        .define(
            ObjectBuilder::new("Point")
                .member("x", TypeId::I32)
                .member("y", TypeId::I32),
        )
        .expect("point");
    let opt_label = registry.option_of(TypeId::STR);
    let rect = registry
        .define(
            ObjectBuilder::new("Rect")
                .member("origin", point)
                .member("w", TypeId::U32)
                .member("h", TypeId::U32)
                .member("label", opt_label),
        )
        .expect("rect");
    let wire = Bitwire::new(Settings::default(), registry).expect("bitwire");

    let origin = Value::object(
        wire.registry(),
        point,
        &[("x", Value::I32(-10)), ("y", Value::I32(20))],
    )
    .expect("origin");
    let value = Value::object(
        wire.registry(),
        rect,
        &[
            ("origin", origin),
            ("w", Value::U32(640)),
            ("h", Value::U32(480)),
            ("label", Value::Str("viewport".into())),
        ],
    )
    .expect("rect value");

    assert_eq!(roundtrip(&wire, &value, rect), value);
}

#[test]
fn test_repeated_values_pay_version_cost_once_per_session() {
    let mut registry = TypeRegistry::new();
    let list = registry.list_of(TypeId::U64);
    let wire = Bitwire::new(Settings::default(), registry).expect("bitwire");

    let one = wire
        .to_bytes(&Value::List(vec![Value::U64(9)]), list)
        .expect("encode");
    let three = wire
        .to_bytes(
            &Value::List(vec![Value::U64(9), Value::U64(9), Value::U64(9)]),
            list,
        )
        .expect("encode");
    // Two extra elements cost strictly less than the first (which carries
    // the u64 converter's version number for the session).
    let first_cost = one.len();
    assert!(three.len() < first_cost * 3);
}

#[test]
fn test_sequential_sessions_are_deterministic() {
    let wire = wire_with(Settings::default());
    let value = Value::Str("same bytes every session".into());
    let a = wire.to_bytes(&value, TypeId::STR).expect("encode");
    let b = wire.to_bytes(&value, TypeId::STR).expect("encode");
    // Pooled scratch reuse must not leak session state into the stream.
    assert_eq!(a, b);
}
