// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # bitwire - compact, versioned, schema-less binary serialization
//!
//! Converts typed object graphs to and from a compact binary representation
//! without an external schema: types declare save rules in a runtime
//! registry, and a map generator builds a reusable conversion plan per
//! type-shape on first use.
//!
//! ## Quick Start
//!
//! ```rust
//! use bitwire::{Bitwire, ObjectBuilder, Settings, TypeId, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::new();
//! let point = registry
//!     .define(
//!         ObjectBuilder::new("Point")
//!             .member("x", TypeId::I32)
//!             .member("y", TypeId::I32),
//!     )
//!     .unwrap();
//!
//! let wire = Bitwire::new(Settings::default(), registry).unwrap();
//! let value = Value::object(
//!     wire.registry(),
//!     point,
//!     &[("x", Value::I32(3)), ("y", Value::I32(-4))],
//! )
//! .unwrap();
//!
//! let bytes = wire.to_bytes(&value, point).unwrap();
//! assert_eq!(wire.from_bytes(&bytes, point).unwrap(), value);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                    Bitwire facade                            |
//! |        to_bytes / from_bytes, pooled sessions                |
//! +--------------------------------------------------------------+
//! |  Serializer / Deserializer drivers (per-item protocol)       |
//! +--------------------------------------------------------------+
//! |  Map Generator | Version Cache | Inheritance Resolver        |
//! |        (concurrent, lazily materialized plans)               |
//! +--------------------------------------------------------------+
//! |  Converter Registry (exact table + ordered predicates)       |
//! +--------------------------------------------------------------+
//! |  Varint Codec (Precise / Fast)  over  Bit Channel (MSB-first)|
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bitwire`] | Entry point; owns the registry, generator and pools |
//! | [`TypeRegistry`] | Declares types, members, versions and sub-types |
//! | [`Value`] | Dynamic object graph handed to/from the sessions |
//! | [`Settings`] | Immutable wire configuration (varint mode, text, ...) |
//! | [`Converter`] | Extension point for custom type families |
//!
//! ## Modules Overview
//!
//! - [`wire`] - bit channel and varint codecs (the wire contract)
//! - [`types`] - type registry, value model, member provider seam
//! - [`convert`] - converter contract, version cache, inheritance
//! - [`map`] - concurrent map generation
//! - [`session`] - pooled serializer/deserializer drivers

/// Stream configuration (varint strategy, text encoding, endianness).
pub mod config;
/// Converter contract, version shapes, dispatch and inheritance plans.
pub mod convert;
/// Error taxonomy.
pub mod error;
/// Concurrent, recursion-safe map generation.
pub mod map;
/// Pooled serializer/deserializer sessions.
pub mod session;
/// Host type system: registry, definitions, dynamic values.
pub mod types;
/// Bit channel and varint codecs.
pub mod wire;

pub use config::{Endianness, Settings, SettingsBuilder, TextEncoding};
pub use convert::{Converter, GenContext, MapItemInfo, VersionInfo};
pub use error::{Error, Result};
pub use map::MapGenerator;
pub use session::{Decoder, Encoder};
pub use types::{
    InheritMode, ObjectBuilder, ObjectValue, TypeId, TypeKind, TypeRegistry, Value,
};
pub use wire::varint::VarintMode;

use session::SessionPool;
use std::sync::Arc;
use types::{MemberProvider, RegistryProvider};

/// bitwire version string.
pub const VERSION: &str = "0.4.2";

/// Entry point: one immutable configuration, one type registry, and the
/// lazily built conversion plans shared by every session.
pub struct Bitwire {
    settings: Arc<Settings>,
    registry: Arc<TypeRegistry>,
    generator: Arc<MapGenerator>,
    pool: SessionPool,
}

impl Bitwire {
    /// Build with the default registry-backed member provider. Converter
    /// registration contracts are checked here, fatally.
    pub fn new(settings: Settings, registry: TypeRegistry) -> Result<Self> {
        Self::with_provider(settings, registry, Arc::new(RegistryProvider))
    }

    /// Build with a custom member-discovery provider.
    pub fn with_provider(
        settings: Settings,
        registry: TypeRegistry,
        provider: Arc<dyn MemberProvider>,
    ) -> Result<Self> {
        let settings = Arc::new(settings);
        let registry = Arc::new(registry);
        let generator = Arc::new(MapGenerator::new(
            settings.clone(),
            registry.clone(),
            provider,
        )?);
        let pool = SessionPool::new(settings.pool_capacity());
        Ok(Self {
            settings,
            registry,
            generator,
            pool,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &Arc<MapGenerator> {
        &self.generator
    }

    /// Resolve (building on first use) the conversion plan for a type.
    pub fn get_map(&self, ty: TypeId) -> Result<MapItemInfo> {
        self.generator.get_map(ty)
    }

    /// Serialize `value` as a `ty` root into a fresh byte vector.
    pub fn to_bytes(&self, value: &Value, ty: TypeId) -> Result<Vec<u8>> {
        let scratch = self.pool.check_out();
        let mut encoder = Encoder::new(&self.generator, scratch);
        let result = encoder.encode_root(value, ty);
        let (bytes, scratch) = encoder.finish_stream();
        self.pool.check_in(scratch);
        result.map(|()| bytes)
    }

    /// Deserialize a `ty` root from `bytes`. Trailing padding after the
    /// root item is ignored.
    pub fn from_bytes(&self, bytes: &[u8], ty: TypeId) -> Result<Value> {
        let scratch = self.pool.check_out();
        let mut decoder = Decoder::new(&self.generator, bytes, scratch);
        let result = decoder.decode_root(ty);
        self.pool.check_in(decoder.into_scratch());
        result
    }
}
