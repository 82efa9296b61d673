// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream configuration.
//!
//! `Settings` fix every wire-shape decision up front -- varint strategy,
//! text encoding, endianness, versioning -- and are immutable once built.
//! Decode behavior is entirely settings-driven: both sides of a stream must
//! be constructed from equal settings.

use crate::convert::Converter;
use crate::types::TypeId;
use crate::wire::varint::VarintMode;
use std::collections::HashMap;
use std::sync::Arc;

/// Byte order for fixed-width numeric payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn bytes_u16(self, v: u16) -> [u8; 2] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    pub fn bytes_u32(self, v: u32) -> [u8; 4] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    pub fn bytes_u64(self, v: u64) -> [u8; 8] {
        match self {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }

    pub fn u16_from(self, b: [u8; 2]) -> u16 {
        match self {
            Endianness::Little => u16::from_le_bytes(b),
            Endianness::Big => u16::from_be_bytes(b),
        }
    }

    pub fn u32_from(self, b: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(b),
            Endianness::Big => u32::from_be_bytes(b),
        }
    }

    pub fn u64_from(self, b: [u8; 8]) -> u64 {
        match self {
            Endianness::Little => u64::from_le_bytes(b),
            Endianness::Big => u64::from_be_bytes(b),
        }
    }
}

/// String payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Compressed byte-length prefix followed by UTF-8 bytes.
    Utf8,
    /// Compressed code-unit count followed by raw UTF-16 code units in the
    /// configured endianness.
    Utf16,
}

/// Immutable stream configuration. Build with [`SettingsBuilder`].
pub struct Settings {
    varint: VarintMode,
    text: TextEncoding,
    endianness: Endianness,
    versioning: bool,
    emit_version_header: bool,
    target_versions: HashMap<TypeId, u16>,
    extensions: Vec<Arc<dyn Converter>>,
    pool_capacity: usize,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn varint(&self) -> VarintMode {
        self.varint
    }

    pub fn text(&self) -> TextEncoding {
        self.text
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Whether compressed version numbers are emitted per converter.
    pub fn versioning(&self) -> bool {
        self.versioning
    }

    /// Whether the stream leads with the "has versioning" header bit.
    pub fn emit_version_header(&self) -> bool {
        self.emit_version_header
    }

    /// Explicit target-version override for a type, if configured.
    pub fn target_version(&self, ty: TypeId) -> Option<u16> {
        self.target_versions.get(&ty).copied()
    }

    pub fn extensions(&self) -> &[Arc<dyn Converter>] {
        &self.extensions
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::builder().build()
    }
}

/// Builder for [`Settings`].
pub struct SettingsBuilder {
    varint: VarintMode,
    text: TextEncoding,
    endianness: Endianness,
    versioning: bool,
    emit_version_header: bool,
    target_versions: HashMap<TypeId, u16>,
    extensions: Vec<Arc<dyn Converter>>,
    pool_capacity: usize,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            varint: VarintMode::Precise,
            text: TextEncoding::Utf8,
            endianness: Endianness::Little,
            versioning: true,
            emit_version_header: true,
            target_versions: HashMap::new(),
            extensions: Vec::new(),
            pool_capacity: 8,
        }
    }
}

impl SettingsBuilder {
    pub fn varint(mut self, mode: VarintMode) -> Self {
        self.varint = mode;
        self
    }

    pub fn text(mut self, text: TextEncoding) -> Self {
        self.text = text;
        self
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn versioning(mut self, on: bool) -> Self {
        self.versioning = on;
        self
    }

    pub fn emit_version_header(mut self, on: bool) -> Self {
        self.emit_version_header = on;
        self
    }

    /// Force serialization of `ty` at `version` instead of its latest.
    pub fn target_version(mut self, ty: TypeId, version: u16) -> Self {
        self.target_versions.insert(ty, version);
        self
    }

    /// Append an extension converter. Extensions are tried after built-ins
    /// in predicate order; an exact-type claim overrides the built-in entry.
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.extensions.push(converter);
        self
    }

    /// Bound on pooled serializer/deserializer sessions.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Settings {
        Settings {
            varint: self.varint,
            text: self.text,
            endianness: self.endianness,
            versioning: self.versioning,
            emit_version_header: self.emit_version_header,
            target_versions: self.target_versions,
            extensions: self.extensions,
            pool_capacity: self.pool_capacity,
        }
    }
}
