// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deserializer session.
//!
//! Mirrors the writer's per-item protocol exactly; decode behavior is
//! settings-driven, never inferred from the bytes. Any integrity violation
//! (truncation, unknown version, unresolvable sub-type) aborts the whole
//! call with no partial result.

use super::pool::SessionScratch;
use crate::config::{Settings, TextEncoding};
use crate::convert::{ConverterSlot, InheritancePlan, MapItemInfo, VersionInfo};
use crate::error::{Error, Result};
use crate::map::MapGenerator;
use crate::types::{InheritMode, TypeId, TypeRegistry, Value};
use crate::wire::{varint, BitReader};
use std::collections::HashMap;
use std::sync::Arc;

/// Single-session deserializer bound to one input slice.
pub struct Decoder<'a> {
    gen: &'a MapGenerator,
    bits: BitReader<'a>,
    seen: HashMap<usize, Arc<VersionInfo>>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(gen: &'a MapGenerator, input: &'a [u8], scratch: SessionScratch) -> Self {
        Self {
            gen,
            bits: BitReader::new(input),
            seen: scratch.seen,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.gen.settings()
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.gen.registry()
    }

    /// Current byte offset, for error reporting.
    pub fn offset(&self) -> usize {
        self.bits.offset()
    }

    // ------------------------------------------------------------------
    // Channel access for converters
    // ------------------------------------------------------------------

    pub fn read_bit(&mut self) -> Result<bool> {
        self.bits.read_bit()
    }

    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        self.bits.read_bits(count)
    }

    /// Skip to the next byte boundary (mirror of the writer's header
    /// finish).
    pub fn align(&mut self) {
        self.bits.finish();
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.bits.read_bytes(len)
    }

    pub fn read_u32_varint(&mut self) -> Result<u32> {
        let mode = self.gen.settings().varint();
        varint::read_u32(&mut self.bits, mode)
    }

    pub fn read_u64_varint(&mut self) -> Result<u64> {
        let mode = self.gen.settings().varint();
        varint::read_u64(&mut self.bits, mode)
    }

    pub fn read_i32_varint(&mut self) -> Result<i32> {
        let mode = self.gen.settings().varint();
        varint::read_i32(&mut self.bits, mode)
    }

    pub fn read_i64_varint(&mut self) -> Result<i64> {
        let mode = self.gen.settings().varint();
        varint::read_i64(&mut self.bits, mode)
    }

    /// Length-prefixed string in the configured text encoding.
    pub fn read_str(&mut self) -> Result<String> {
        match self.gen.settings().text() {
            TextEncoding::Utf8 => {
                let len = self.read_u32_varint()? as usize;
                self.align();
                let offset = self.bits.offset();
                let bytes = self.bits.read_bytes(len)?;
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::InvalidData {
                    offset,
                    reason: format!("invalid UTF-8: {}", e),
                })
            }
            TextEncoding::Utf16 => {
                let endianness = self.gen.settings().endianness();
                let count = self.read_u32_varint()? as usize;
                self.align();
                let offset = self.bits.offset();
                let mut units = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let mut b = [0u8; 2];
                    b.copy_from_slice(self.bits.read_bytes(2)?);
                    units.push(endianness.u16_from(b));
                }
                String::from_utf16(&units).map_err(|_| Error::InvalidData {
                    offset,
                    reason: "invalid UTF-16".to_string(),
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Item protocol
    // ------------------------------------------------------------------

    /// Decode the stream root: optional settings-header bit, then the root
    /// item.
    pub(crate) fn decode_root(&mut self, ty: TypeId) -> Result<Value> {
        let _pass = self.gen.begin_pass();
        if self.settings().emit_version_header() {
            let stream_versioned = self.bits.read_bit()?;
            if stream_versioned != self.settings().versioning() {
                return Err(Error::VersioningMismatch { stream_versioned });
            }
        }
        let item = self.gen.get_map(ty)?;
        self.read_item(&item)
    }

    /// Decode one slot according to its item plan.
    pub fn read_item(&mut self, item: &MapItemInfo) -> Result<Value> {
        if item.nullable && !self.bits.read_bit()? {
            return Ok(Value::Null);
        }
        if let Some(plan) = item.slot.inheritance_plan() {
            let plan = plan.clone();
            if !self.bits.read_bit()? {
                let actual = self.read_subtype(&plan)?;
                let sub = self.gen.get_map(actual)?;
                return self.read_value(&sub.slot);
            }
        }
        self.read_value(&item.slot)
    }

    fn read_value(&mut self, slot: &Arc<ConverterSlot>) -> Result<Value> {
        let shape = self.version_for(slot)?;
        if !shape.uses_header_bit() {
            self.align();
        }
        slot.imp().read(&shape, self)
    }

    /// Read the compressed version number on the first use of a converter
    /// in this session and cache the resolved shape for the rest of it.
    fn version_for(&mut self, slot: &Arc<ConverterSlot>) -> Result<Arc<VersionInfo>> {
        let key = Arc::as_ptr(slot) as usize;
        if let Some(shape) = self.seen.get(&key) {
            return Ok(shape.clone());
        }
        let version = if self.settings().versioning() {
            let raw = self.read_u32_varint()?;
            u16::try_from(raw).map_err(|_| Error::InvalidData {
                offset: self.bits.offset(),
                reason: format!("version {} out of range", raw),
            })?
        } else {
            self.gen.write_version_of(slot)
        };
        let shape = slot.version_info(version, self.gen)?;
        self.seen.insert(key, shape.clone());
        Ok(shape)
    }

    fn read_subtype(&mut self, plan: &InheritancePlan) -> Result<TypeId> {
        match plan.mode() {
            InheritMode::Index => {
                let ordinal = self.read_u32_varint()?;
                plan.type_at(ordinal)
            }
            InheritMode::Key => {
                let key = self.read_str()?;
                plan.resolve_key(self.gen.registry(), &key)
            }
            InheritMode::IndexOrKey => {
                if self.bits.read_bit()? {
                    let ordinal = self.read_u32_varint()?;
                    plan.type_at(ordinal)
                } else {
                    let key = self.read_str()?;
                    plan.resolve_key(self.gen.registry(), &key)
                }
            }
        }
    }

    /// Hand the reusable scratch back for pooling.
    pub(crate) fn into_scratch(self) -> SessionScratch {
        SessionScratch { seen: self.seen }
    }
}
