// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serializer session.
//!
//! Per-item protocol: presence bit (nullable) -> same-type bit
//! (polymorphic) -> inheritance payload (different) -> compressed version
//! number (first use of a converter this session) -> version-specific
//! payload. All header bits share the bit channel; the driver finishes the
//! header before byte-first payloads.

use super::pool::SessionScratch;
use crate::config::{Settings, TextEncoding};
use crate::convert::{ConverterSlot, InheritancePlan, MapItemInfo, VersionInfo};
use crate::error::{Error, Result};
use crate::map::MapGenerator;
use crate::types::{TypeId, TypeRegistry, Value};
use crate::wire::{varint, BitWriter};
use std::collections::HashMap;
use std::sync::Arc;

/// Single-session serializer bound to one output buffer.
pub struct Encoder<'a> {
    gen: &'a MapGenerator,
    bits: BitWriter,
    seen: HashMap<usize, Arc<VersionInfo>>,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(gen: &'a MapGenerator, scratch: SessionScratch) -> Self {
        Self {
            gen,
            bits: BitWriter::new(),
            seen: scratch.seen,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.gen.settings()
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.gen.registry()
    }

    // ------------------------------------------------------------------
    // Channel access for converters
    // ------------------------------------------------------------------

    pub fn write_bit(&mut self, bit: bool) {
        self.bits.write_bit(bit);
    }

    pub fn write_bits(&mut self, value: u64, count: u32) {
        self.bits.write_bits(value, count);
    }

    /// Finish the open header (if any) so byte-level I/O may resume.
    pub fn align(&mut self) {
        self.bits.finish();
    }

    /// Byte payload; the header must be finished first.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.bits.write_bytes(data);
    }

    pub fn write_u32_varint(&mut self, value: u32) {
        let mode = self.gen.settings().varint();
        varint::write_u32(&mut self.bits, mode, value);
    }

    pub fn write_u64_varint(&mut self, value: u64) {
        let mode = self.gen.settings().varint();
        varint::write_u64(&mut self.bits, mode, value);
    }

    pub fn write_i32_varint(&mut self, value: i32) {
        let mode = self.gen.settings().varint();
        varint::write_i32(&mut self.bits, mode, value);
    }

    pub fn write_i64_varint(&mut self, value: i64) {
        let mode = self.gen.settings().varint();
        varint::write_i64(&mut self.bits, mode, value);
    }

    /// Length-prefixed string in the configured text encoding. Also used
    /// for Key-mode sub-type identities.
    pub fn write_str(&mut self, s: &str) {
        match self.gen.settings().text() {
            TextEncoding::Utf8 => {
                let bytes = s.as_bytes();
                self.write_u32_varint(bytes.len() as u32);
                self.align();
                self.write_bytes(bytes);
            }
            TextEncoding::Utf16 => {
                let endianness = self.gen.settings().endianness();
                let units: Vec<u16> = s.encode_utf16().collect();
                self.write_u32_varint(units.len() as u32);
                self.align();
                for unit in units {
                    let bytes = endianness.bytes_u16(unit);
                    self.write_bytes(&bytes);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Item protocol
    // ------------------------------------------------------------------

    /// Serialize the stream root: optional settings-header bit, then the
    /// root item.
    pub(crate) fn encode_root(&mut self, value: &Value, ty: TypeId) -> Result<()> {
        let _pass = self.gen.begin_pass();
        if self.settings().emit_version_header() {
            let versioned = self.settings().versioning();
            self.bits.write_bit(versioned);
        }
        let item = self.gen.get_map(ty)?;
        self.write_item(value, &item)
    }

    /// Serialize one slot according to its item plan.
    pub fn write_item(&mut self, value: &Value, item: &MapItemInfo) -> Result<()> {
        if item.nullable {
            if value.is_null() {
                self.bits.write_bit(false);
                return Ok(());
            }
            self.bits.write_bit(true);
        } else if value.is_null() {
            return Err(Error::TypeMismatch {
                expected: item.slot.def().name.to_string(),
                found: "null".to_string(),
            });
        }

        if let Some(plan) = item.slot.inheritance_plan() {
            let obj = value.as_object().ok_or_else(|| Error::TypeMismatch {
                expected: item.slot.def().name.to_string(),
                found: value.kind_name().to_string(),
            })?;
            let same = obj.ty == item.slot.def().id;
            self.bits.write_bit(same);
            if !same {
                let plan = plan.clone();
                self.write_subtype(&plan, obj.ty)?;
                // Recurse into the actual sub-type's own item protocol.
                let sub = self.gen.get_map(obj.ty)?;
                return self.write_value(value, &sub.slot);
            }
        }
        self.write_value(value, &item.slot)
    }

    fn write_value(&mut self, value: &Value, slot: &Arc<ConverterSlot>) -> Result<()> {
        let shape = self.version_for(slot)?;
        if !shape.uses_header_bit() {
            self.align();
        }
        slot.imp().write(value, &shape, self)
    }

    /// Emit the compressed version number on the first use of a converter
    /// in this session and cache the resolved shape for the rest of it.
    fn version_for(&mut self, slot: &Arc<ConverterSlot>) -> Result<Arc<VersionInfo>> {
        let key = Arc::as_ptr(slot) as usize;
        if let Some(shape) = self.seen.get(&key) {
            return Ok(shape.clone());
        }
        let version = self.gen.write_version_of(slot);
        if self.settings().versioning() {
            self.write_u32_varint(u32::from(version));
        }
        let shape = slot.version_info(version, self.gen)?;
        self.seen.insert(key, shape.clone());
        Ok(shape)
    }

    fn write_subtype(&mut self, plan: &InheritancePlan, actual: TypeId) -> Result<()> {
        use crate::types::InheritMode;
        match plan.mode() {
            InheritMode::Index => match plan.ordinal_of(actual) {
                Some(ordinal) => {
                    self.write_u32_varint(ordinal);
                    Ok(())
                }
                None => Err(self.unsupported(plan, actual)),
            },
            InheritMode::Key => {
                let key = plan.key_for(self.gen.registry(), actual)?;
                self.write_str(&key);
                Ok(())
            }
            InheritMode::IndexOrKey => match plan.ordinal_of(actual) {
                Some(ordinal) => {
                    self.bits.write_bit(true);
                    self.write_u32_varint(ordinal);
                    Ok(())
                }
                None => {
                    let key = plan.key_for(self.gen.registry(), actual)?;
                    self.bits.write_bit(false);
                    self.write_str(&key);
                    Ok(())
                }
            },
        }
    }

    fn unsupported(&self, plan: &InheritancePlan, actual: TypeId) -> Error {
        let actual_name = self
            .gen
            .registry()
            .get(actual)
            .map(|d| d.name.to_string())
            .unwrap_or_else(|_| format!("{}", actual));
        Error::UnsupportedSubType {
            base: plan.base_name().to_string(),
            actual: actual_name,
        }
    }

    /// Close the stream and hand back the bytes plus reusable scratch.
    pub(crate) fn finish_stream(self) -> (Vec<u8>, SessionScratch) {
        (self.bits.into_vec(), SessionScratch { seen: self.seen })
    }
}
