// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in converters for primitives, strings, byte blobs and lists.
//!
//! Each one just implements the [`Converter`] contract; the interesting
//! decisions (varint mode, text encoding, endianness) live in settings and
//! are read back through the session.

use super::{Converter, GenContext, MemberPlan, VersionInfo};
use crate::error::{Error, Result};
use crate::session::{Decoder, Encoder};
use crate::types::{TypeDef, TypeId, TypeKind, Value};
use std::sync::Arc;

fn mismatch(def: &TypeDef, value: &Value) -> Error {
    Error::TypeMismatch {
        expected: def.name.to_string(),
        found: value.kind_name().to_string(),
    }
}

/// Fixed set of scalar kinds. Bools and varint-compressed integers start
/// with header bits; raw bytes and fixed-width floats start byte-aligned.
pub struct PrimitiveConverter;

impl PrimitiveConverter {
    fn uses_header_bit(kind: &TypeKind) -> bool {
        !matches!(
            kind,
            TypeKind::U8 | TypeKind::I8 | TypeKind::F32 | TypeKind::F64
        )
    }
}

impl Converter for PrimitiveConverter {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn exact_types(&self) -> Vec<TypeId> {
        vec![
            TypeId::BOOL,
            TypeId::U8,
            TypeId::U16,
            TypeId::U32,
            TypeId::U64,
            TypeId::I8,
            TypeId::I16,
            TypeId::I32,
            TypeId::I64,
            TypeId::F32,
            TypeId::F64,
            TypeId::CHAR,
        ]
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        _cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        Ok(VersionInfo::new(
            def.clone(),
            version,
            Vec::new(),
            Self::uses_header_bit(&def.kind),
        ))
    }

    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        let def = shape.def();
        match (&def.kind, value) {
            (TypeKind::Bool, Value::Bool(v)) => enc.write_bit(*v),
            (TypeKind::U8, Value::U8(v)) => enc.write_bytes(&[*v]),
            (TypeKind::I8, Value::I8(v)) => enc.write_bytes(&[*v as u8]),
            (TypeKind::U16, Value::U16(v)) => enc.write_u32_varint(u32::from(*v)),
            (TypeKind::U32, Value::U32(v)) => enc.write_u32_varint(*v),
            (TypeKind::U64, Value::U64(v)) => enc.write_u64_varint(*v),
            (TypeKind::I16, Value::I16(v)) => enc.write_i32_varint(i32::from(*v)),
            (TypeKind::I32, Value::I32(v)) => enc.write_i32_varint(*v),
            (TypeKind::I64, Value::I64(v)) => enc.write_i64_varint(*v),
            (TypeKind::F32, Value::F32(v)) => {
                let bytes = enc.settings().endianness().bytes_u32(v.to_bits());
                enc.write_bytes(&bytes);
            }
            (TypeKind::F64, Value::F64(v)) => {
                let bytes = enc.settings().endianness().bytes_u64(v.to_bits());
                enc.write_bytes(&bytes);
            }
            (TypeKind::Char, Value::Char(v)) => enc.write_u32_varint(*v as u32),
            _ => return Err(mismatch(def, value)),
        }
        Ok(())
    }

    fn read(&self, shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        let def = shape.def();
        Ok(match &def.kind {
            TypeKind::Bool => Value::Bool(dec.read_bit()?),
            TypeKind::U8 => Value::U8(dec.read_bytes(1)?[0]),
            TypeKind::I8 => Value::I8(dec.read_bytes(1)?[0] as i8),
            TypeKind::U16 => {
                let raw = dec.read_u32_varint()?;
                u16::try_from(raw).map(Value::U16).map_err(|_| {
                    Error::InvalidData {
                        offset: dec.offset(),
                        reason: format!("u16 out of range: {}", raw),
                    }
                })?
            }
            TypeKind::U32 => Value::U32(dec.read_u32_varint()?),
            TypeKind::U64 => Value::U64(dec.read_u64_varint()?),
            TypeKind::I16 => {
                let raw = dec.read_i32_varint()?;
                i16::try_from(raw).map(Value::I16).map_err(|_| {
                    Error::InvalidData {
                        offset: dec.offset(),
                        reason: format!("i16 out of range: {}", raw),
                    }
                })?
            }
            TypeKind::I32 => Value::I32(dec.read_i32_varint()?),
            TypeKind::I64 => Value::I64(dec.read_i64_varint()?),
            TypeKind::F32 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(dec.read_bytes(4)?);
                Value::F32(f32::from_bits(dec.settings().endianness().u32_from(b)))
            }
            TypeKind::F64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(dec.read_bytes(8)?);
                Value::F64(f64::from_bits(dec.settings().endianness().u64_from(b)))
            }
            TypeKind::Char => {
                let raw = dec.read_u32_varint()?;
                char::from_u32(raw).map(Value::Char).ok_or_else(|| {
                    Error::InvalidData {
                        offset: dec.offset(),
                        reason: format!("invalid char scalar: {:#x}", raw),
                    }
                })?
            }
            _ => {
                return Err(Error::TypeMismatch {
                    expected: "primitive type".into(),
                    found: def.name.to_string(),
                })
            }
        })
    }
}

/// Strings: compressed length prefix plus UTF-8 bytes or UTF-16 code units,
/// per settings.
pub struct StrConverter;

impl Converter for StrConverter {
    fn name(&self) -> &'static str {
        "str"
    }

    fn exact_types(&self) -> Vec<TypeId> {
        vec![TypeId::STR]
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        _cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        Ok(VersionInfo::new(def.clone(), version, Vec::new(), true))
    }

    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        match value {
            Value::Str(s) => {
                enc.write_str(s);
                Ok(())
            }
            _ => Err(mismatch(shape.def(), value)),
        }
    }

    fn read(&self, _shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        Ok(Value::Str(dec.read_str()?))
    }
}

/// Raw byte blobs: compressed length prefix plus the bytes.
pub struct BytesConverter;

impl Converter for BytesConverter {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn exact_types(&self) -> Vec<TypeId> {
        vec![TypeId::BYTES]
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        _cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        Ok(VersionInfo::new(def.clone(), version, Vec::new(), true))
    }

    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        match value {
            Value::Bytes(b) => {
                enc.write_u32_varint(b.len() as u32);
                enc.align();
                enc.write_bytes(b);
                Ok(())
            }
            _ => Err(mismatch(shape.def(), value)),
        }
    }

    fn read(&self, _shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        let len = dec.read_u32_varint()? as usize;
        dec.align();
        Ok(Value::Bytes(dec.read_bytes(len)?.to_vec()))
    }
}

/// Homogeneous lists: compressed element count, then each element through
/// its own item plan.
pub struct ListConverter;

impl Converter for ListConverter {
    fn name(&self) -> &'static str {
        "list"
    }

    fn has_predicate(&self) -> bool {
        true
    }

    fn matches(&self, def: &TypeDef) -> bool {
        matches!(def.kind, TypeKind::List(_))
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        let TypeKind::List(element) = &def.kind else {
            return Err(Error::TypeMismatch {
                expected: "list type".into(),
                found: def.name.to_string(),
            });
        };
        let item = cx.resolve(*element)?;
        let members = vec![MemberPlan {
            name: "element".into(),
            field: 0,
            item,
        }];
        Ok(VersionInfo::new(def.clone(), version, members, true))
    }

    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        let Value::List(items) = value else {
            return Err(mismatch(shape.def(), value));
        };
        let plan = &shape.members()[0];
        enc.write_u32_varint(items.len() as u32);
        for item in items {
            enc.write_item(item, &plan.item)?;
        }
        Ok(())
    }

    fn read(&self, shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        let plan = &shape.members()[0];
        let count = dec.read_u32_varint()? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(dec.read_item(&plan.item)?);
        }
        Ok(Value::List(items))
    }
}
