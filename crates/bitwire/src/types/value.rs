// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value model: the runtime object graphs that get serialized.

use super::{TypeDef, TypeId, TypeKind, TypeRegistry};
use crate::error::{Error, Result};

/// A dynamically typed value.
///
/// Object fields are stored positionally, parallel to the full declared
/// member list of the value's type (all versions), so accessors are plain
/// index loads.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Object(ObjectValue),
}

/// An object instance: actual runtime type plus positional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub ty: TypeId,
    pub fields: Vec<Value>,
}

impl ObjectValue {
    /// Look a field up by member name (slow path, for tests and callers
    /// that don't hold a map).
    pub fn field<'a>(&'a self, reg: &TypeRegistry, name: &str) -> Option<&'a Value> {
        let def = reg.get(self.ty).ok()?;
        let idx = def
            .object()?
            .members
            .iter()
            .position(|m| &*m.name == name)?;
        self.fields.get(idx)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short kind label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Build an object value for `ty`, filling named fields and defaulting
    /// the rest. Unknown member names are a mapping error.
    pub fn object(reg: &TypeRegistry, ty: TypeId, fields: &[(&str, Value)]) -> Result<Value> {
        let def = reg.get(ty)?;
        let obj = def
            .object()
            .ok_or_else(|| Error::TypeMismatch {
                expected: "object type".into(),
                found: def.name.to_string(),
            })?;
        let mut out = Vec::with_capacity(obj.members.len());
        for m in &obj.members {
            out.push(Self::default_for(reg, m.ty)?);
        }
        for (name, value) in fields {
            let idx = obj
                .members
                .iter()
                .position(|m| &*m.name == *name)
                .ok_or_else(|| Error::TypeMismatch {
                    expected: format!("member of {}", def.name),
                    found: (*name).to_string(),
                })?;
            out[idx] = value.clone();
        }
        Ok(Value::Object(ObjectValue { ty, fields: out }))
    }

    /// Neutral default for a declared type, used for members absent from
    /// an older wire version. Object-typed members default to `Null` (no
    /// recursive materialization; recursive type graphs would never
    /// terminate otherwise).
    pub fn default_for(reg: &TypeRegistry, ty: TypeId) -> Result<Value> {
        let def: &TypeDef = reg.get(ty)?;
        Ok(match &def.kind {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::U8 => Value::U8(0),
            TypeKind::U16 => Value::U16(0),
            TypeKind::U32 => Value::U32(0),
            TypeKind::U64 => Value::U64(0),
            TypeKind::I8 => Value::I8(0),
            TypeKind::I16 => Value::I16(0),
            TypeKind::I32 => Value::I32(0),
            TypeKind::I64 => Value::I64(0),
            TypeKind::F32 => Value::F32(0.0),
            TypeKind::F64 => Value::F64(0.0),
            TypeKind::Char => Value::Char('\0'),
            TypeKind::Str => Value::Str(String::new()),
            TypeKind::Bytes => Value::Bytes(Vec::new()),
            TypeKind::Option(_) => Value::Null,
            TypeKind::List(_) => Value::List(Vec::new()),
            TypeKind::Object(_) | TypeKind::Opaque => Value::Null,
        })
    }
}
