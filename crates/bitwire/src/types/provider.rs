// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Member discovery seam.
//!
//! The core never inspects declared members directly; it asks a
//! [`MemberProvider`]. The default provider reads the registry's object
//! definitions, but a host may substitute its own source (codegen output,
//! derive-macro registration, ...) without touching the core.

use super::{InheritanceDef, TypeDef, TypeId};
use crate::error::{Error, Result};
use std::sync::Arc;

/// One discovered member: identity, accessor index and version range.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub name: Arc<str>,
    /// Positional accessor into `ObjectValue::fields`.
    pub field: usize,
    pub ty: TypeId,
    pub from_version: u16,
    pub to_version: u16,
}

impl MemberInfo {
    /// True when the member participates in `version`.
    pub fn applies_to(&self, version: u16) -> bool {
        self.from_version <= version && version < self.to_version
    }
}

/// Capability interface over a type's declared members.
pub trait MemberProvider: Send + Sync {
    /// Ordered member list for `def`, validated. Non-object types are
    /// inaccessible by definition.
    fn members(&self, def: &TypeDef) -> Result<Vec<MemberInfo>>;

    /// Inheritance declarations for `def`, if any.
    fn inheritance<'a>(&self, def: &'a TypeDef) -> Option<&'a InheritanceDef>;
}

/// Default provider backed by the registry's own declarations.
pub struct RegistryProvider;

impl MemberProvider for RegistryProvider {
    fn members(&self, def: &TypeDef) -> Result<Vec<MemberInfo>> {
        let obj = def
            .object()
            .ok_or_else(|| Error::InaccessibleType(def.name.to_string()))?;
        let mut out = Vec::with_capacity(obj.members.len());
        for (field, m) in obj.members.iter().enumerate() {
            if m.to_version <= m.from_version {
                return Err(Error::InvalidVersionRange {
                    type_name: def.name.to_string(),
                    member: m.name.to_string(),
                    from: m.from_version,
                    to: m.to_version,
                });
            }
            out.push(MemberInfo {
                name: m.name.clone(),
                field,
                ty: m.ty,
                from_version: m.from_version,
                to_version: m.to_version,
            });
        }
        Ok(out)
    }

    fn inheritance<'a>(&self, def: &'a TypeDef) -> Option<&'a InheritanceDef> {
        def.object().and_then(|o| o.inheritance.as_ref())
    }
}
