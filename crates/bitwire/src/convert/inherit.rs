// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sub-type identification for polymorphic slots.
//!
//! Index mode uses a closed ordinal table built eagerly from the declared
//! list; Key mode uses the sub-type's declared string key, with the reader
//! side building its key table lazily by scanning the whole registry on the
//! first unresolved lookup (the open, extensible set). There is no silent
//! fallback to base-type-only encoding.

use crate::error::{Error, Result};
use crate::types::{InheritMode, InheritanceDef, TypeDef, TypeId, TypeRegistry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-base sub-type tables. Built once per converter slot and shared by
/// every published `VersionInfo` of that slot.
pub struct InheritancePlan {
    base_id: TypeId,
    base_name: Arc<str>,
    mode: InheritMode,
    /// Wire ordinal -> sub-type; position mirrors the declared list.
    ordinals: Vec<TypeId>,
    ordinal_of: HashMap<TypeId, u32>,
    /// Lazy reader-side key table (None until the first unresolved key).
    keys: RwLock<Option<HashMap<Arc<str>, TypeId>>>,
}

impl InheritancePlan {
    pub(crate) fn build(
        def: &Arc<TypeDef>,
        decl: &InheritanceDef,
        registry: &TypeRegistry,
    ) -> Result<Arc<Self>> {
        let mut ordinals = Vec::with_capacity(decl.declared.len());
        let mut ordinal_of = HashMap::with_capacity(decl.declared.len());
        for (ordinal, &sub) in decl.declared.iter().enumerate() {
            let sub_def = registry.get(sub)?;
            if !sub_def.is_object() {
                return Err(Error::UnserializableType(format!(
                    "{} (declared sub-type of {})",
                    sub_def.name, def.name
                )));
            }
            ordinals.push(sub);
            // First declaration wins; the table stays injective.
            ordinal_of.entry(sub).or_insert(ordinal as u32);
        }
        Ok(Arc::new(Self {
            base_id: def.id,
            base_name: def.name.clone(),
            mode: decl.mode,
            ordinals,
            ordinal_of,
            keys: RwLock::new(None),
        }))
    }

    pub fn mode(&self) -> InheritMode {
        self.mode
    }

    pub fn base(&self) -> TypeId {
        self.base_id
    }

    pub fn base_name(&self) -> &Arc<str> {
        &self.base_name
    }

    /// Writer side, Index path: ordinal of a declared sub-type.
    pub fn ordinal_of(&self, ty: TypeId) -> Option<u32> {
        self.ordinal_of.get(&ty).copied()
    }

    /// Reader side, Index path: sub-type at a wire ordinal.
    pub fn type_at(&self, ordinal: u32) -> Result<TypeId> {
        self.ordinals
            .get(ordinal as usize)
            .copied()
            .ok_or_else(|| Error::UnknownSubTypeOrdinal {
                base: self.base_name.to_string(),
                ordinal,
            })
    }

    /// Writer side, Key path: the sub-type's own declared key.
    pub fn key_for(&self, registry: &TypeRegistry, actual: TypeId) -> Result<Arc<str>> {
        let def = registry.get(actual)?;
        if !registry.is_subtype_of(actual, self.base_id) {
            return Err(Error::UnsupportedSubType {
                base: self.base_name.to_string(),
                actual: def.name.to_string(),
            });
        }
        def.object()
            .and_then(|o| o.key.clone())
            .ok_or_else(|| Error::MissingSubTypeKey {
                base: self.base_name.to_string(),
                sub: def.name.to_string(),
            })
    }

    /// Reader side, Key path: resolve a wire key, scanning the registry
    /// once on the first key this plan has not seen.
    pub fn resolve_key(&self, registry: &TypeRegistry, key: &str) -> Result<TypeId> {
        if let Some(table) = self.keys.read().as_ref() {
            if let Some(&ty) = table.get(key) {
                return Ok(ty);
            }
            return Err(Error::UnknownSubTypeKey {
                base: self.base_name.to_string(),
                key: key.to_string(),
            });
        }
        let mut guard = self.keys.write();
        if guard.is_none() {
            *guard = Some(self.scan(registry));
        }
        // Registry scans can't run concurrently with this lookup thanks to
        // the write guard; re-probe under it.
        guard
            .as_ref()
            .and_then(|table| table.get(key).copied())
            .ok_or_else(|| Error::UnknownSubTypeKey {
                base: self.base_name.to_string(),
                key: key.to_string(),
            })
    }

    fn scan(&self, registry: &TypeRegistry) -> HashMap<Arc<str>, TypeId> {
        log::debug!(
            "[inherit] scanning {} registered types for keys under {}",
            registry.len(),
            self.base_name
        );
        let mut table = HashMap::new();
        for def in registry.iter() {
            if def.id == self.base_id || !registry.is_subtype_of(def.id, self.base_id) {
                continue;
            }
            let Some(key) = def.object().and_then(|o| o.key.clone()) else {
                continue;
            };
            if let Some(prev) = table.insert(key.clone(), def.id) {
                // Duplicate keys are undefined behavior; last registration
                // wins, loudly.
                log::warn!(
                    "[inherit] duplicate sub-type key {:?} under {}: {} replaces {}",
                    key,
                    self.base_name,
                    def.name,
                    prev
                );
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectBuilder;

    fn registry_with_shapes() -> (TypeRegistry, TypeId, TypeId, TypeId, TypeId) {
        let mut reg = TypeRegistry::new();
        let base = reg.reserve("Shape");
        let circle = reg
            .define(
                ObjectBuilder::new("Circle")
                    .base(base)
                    .key("circle")
                    .member("r", TypeId::F64),
            )
            .expect("circle");
        let square = reg
            .define(
                ObjectBuilder::new("Square")
                    .base(base)
                    .key("square")
                    .member("side", TypeId::F64),
            )
            .expect("square");
        let stray = reg
            .define(ObjectBuilder::new("Stray").member("x", TypeId::U8))
            .expect("stray");
        reg.define_as(
            base,
            ObjectBuilder::new("Shape")
                .member("id", TypeId::U32)
                .subtypes(InheritMode::Index, vec![circle, square]),
        )
        .expect("base");
        (reg, base, circle, square, stray)
    }

    fn plan_for(reg: &TypeRegistry, base: TypeId) -> Arc<InheritancePlan> {
        let def = reg.get(base).expect("base").clone();
        let decl = def
            .object()
            .and_then(|o| o.inheritance.clone())
            .expect("decl");
        InheritancePlan::build(&def, &decl, reg).expect("plan")
    }

    #[test]
    fn test_ordinal_table_is_injective_and_total() {
        let (reg, base, circle, square, stray) = registry_with_shapes();
        let plan = plan_for(&reg, base);
        assert_eq!(plan.ordinal_of(circle), Some(0));
        assert_eq!(plan.ordinal_of(square), Some(1));
        assert_eq!(plan.ordinal_of(stray), None);
        assert_eq!(plan.type_at(0).expect("circle"), circle);
        assert_eq!(plan.type_at(1).expect("square"), square);
        assert!(matches!(
            plan.type_at(7),
            Err(Error::UnknownSubTypeOrdinal { ordinal: 7, .. })
        ));
    }

    #[test]
    fn test_key_lookup_builds_table_lazily() {
        let (reg, base, circle, _square, _stray) = registry_with_shapes();
        let plan = plan_for(&reg, base);
        assert!(plan.keys.read().is_none());
        assert_eq!(plan.resolve_key(&reg, "circle").expect("hit"), circle);
        assert!(plan.keys.read().is_some());
        assert!(matches!(
            plan.resolve_key(&reg, "hexagon"),
            Err(Error::UnknownSubTypeKey { .. })
        ));
    }

    #[test]
    fn test_key_for_requires_declared_key_and_kinship() {
        let (reg, base, circle, _square, stray) = registry_with_shapes();
        let plan = plan_for(&reg, base);
        assert_eq!(&*plan.key_for(&reg, circle).expect("key"), "circle");
        assert!(matches!(
            plan.key_for(&reg, stray),
            Err(Error::UnsupportedSubType { .. })
        ));

        // A genuine sub-type without a key fails at the point of need.
        let mut reg = TypeRegistry::new();
        let base2 = reg.reserve("B");
        let keyless = reg
            .define(ObjectBuilder::new("Keyless").base(base2))
            .expect("keyless");
        reg.define_as(
            base2,
            ObjectBuilder::new("B").subtypes(InheritMode::Key, vec![]),
        )
        .expect("base2");
        let plan = plan_for(&reg, base2);
        assert!(matches!(
            plan.key_for(&reg, keyless),
            Err(Error::MissingSubTypeKey { .. })
        ));
    }

    #[test]
    fn test_non_object_declared_subtype_is_fatal() {
        let mut reg = TypeRegistry::new();
        let base = reg.reserve("Base");
        reg.define_as(
            base,
            ObjectBuilder::new("Base").subtypes(InheritMode::Index, vec![TypeId::U32]),
        )
        .expect("base");
        let def = reg.get(base).expect("base").clone();
        let decl = def
            .object()
            .and_then(|o| o.inheritance.clone())
            .expect("decl");
        assert!(matches!(
            InheritancePlan::build(&def, &decl, &reg),
            Err(Error::UnserializableType(_))
        ));
    }
}
