// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object converter: the general struct-shaped family.
//!
//! Shapes are version-filtered member lists; payloads iterate the list,
//! invoking each accessor and recursing into its item plan. Members a wire
//! version omits are materialized from the shape's default template on read.

use super::{Converter, GenContext, MemberPlan, VersionInfo};
use crate::error::{Error, Result};
use crate::session::{Decoder, Encoder};
use crate::types::{ObjectValue, TypeDef, Value};
use std::sync::Arc;

pub struct ObjectConverter;

impl Converter for ObjectConverter {
    fn name(&self) -> &'static str {
        "object"
    }

    fn has_predicate(&self) -> bool {
        true
    }

    fn matches(&self, def: &TypeDef) -> bool {
        def.is_object()
    }

    fn highest_version(&self, def: &TypeDef) -> u16 {
        def.object().map_or(0, |o| o.latest_version)
    }

    fn generate(
        &self,
        def: &Arc<TypeDef>,
        version: u16,
        cx: &GenContext<'_>,
    ) -> Result<VersionInfo> {
        let raw = cx.members(def)?;
        let mut members = Vec::new();
        for info in raw.iter().filter(|m| m.applies_to(version)) {
            members.push(MemberPlan {
                name: info.name.clone(),
                field: info.field,
                item: cx.resolve(info.ty)?,
            });
        }
        Ok(VersionInfo::new(def.clone(), version, members, true))
    }

    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()> {
        let def = shape.def();
        let Value::Object(obj) = value else {
            return Err(Error::TypeMismatch {
                expected: def.name.to_string(),
                found: value.kind_name().to_string(),
            });
        };
        if obj.ty != def.id {
            let found = enc
                .registry()
                .get(obj.ty)
                .map(|d| d.name.to_string())
                .unwrap_or_else(|_| format!("{}", obj.ty));
            return Err(Error::TypeMismatch {
                expected: def.name.to_string(),
                found,
            });
        }
        for plan in shape.members() {
            let field = obj.fields.get(plan.field).ok_or_else(|| Error::TypeMismatch {
                expected: format!("{}.{}", def.name, plan.name),
                found: "missing field".to_string(),
            })?;
            enc.write_item(field, &plan.item)?;
        }
        Ok(())
    }

    fn read(&self, shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value> {
        let mut fields = shape.accessors(dec.registry()).template.clone();
        for plan in shape.members() {
            let value = dec.read_item(&plan.item)?;
            match fields.get_mut(plan.field) {
                Some(slot) => *slot = value,
                // Only reachable with a provider whose accessor indices
                // disagree with the declared member list.
                None => {
                    return Err(Error::TypeMismatch {
                        expected: format!("{}.{}", shape.def().name, plan.name),
                        found: "out-of-range accessor".to_string(),
                    })
                }
            }
        }
        Ok(Value::Object(ObjectValue {
            ty: shape.def().id,
            fields,
        }))
    }
}
