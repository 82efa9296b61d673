// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type -> converter dispatch.
//!
//! Exact-type claims resolve O(1); everything else walks the ordered
//! predicate list (built-ins first, then settings-added extensions). The
//! winner is cached per exact type after the first resolution.

use super::builtin::{BytesConverter, ListConverter, PrimitiveConverter, StrConverter};
use super::object::ObjectConverter;
use super::Converter;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::{TypeDef, TypeId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ConverterRegistry {
    exact: HashMap<TypeId, Arc<dyn Converter>>,
    ordered: Vec<Arc<dyn Converter>>,
    resolved: DashMap<TypeId, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Build the dispatch tables from built-ins plus the settings'
    /// registration list. A converter declaring neither exact types nor a
    /// predicate is rejected here, at registration.
    pub fn new(settings: &Settings) -> Result<Self> {
        let builtins: [Arc<dyn Converter>; 5] = [
            Arc::new(PrimitiveConverter),
            Arc::new(StrConverter),
            Arc::new(BytesConverter),
            Arc::new(ListConverter),
            Arc::new(ObjectConverter),
        ];

        let mut exact: HashMap<TypeId, Arc<dyn Converter>> = HashMap::new();
        let mut ordered: Vec<Arc<dyn Converter>> = Vec::new();
        for converter in builtins
            .into_iter()
            .chain(settings.extensions().iter().cloned())
        {
            let exacts = converter.exact_types();
            let predicated = converter.has_predicate();
            if exacts.is_empty() && !predicated {
                return Err(Error::ConverterContract(converter.name().to_string()));
            }
            for ty in exacts {
                // Later registrations (extensions) override built-ins.
                exact.insert(ty, converter.clone());
            }
            if predicated {
                ordered.push(converter);
            }
        }
        Ok(Self {
            exact,
            ordered,
            resolved: DashMap::new(),
        })
    }

    /// Resolve the converter for `def`, caching per exact type.
    pub fn resolve(&self, def: &TypeDef) -> Result<Arc<dyn Converter>> {
        if let Some(hit) = self.resolved.get(&def.id) {
            return Ok(hit.value().clone());
        }
        let found = self
            .exact
            .get(&def.id)
            .cloned()
            .or_else(|| self.ordered.iter().find(|c| c.matches(def)).cloned());
        match found {
            Some(converter) => {
                self.resolved.insert(def.id, converter.clone());
                Ok(converter)
            }
            None => Err(Error::UnserializableType(def.name.to_string())),
        }
    }
}
