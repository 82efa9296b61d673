// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Converter contract and the per-type conversion plans it produces.
//!
//! A [`Converter`] handles one family of types. The owning
//! [`ConverterSlot`] pairs it with the type it was resolved for, the lazy
//! version table and the inheritance plan; [`MapItemInfo`] is the small
//! handle the rest of the system passes around.

pub mod builtin;
pub mod inherit;
pub mod object;
pub mod registry;
pub mod versions;

pub use inherit::InheritancePlan;
pub use registry::ConverterRegistry;

use crate::error::{Error, Result};
use crate::map::MapGenerator;
use crate::session::{Decoder, Encoder};
use crate::types::{MemberInfo, MemberProvider, TypeDef, TypeId, TypeRegistry, Value};
use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use versions::{Lookup, VersionTable};

/// Polymorphic dispatch unit for (de)serializing one family of types.
///
/// A converter must claim types through `exact_types`, a predicate
/// (`has_predicate` + `matches`), or both; declaring neither is a fatal
/// registration error.
pub trait Converter: Send + Sync {
    /// Diagnostic name.
    fn name(&self) -> &'static str;

    /// Types claimed exactly (O(1) dispatch).
    fn exact_types(&self) -> Vec<TypeId> {
        Vec::new()
    }

    /// True when `matches` participates in ordered predicate dispatch.
    fn has_predicate(&self) -> bool {
        false
    }

    /// Predicate for non-exact matches.
    fn matches(&self, def: &TypeDef) -> bool {
        let _ = def;
        false
    }

    /// Highest declared version for `def` (0 for unversioned families).
    fn highest_version(&self, def: &TypeDef) -> u16 {
        let _ = def;
        0
    }

    /// Produce the shape for one version. May recurse into other types via
    /// [`GenContext::resolve`]; runs at most once per (slot, version).
    fn generate(&self, def: &Arc<TypeDef>, version: u16, cx: &GenContext<'_>)
        -> Result<VersionInfo>;

    /// Version-specific payload encoding.
    fn write(&self, value: &Value, shape: &VersionInfo, enc: &mut Encoder<'_>) -> Result<()>;

    /// Version-specific payload decoding.
    fn read(&self, shape: &VersionInfo, dec: &mut Decoder<'_>) -> Result<Value>;
}

/// One member of a version shape: accessor binding plus nested item plan.
#[derive(Clone)]
pub struct MemberPlan {
    pub name: Arc<str>,
    /// Positional accessor into `ObjectValue::fields`.
    pub field: usize,
    pub item: MapItemInfo,
}

/// Accessor table bound for one shape: the default field template used to
/// materialize objects whose wire version omits declared members.
pub struct AccessorTable {
    pub template: Vec<Value>,
}

/// Concrete field list and encoding rules for one version of a type.
/// Immutable once published.
pub struct VersionInfo {
    def: Arc<TypeDef>,
    version: u16,
    members: Vec<MemberPlan>,
    uses_header_bit: bool,
    inheritance: Option<Arc<InheritancePlan>>,
    accessors: OnceLock<AccessorTable>,
}

impl VersionInfo {
    pub fn new(def: Arc<TypeDef>, version: u16, members: Vec<MemberPlan>, uses_header_bit: bool) -> Self {
        Self {
            def,
            version,
            members,
            uses_header_bit,
            inheritance: None,
            accessors: OnceLock::new(),
        }
    }

    pub fn def(&self) -> &Arc<TypeDef> {
        &self.def
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn members(&self) -> &[MemberPlan] {
        &self.members
    }

    /// Whether this version's payload opens with header bits (drivers skip
    /// the pre-payload `finish` when it does).
    pub fn uses_header_bit(&self) -> bool {
        self.uses_header_bit
    }

    pub fn inheritance(&self) -> Option<&Arc<InheritancePlan>> {
        self.inheritance.as_ref()
    }

    /// Accessor table, bound on first use when the deferred batch has not
    /// run yet.
    pub fn accessors(&self, registry: &TypeRegistry) -> &AccessorTable {
        self.accessors.get_or_init(|| {
            let template = match self.def.object() {
                Some(obj) => obj
                    .members
                    .iter()
                    .map(|m| Value::default_for(registry, m.ty).unwrap_or(Value::Null))
                    .collect(),
                None => Vec::new(),
            };
            AccessorTable { template }
        })
    }
}

impl fmt::Debug for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionInfo")
            .field("type", &self.def.name)
            .field("version", &self.version)
            .field("members", &self.members.len())
            .field("uses_header_bit", &self.uses_header_bit)
            .finish()
    }
}

/// Resolved handle describing how to convert one slot (field/element/root).
/// Copied by value, compared by value; never outlives its owning map.
#[derive(Clone)]
pub struct MapItemInfo {
    pub slot: Arc<ConverterSlot>,
    pub nullable: bool,
}

impl PartialEq for MapItemInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot) && self.nullable == other.nullable
    }
}

impl Eq for MapItemInfo {}

impl fmt::Debug for MapItemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapItemInfo")
            .field("type", &self.slot.def().name)
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// Raw member-discovery output, cached while versions are still being
/// generated and dropped once every declared version is published.
pub struct RawMemberCache {
    cell: Mutex<Option<Arc<[MemberInfo]>>>,
}

impl RawMemberCache {
    fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    fn get_or_discover(
        &self,
        provider: &dyn MemberProvider,
        def: &TypeDef,
    ) -> Result<Arc<[MemberInfo]>> {
        let mut cell = self.cell.lock();
        if let Some(raw) = cell.as_ref() {
            return Ok(raw.clone());
        }
        let raw: Arc<[MemberInfo]> = provider.members(def)?.into();
        *cell = Some(raw.clone());
        Ok(raw)
    }

    fn drop_raw(&self) {
        *self.cell.lock() = None;
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        self.cell.lock().is_some()
    }
}

/// Context handed to [`Converter::generate`].
pub struct GenContext<'a> {
    gen: &'a MapGenerator,
    raw: &'a RawMemberCache,
}

impl GenContext<'_> {
    /// Resolve a member type's own item plan (may recurse).
    pub fn resolve(&self, ty: TypeId) -> Result<MapItemInfo> {
        self.gen.get_map(ty)
    }

    /// Discovered members of `def`, cached per slot.
    pub fn members(&self, def: &TypeDef) -> Result<Arc<[MemberInfo]>> {
        self.raw.get_or_discover(self.gen.provider(), def)
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.gen.registry()
    }

    pub fn settings(&self) -> &crate::config::Settings {
        self.gen.settings()
    }
}

/// A converter bound to one resolved type: unique per (settings, type),
/// owner of the lazy version table and the inheritance plan.
pub struct ConverterSlot {
    def: Arc<TypeDef>,
    imp: Arc<dyn Converter>,
    highest: u16,
    inheritance: Option<Arc<InheritancePlan>>,
    versions: VersionTable,
    raw_members: RawMemberCache,
}

impl ConverterSlot {
    pub(crate) fn new(
        def: Arc<TypeDef>,
        imp: Arc<dyn Converter>,
        registry: &TypeRegistry,
    ) -> Result<Arc<Self>> {
        let highest = imp.highest_version(&def);
        let inheritance = match def.object().and_then(|o| o.inheritance.as_ref()) {
            Some(decl) => Some(InheritancePlan::build(&def, decl, registry)?),
            None => None,
        };
        Ok(Arc::new(Self {
            def,
            imp,
            highest,
            inheritance,
            versions: VersionTable::new(highest),
            raw_members: RawMemberCache::new(),
        }))
    }

    pub fn def(&self) -> &Arc<TypeDef> {
        &self.def
    }

    pub fn imp(&self) -> &Arc<dyn Converter> {
        &self.imp
    }

    pub fn highest_version(&self) -> u16 {
        self.highest
    }

    /// The inheritance plan when this slot's type is polymorphic.
    pub fn inheritance_plan(&self) -> Option<&Arc<InheritancePlan>> {
        self.inheritance.as_ref()
    }

    /// Resolve (generating at most once, on whichever thread claims the
    /// placeholder) the shape for `version`. Concurrent callers observing
    /// the placeholder spin cooperatively; they never block or duplicate
    /// the generation work.
    pub fn version_info(&self, version: u16, gen: &MapGenerator) -> Result<Arc<VersionInfo>> {
        if version > self.highest {
            return Err(Error::UnknownVersion {
                type_name: self.def.name.to_string(),
                version,
            });
        }
        let backoff = Backoff::new();
        loop {
            match self.versions.lookup_or_claim(version) {
                Lookup::Published(info) => return Ok(info),
                Lookup::MustGenerate => return self.generate(version, gen),
                Lookup::InFlight => backoff.snooze(),
            }
        }
    }

    fn generate(&self, version: u16, gen: &MapGenerator) -> Result<Arc<VersionInfo>> {
        log::trace!("[convert] generating {} v{}", self.def.name, version);
        let cx = GenContext {
            gen,
            raw: &self.raw_members,
        };
        match self.imp.generate(&self.def, version, &cx) {
            Ok(mut info) => {
                info.inheritance = self.inheritance.clone();
                let info = Arc::new(info);
                if self.versions.publish(version, info.clone()) {
                    // Every declared version is out; discovery data is done.
                    self.raw_members.drop_raw();
                    log::trace!("[convert] {} fully versioned, raw members dropped", self.def.name);
                }
                gen.defer_binding(info.clone());
                Ok(info)
            }
            Err(e) => {
                self.versions.abandon(version);
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn raw_member_cache(&self) -> &RawMemberCache {
        &self.raw_members
    }
}
