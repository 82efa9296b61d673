// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Map generation: the reentrant, thread-safe entry point that turns a
//! `TypeId` into a reusable conversion plan.
//!
//! The TypeId -> slot table follows the same Absent/Generating/Published
//! discipline as the per-slot version cache, with one twist: a caller that
//! observes Generating receives the in-flight slot itself as a
//! forward-reference handle. Version data is only dereferenced at actual
//! (de)serialize time, which is what makes mutually recursive type graphs
//! safe -- the cycle is broken at the handle, not with a lock.

use crate::config::Settings;
use crate::convert::{ConverterRegistry, ConverterSlot, MapItemInfo, VersionInfo};
use crate::error::{Error, Result};
use crate::types::{MemberProvider, TypeDef, TypeId, TypeKind, TypeRegistry};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

thread_local! {
    static PASS_DEPTH: Cell<usize> = const { Cell::new(0) };
}

enum TypeSlot {
    /// Slot exists but its write-side shape is still being generated by the
    /// claiming thread; handing it out is the forward-reference path.
    Generating(Arc<ConverterSlot>),
    Published(Arc<ConverterSlot>),
}

/// Thread-safe, reentrant map generator. One per `Bitwire` instance.
pub struct MapGenerator {
    settings: Arc<Settings>,
    registry: Arc<TypeRegistry>,
    provider: Arc<dyn MemberProvider>,
    converters: ConverterRegistry,
    slots: Mutex<HashMap<TypeId, TypeSlot>>,
    deferred: SegQueue<Arc<VersionInfo>>,
}

impl MapGenerator {
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<TypeRegistry>,
        provider: Arc<dyn MemberProvider>,
    ) -> Result<Self> {
        let converters = ConverterRegistry::new(&settings)?;
        Ok(Self {
            settings,
            registry,
            provider,
            converters,
            slots: Mutex::new(HashMap::new()),
            deferred: SegQueue::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub(crate) fn provider(&self) -> &dyn MemberProvider {
        &*self.provider
    }

    /// Resolve the conversion plan for `ty`, creating converters on first
    /// demand. Callable recursively from inside version generation.
    ///
    /// Nullable types are unwrapped exactly once here: the presence bit is
    /// reserved in the item, and the inner type resolves through the same
    /// path. `Option(Option(_))` is a fatal mapping error.
    pub fn get_map(&self, ty: TypeId) -> Result<MapItemInfo> {
        let _pass = self.begin_pass();
        let def = self.registry.get(ty)?.clone();
        match def.kind {
            TypeKind::Option(inner) => {
                let inner_def = self.registry.get(inner)?.clone();
                if matches!(inner_def.kind, TypeKind::Option(_)) {
                    return Err(Error::NestedNullable(def.name.to_string()));
                }
                Ok(MapItemInfo {
                    slot: self.slot_for(&inner_def)?,
                    nullable: true,
                })
            }
            _ => Ok(MapItemInfo {
                slot: self.slot_for(&def)?,
                nullable: false,
            }),
        }
    }

    /// The version a writer picks for `slot`: the explicit target override
    /// when configured, otherwise the converter's highest.
    pub fn write_version_of(&self, slot: &ConverterSlot) -> u16 {
        self.settings
            .target_version(slot.def().id)
            .unwrap_or_else(|| slot.highest_version())
    }

    fn slot_for(&self, def: &Arc<TypeDef>) -> Result<Arc<ConverterSlot>> {
        let slot = {
            let mut slots = self.slots.lock();
            match slots.get(&def.id) {
                Some(TypeSlot::Published(slot)) => return Ok(slot.clone()),
                Some(TypeSlot::Generating(slot)) => {
                    log::trace!("[map] forward reference to in-flight {}", def.name);
                    return Ok(slot.clone());
                }
                None => {
                    // Membership test + insert stay inside the short
                    // critical section; generation work runs outside it.
                    let imp = self.converters.resolve(def)?;
                    let slot = ConverterSlot::new(def.clone(), imp, &self.registry)?;
                    slots.insert(def.id, TypeSlot::Generating(slot.clone()));
                    slot
                }
            }
        };

        log::debug!("[map] mapping {} ({})", def.name, slot.imp().name());
        let version = self.write_version_of(&slot);
        match slot.version_info(version, self) {
            Ok(_) => {
                self.slots
                    .lock()
                    .insert(def.id, TypeSlot::Published(slot.clone()));
                Ok(slot)
            }
            Err(e) => {
                // Drop the placeholder so a corrected model can remap.
                self.slots.lock().remove(&def.id);
                Err(e)
            }
        }
    }

    /// Queue a shape for deferred accessor binding.
    pub(crate) fn defer_binding(&self, info: Arc<VersionInfo>) {
        if !info.members().is_empty() {
            self.deferred.push(info);
        }
    }

    /// Enter a mapping pass. When the outermost guard unwinds, queued
    /// accessor work is executed as a data-parallel batch
    /// (`release_generator`).
    pub(crate) fn begin_pass(&self) -> PassGuard<'_> {
        PASS_DEPTH.with(|d| d.set(d.get() + 1));
        PassGuard { gen: self }
    }

    fn release_generator(&self) {
        let mut jobs = Vec::new();
        while let Some(job) = self.deferred.pop() {
            jobs.push(job);
        }
        if jobs.is_empty() {
            return;
        }
        log::debug!("[map] release: binding {} accessor tables", jobs.len());
        let workers = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(2)
            .min(jobs.len());
        if workers <= 1 {
            for job in &jobs {
                job.accessors(&self.registry);
            }
            return;
        }
        let queue = SegQueue::new();
        for job in jobs {
            queue.push(job);
        }
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while let Some(job) = queue.pop() {
                        job.accessors(&self.registry);
                    }
                });
            }
        });
    }
}

/// Guard for one mapping pass (see [`MapGenerator::begin_pass`]).
pub(crate) struct PassGuard<'a> {
    gen: &'a MapGenerator,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let depth = PASS_DEPTH.with(|d| {
            d.set(d.get() - 1);
            d.get()
        });
        if depth == 0 {
            self.gen.release_generator();
        }
    }
}
