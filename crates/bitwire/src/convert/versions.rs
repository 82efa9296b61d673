// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-slot version cache: Absent -> Generating -> Published.
//!
//! Lookups that find Absent atomically claim a Generating placeholder and
//! obligate the caller to generate; lookups that find the placeholder spin
//! cooperatively (the caller's backoff, not ours); Published returns
//! immediately. Single-version slots skip the dictionary entirely and use
//! one direct `ArcSwapOption` cell.

use super::VersionInfo;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of a cache probe.
pub(crate) enum Lookup {
    Published(Arc<VersionInfo>),
    /// Absent; the probe installed a placeholder and this caller must
    /// generate (then publish or abandon).
    MustGenerate,
    /// Another caller holds the placeholder; retry after yielding.
    InFlight,
}

enum VSlot {
    Generating,
    Published(Arc<VersionInfo>),
}

pub(crate) struct VersionTable {
    highest: u16,
    /// Direct slot for single-version converters.
    direct: ArcSwapOption<VersionInfo>,
    direct_claimed: AtomicBool,
    /// Dictionary for multi-version converters.
    multi: Mutex<HashMap<u16, VSlot>>,
}

impl VersionTable {
    pub(crate) fn new(highest: u16) -> Self {
        Self {
            highest,
            direct: ArcSwapOption::const_empty(),
            direct_claimed: AtomicBool::new(false),
            multi: Mutex::new(HashMap::new()),
        }
    }

    fn single(&self) -> bool {
        self.highest == 0
    }

    pub(crate) fn lookup_or_claim(&self, version: u16) -> Lookup {
        if self.single() {
            if let Some(info) = self.direct.load_full() {
                return Lookup::Published(info);
            }
            if self.direct_claimed.swap(true, Ordering::AcqRel) {
                return Lookup::InFlight;
            }
            return Lookup::MustGenerate;
        }
        let mut map = self.multi.lock();
        match map.get(&version) {
            Some(VSlot::Published(info)) => Lookup::Published(info.clone()),
            Some(VSlot::Generating) => Lookup::InFlight,
            None => {
                map.insert(version, VSlot::Generating);
                Lookup::MustGenerate
            }
        }
    }

    /// Publish a generated shape; returns true once every version up to the
    /// slot's highest is published (the signal to drop raw discovery data).
    pub(crate) fn publish(&self, version: u16, info: Arc<VersionInfo>) -> bool {
        if self.single() {
            self.direct.store(Some(info));
            return true;
        }
        let mut map = self.multi.lock();
        map.insert(version, VSlot::Published(info));
        (0..=self.highest).all(|v| matches!(map.get(&v), Some(VSlot::Published(_))))
    }

    /// Remove a placeholder after failed generation so a later caller can
    /// retry once the model is corrected.
    pub(crate) fn abandon(&self, version: u16) {
        if self.single() {
            self.direct_claimed.store(false, Ordering::Release);
            return;
        }
        self.multi.lock().remove(&version);
    }
}
