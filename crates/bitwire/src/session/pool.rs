// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded lock-free pool of per-session scratch state.
//!
//! Sessions are checked out for one conversion and checked back in cleared,
//! so the session-version map's allocation is reused instead of rebuilt per
//! call. Overflowing check-ins are simply dropped.

use crate::convert::VersionInfo;
use crossbeam::queue::ArrayQueue;
use std::collections::HashMap;
use std::sync::Arc;

/// Reusable per-session state: the "version already handled for this
/// converter" map, keyed by slot identity.
#[derive(Default)]
pub(crate) struct SessionScratch {
    pub seen: HashMap<usize, Arc<VersionInfo>>,
}

pub(crate) struct SessionPool {
    slots: ArrayQueue<SessionScratch>,
}

impl SessionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(capacity.max(1)),
        }
    }

    pub fn check_out(&self) -> SessionScratch {
        self.slots.pop().unwrap_or_default()
    }

    pub fn check_in(&self, mut scratch: SessionScratch) {
        scratch.seen.clear();
        let _ = self.slots.push(scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_out_in_reuses_slots() {
        let pool = SessionPool::new(2);
        let mut a = pool.check_out();
        a.seen.insert(1, dummy());
        pool.check_in(a);
        let b = pool.check_out();
        assert!(b.seen.is_empty()); // cleared on check-in
        assert!(b.seen.capacity() > 0); // but allocation survived
    }

    #[test]
    fn test_overflow_check_in_is_dropped() {
        let pool = SessionPool::new(1);
        pool.check_in(SessionScratch::default());
        pool.check_in(SessionScratch::default()); // full; silently dropped
        let _ = pool.check_out();
        assert!(pool.slots.pop().is_none());
    }

    fn dummy() -> Arc<VersionInfo> {
        use crate::types::{ObjectBuilder, TypeRegistry};
        let mut reg = TypeRegistry::new();
        let id = reg.define(ObjectBuilder::new("T")).expect("define");
        Arc::new(VersionInfo::new(
            reg.get(id).expect("get").clone(),
            0,
            Vec::new(),
            true,
        ))
    }
}
