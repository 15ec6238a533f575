//! TTL'd cache of per-process fields that rarely change (name, user).
//!
//! Owned by the process collector; TTL and clock are injected so expiry is
//! testable without sleeping. A read is a miss once `now - cached_at > ttl`,
//! and the caller repopulates lazily.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::util::Clock;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub name: String,
    pub user: String,
    cached_at: Instant,
}

pub struct ProcessCache {
    entries: HashMap<u32, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ProcessCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Returns the entry for `pid`, or `None` when absent or expired.
    pub fn get(&self, pid: u32) -> Option<&CacheEntry> {
        let entry = self.entries.get(&pid)?;
        if self.clock.now().duration_since(entry.cached_at) > self.ttl {
            return None;
        }
        Some(entry)
    }

    pub fn insert(&mut self, pid: u32, name: String, user: String) {
        self.entries.insert(
            pid,
            CacheEntry {
                name,
                user,
                cached_at: self.clock.now(),
            },
        );
    }

    /// Drops entries for processes that no longer exist.
    pub fn retain_live(&mut self, live: &HashSet<u32>) {
        self.entries.retain(|pid, _| live.contains(pid));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
