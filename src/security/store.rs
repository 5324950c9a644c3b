//! Counter storage for the fixed-window rate limiter.
//!
//! The store is per instance. Two gatekeepers behind a load balancer keep
//! independent counts, so a client may get up to `max_requests` per instance.
//! Sharing counts requires an external counter service implementing
//! [`RateLimitStore`] with an atomic `update`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Counter for one key within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Window end, milliseconds since the Unix epoch.
    pub window_reset_at_ms: u64,
}

impl RateLimitEntry {
    /// Expired entries must be treated as absent.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.window_reset_at_ms
    }
}

/// Storage backend for rate-limit counters.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    fn set(&self, key: &str, entry: RateLimitEntry);

    /// Remove every entry expired at `now_ms`. Returns how many were removed.
    fn sweep(&self, now_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-modify-write of one key.
    ///
    /// The default composes `get` and `set` and is not atomic; stores that
    /// can lock a key override it.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        let next = apply(self.get(key));
        self.set(key, next);
        next
    }
}

/// In-process store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    // The shard lock is held for the whole read-modify-write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let next = apply(Some(*occupied.get()));
                occupied.insert(next);
                next
            }
            Entry::Vacant(vacant) => {
                let next = apply(None);
                vacant.insert(next);
                next
            }
        }
    }
}
