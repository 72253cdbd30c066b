//! In-memory cache of search result pages
//!
//! Pages are stored as raw JSON keyed by [`CacheKey`] (entity plus
//! canonical query), so different entities and filter sets never share a
//! slot. Every issued request draws a sequence number; a slot only accepts
//! a response whose sequence is newer than the one it holds, so a slow
//! response to an older request cannot replace a newer one.
//!
//! Each entity keeps at most `capacity` slots; storing past that evicts
//! the slot filled by the oldest request. The highest evicted sequence is
//! remembered per entity, and responses at or below it are not stored, so
//! eviction never lets an old response back in.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::filters::{CacheKey, EntityKind};

/// Cache entry
#[derive(Debug)]
struct CacheEntry {
    /// Sequence of the request that produced the value
    sequence: u64,
    value: Value,
    stored_at: Instant,
}

/// Slots kept per entity unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Highest sequence evicted per entity
    evicted: HashMap<EntityKind, u64>,
}

/// Shared result-page cache
#[derive(Debug, Clone)]
pub struct QueryCache {
    slots: Arc<Mutex<Slots>>,
    sequence: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl QueryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache keeping at most `capacity` slots per entity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Arc::default(),
            sequence: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    /// Reserve the sequence number for a request about to be issued
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store a response, unless the slot already holds a newer one
    ///
    /// Returns whether the value was stored.
    pub async fn store(&self, key: &CacheKey, sequence: u64, value: Value) -> bool {
        let mut slots = self.slots.lock().await;

        match slots.entries.get(key) {
            Some(existing) if existing.sequence > sequence => {
                debug!(
                    "Ignoring response #{} for {}: #{} is newer",
                    sequence, key, existing.sequence
                );
                return false;
            }
            None if slots
                .evicted
                .get(&key.entity)
                .is_some_and(|floor| sequence <= *floor) =>
            {
                debug!("Ignoring response #{} for {}: already evicted", sequence, key);
                return false;
            }
            _ => {}
        }

        slots.entries.insert(
            key.clone(),
            CacheEntry {
                sequence,
                value,
                stored_at: Instant::now(),
            },
        );
        self.evict(&mut slots, key.entity);
        true
    }

    fn evict(&self, slots: &mut Slots, entity: EntityKind) {
        loop {
            let mut count = 0;
            let mut oldest: Option<(&CacheKey, u64)> = None;
            for (key, entry) in slots.entries.iter().filter(|(k, _)| k.entity == entity) {
                count += 1;
                if oldest.is_none_or(|(_, seq)| entry.sequence < seq) {
                    oldest = Some((key, entry.sequence));
                }
            }
            if count <= self.capacity {
                return;
            }
            let Some((key, sequence)) = oldest.map(|(k, seq)| (k.clone(), seq)) else {
                return;
            };

            slots.entries.remove(&key);
            let floor = slots.evicted.entry(entity).or_insert(0);
            *floor = (*floor).max(sequence);
            debug!("Evicted {} (request #{})", key, sequence);
        }
    }

    /// Get the cached value for a key regardless of age
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let slots = self.slots.lock().await;
        slots.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Get the cached value if it was stored less than `stale_after` ago
    pub async fn fresh(&self, key: &CacheKey, stale_after: Duration) -> Option<Value> {
        if stale_after.is_zero() {
            return None;
        }

        let slots = self.slots.lock().await;
        slots
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < stale_after)
            .map(|entry| entry.value.clone())
    }

    /// Drop one slot
    pub async fn invalidate(&self, key: &CacheKey) {
        self.slots.lock().await.entries.remove(key);
    }

    /// Number of cached slots
    pub async fn len(&self) -> usize {
        self.slots.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.entries.is_empty()
    }
}
