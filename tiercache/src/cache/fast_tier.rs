//! Fast Tier
//!
//! Bounded in-memory tier. Entries are kept in insertion order for FIFO
//! bookkeeping, but the eviction victim is the resident key with the lowest
//! `(Q[key][cache], last_access)` pair.

use std::collections::{HashMap, VecDeque};
use tracing::debug;

use super::policy::table::{AccessStats, ActionValueTable};
use crate::core::types::{Action, CacheKey};

pub struct FastTier<V> {
    capacity: usize,
    entries: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
}

impl<V: Clone> FastTier<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value, evicting the policy's least wanted key when full.
    ///
    /// Returns the evicted key, if any.
    pub fn put(
        &mut self,
        key: CacheKey,
        value: V,
        table: &ActionValueTable,
        stats: &AccessStats,
    ) -> Option<CacheKey> {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(victim) = self.select_victim(table, stats) {
                self.entries.remove(&victim);
                self.order.retain(|k| k != &victim);
                debug!("Fast tier EVICT: {}", victim);
                evicted = Some(victim);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    /// Lowest `(cache score, last access)`; ties fall to the earliest inserted
    pub fn select_victim(&self, table: &ActionValueTable, stats: &AccessStats) -> Option<CacheKey> {
        self.order
            .iter()
            .min_by(|a, b| {
                table
                    .get(a, Action::Cache)
                    .total_cmp(&table.get(b, Action::Cache))
                    .then_with(|| stats.last_access(a).cmp(&stats.last_access(b)))
            })
            .cloned()
    }

    /// Resident keys, oldest insertion first
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
