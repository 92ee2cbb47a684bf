//! Action-value table and per-key access statistics

use std::collections::HashMap;
use std::time::Instant;

use crate::core::types::{Action, CacheKey};

/// Q-table: two scores per key, zero for anything unseen
#[derive(Debug, Clone, Default)]
pub struct ActionValueTable {
    values: HashMap<CacheKey, [f64; 2]>,
}

impl ActionValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey, action: Action) -> f64 {
        self.values
            .get(key)
            .map(|scores| scores[action.index()])
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &CacheKey, action: Action, value: f64) {
        self.values.entry(key.clone()).or_insert([0.0; 2])[action.index()] = value;
    }

    /// Move the score toward `reward` by `alpha`
    pub fn update(&mut self, key: &CacheKey, action: Action, alpha: f64, reward: f64) -> f64 {
        let slot = &mut self.values.entry(key.clone()).or_insert([0.0; 2])[action.index()];
        *slot += alpha * (reward - *slot);
        *slot
    }

    /// Greedy choice; ties go to `Cache`
    pub fn best_action(&self, key: &CacheKey) -> Action {
        if self.get(key, Action::Evict) > self.get(key, Action::Cache) {
            Action::Evict
        } else {
            Action::Cache
        }
    }

    /// Scale every score of every key
    pub fn decay_all(&mut self, rate: f64) {
        for scores in self.values.values_mut() {
            scores[0] *= rate;
            scores[1] *= rate;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccessRecord {
    pub count: u64,
    pub last_access: Instant,
}

/// Access counters and last-access stamps, touched on every lookup
#[derive(Debug, Clone, Default)]
pub struct AccessStats {
    records: HashMap<CacheKey, AccessRecord>,
}

impl AccessStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the counter and stamp the access; returns the new count
    pub fn touch(&mut self, key: &CacheKey) -> u64 {
        let now = Instant::now();
        let record = self
            .records
            .entry(key.clone())
            .or_insert(AccessRecord {
                count: 0,
                last_access: now,
            });
        record.count += 1;
        record.last_access = now;
        record.count
    }

    pub fn count(&self, key: &CacheKey) -> u64 {
        self.records.get(key).map(|r| r.count).unwrap_or(0)
    }

    /// `None` for keys never looked up; sorts before any stamp
    pub fn last_access(&self, key: &CacheKey) -> Option<Instant> {
        self.records.get(key).map(|r| r.last_access)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::QueryTemplate;

    fn key(id: i64) -> CacheKey {
        CacheKey::new(QueryTemplate::DailySalesProduct, vec![id.into()])
    }

    #[test]
    fn test_unseen_values_are_zero() {
        let table = ActionValueTable::new();
        assert_eq!(table.get(&key(1), Action::Cache), 0.0);
        assert_eq!(table.get(&key(1), Action::Evict), 0.0);
        assert_eq!(table.best_action(&key(1)), Action::Cache);
        assert!(table.is_empty());
    }

    #[test]
    fn test_update_rule() {
        let mut table = ActionValueTable::new();
        let v = table.update(&key(1), Action::Cache, 0.3, 7.0);
        assert!((v - 2.1).abs() < 1e-12);
        let v = table.update(&key(1), Action::Cache, 0.3, 7.0);
        assert!((v - (2.1 + 0.3 * (7.0 - 2.1))).abs() < 1e-12);
        assert_eq!(table.get(&key(1), Action::Evict), 0.0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_best_action_prefers_higher_score() {
        let mut table = ActionValueTable::new();
        table.set(&key(1), Action::Evict, 0.5);
        assert_eq!(table.best_action(&key(1)), Action::Evict);
        table.set(&key(1), Action::Cache, 0.5);
        assert_eq!(table.best_action(&key(1)), Action::Cache);
    }

    #[test]
    fn test_decay_all_touches_every_key() {
        let mut table = ActionValueTable::new();
        table.set(&key(1), Action::Cache, 8.0);
        table.set(&key(2), Action::Evict, -4.0);

        table.decay_all(0.5);

        assert_eq!(table.get(&key(1), Action::Cache), 4.0);
        assert_eq!(table.get(&key(2), Action::Evict), -2.0);
    }

    #[test]
    fn test_access_stats_touch() {
        let mut stats = AccessStats::new();
        assert_eq!(stats.count(&key(1)), 0);
        assert!(stats.last_access(&key(1)).is_none());

        assert_eq!(stats.touch(&key(1)), 1);
        let first = stats.last_access(&key(1)).unwrap();
        assert_eq!(stats.touch(&key(1)), 2);
        assert!(stats.last_access(&key(1)).unwrap() >= first);
    }
}
