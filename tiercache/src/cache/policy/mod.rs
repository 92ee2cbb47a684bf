//! Policy Engine
//!
//! Learns, per cache key, whether serving from the cache pays off. Lookups
//! pick an action epsilon-greedily from the action-value table:
//! - `Cache`: consult the fast tier, then the second tier
//! - `Evict`: force a miss without touching either tier
//!
//! Rewards are folded in with `Q += alpha * (reward - Q)` and every score in
//! the table decays after each processed query.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub mod attribution;
pub mod table;

pub use attribution::{
    AttributionKind, OutcomeAttribution, Outcome, RewardAttribution, SampledActionAttribution,
};
pub use table::{AccessRecord, AccessStats, ActionValueTable};

use super::tier_manager::TierManager;
use crate::core::error::{Result, TierCacheError};
use crate::core::types::{Action, CacheKey, Tier};

/// Reward per lookup outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    pub fast_hit: f64,
    pub second_hit: f64,
    pub source_fetch: f64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            fast_hit: 7.0,
            second_hit: 4.0,
            source_fetch: -3.0,
        }
    }
}

impl RewardSchedule {
    pub fn reward_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Hit(Tier::Fast) => self.fast_hit,
            Outcome::Hit(Tier::Second) => self.second_hit,
            Outcome::Hit(Tier::Source) | Outcome::Miss => self.source_fetch,
        }
    }
}

/// Learning parameters for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParameters {
    /// Learning rate
    pub alpha: f64,
    /// Discount factor. Validated and reported, not used by the update rule.
    pub gamma: f64,
    /// Exploration probability
    pub epsilon: f64,
    /// Multiplier applied to every score after each query
    pub decay_rate: f64,
    /// A second-tier hit is promoted once the key's access count exceeds this
    pub promotion_threshold: u64,
    pub rewards: RewardSchedule,
}

impl Default for PolicyParameters {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            gamma: 0.9,
            epsilon: 0.05,
            decay_rate: 0.75,
            promotion_threshold: 5,
            rewards: RewardSchedule::default(),
        }
    }
}

impl PolicyParameters {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
            ("decay_rate", self.decay_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TierCacheError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Result of a policy lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    pub value: Option<V>,
    pub tier: Option<Tier>,
    /// Action sampled for this lookup
    pub action: Action,
}

impl<V> Lookup<V> {
    fn miss(action: Action) -> Self {
        Self {
            value: None,
            tier: None,
            action,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }

    pub fn outcome(&self) -> Outcome {
        match self.tier {
            Some(tier) if self.value.is_some() => Outcome::Hit(tier),
            _ => Outcome::Miss,
        }
    }
}

pub struct PolicyEngine<V> {
    params: PolicyParameters,
    table: ActionValueTable,
    access: AccessStats,
    tiers: TierManager<V>,
    rng: StdRng,
    last_sampled: HashMap<CacheKey, Action>,
    attribution: Arc<dyn RewardAttribution>,
}

impl<V> PolicyEngine<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(params: PolicyParameters, tiers: TierManager<V>, seed: Option<u64>) -> Result<Self> {
        params.validate()?;

        info!(
            "Initializing policy engine alpha={} gamma={} (inert) epsilon={} decay={} promotion_threshold={}",
            params.alpha, params.gamma, params.epsilon, params.decay_rate, params.promotion_threshold
        );

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            params,
            table: ActionValueTable::new(),
            access: AccessStats::new(),
            tiers,
            rng,
            last_sampled: HashMap::new(),
            attribution: Arc::new(OutcomeAttribution),
        })
    }

    /// Swap the reward attribution strategy
    pub fn with_attribution(mut self, attribution: Arc<dyn RewardAttribution>) -> Self {
        self.attribution = attribution;
        self
    }

    /// Epsilon-greedy action for `key`
    pub fn choose_action(&mut self, key: &CacheKey) -> Action {
        if self.rng.r#gen::<f64>() < self.params.epsilon {
            if self.rng.gen_bool(0.5) {
                Action::Cache
            } else {
                Action::Evict
            }
        } else {
            self.table.best_action(key)
        }
    }

    /// Look `key` up through the policy and both tiers
    pub async fn lookup(&mut self, key: &CacheKey) -> Lookup<V> {
        let count = self.access.touch(key);

        let action = self.choose_action(key);
        self.last_sampled.insert(key.clone(), action);

        if action == Action::Evict {
            debug!("Policy chose evict for {}", key);
            return Lookup::miss(action);
        }

        if let Some(value) = self.tiers.get_fast(key) {
            return Lookup {
                value: Some(value),
                tier: Some(Tier::Fast),
                action,
            };
        }

        if let Some(value) = self.tiers.get_second(key).await {
            if count > self.params.promotion_threshold {
                self.tiers
                    .put(key.clone(), value.clone(), &self.table, &self.access, true)
                    .await;
            }
            return Lookup {
                value: Some(value),
                tier: Some(Tier::Second),
                action,
            };
        }

        Lookup::miss(action)
    }

    /// Write a freshly fetched value into both tiers
    pub async fn insert(&mut self, key: CacheKey, value: V) {
        self.tiers
            .put(key, value, &self.table, &self.access, false)
            .await;
    }

    /// Credit `reward` to the action the attribution strategy picks.
    ///
    /// Returns the credited action.
    pub fn record_outcome(&mut self, key: &CacheKey, outcome: Outcome, reward: f64) -> Action {
        let sampled = self
            .last_sampled
            .get(key)
            .copied()
            .unwrap_or(Action::Cache);
        let action = self.attribution.attribute(sampled, outcome);
        self.table.update(key, action, self.params.alpha, reward);
        action
    }

    /// Scale every score in the table by the decay rate
    pub fn decay_all(&mut self) {
        self.table.decay_all(self.params.decay_rate);
    }

    pub fn reward_for(&self, outcome: Outcome) -> f64 {
        self.params.rewards.reward_for(outcome)
    }

    pub fn q_value(&self, key: &CacheKey, action: Action) -> f64 {
        self.table.get(key, action)
    }

    pub fn set_q_value(&mut self, key: &CacheKey, action: Action, value: f64) {
        self.table.set(key, action, value);
    }

    pub fn access_count(&self, key: &CacheKey) -> u64 {
        self.access.count(key)
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn params(&self) -> &PolicyParameters {
        &self.params
    }

    pub fn tiers(&self) -> &TierManager<V> {
        &self.tiers
    }

    pub fn attribution_name(&self) -> &'static str {
        self.attribution.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::second_tier::MemorySecondTier;
    use crate::core::types::QueryTemplate;

    fn key(id: i64) -> CacheKey {
        CacheKey::new(QueryTemplate::RunningTotalSalesProduct, vec![id.into()])
    }

    async fn engine(params: PolicyParameters) -> PolicyEngine<String> {
        let tiers = TierManager::open(4, 8, Arc::new(MemorySecondTier::new()))
            .await
            .unwrap();
        PolicyEngine::new(params, tiers, Some(7)).unwrap()
    }

    fn greedy() -> PolicyParameters {
        PolicyParameters {
            epsilon: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(PolicyParameters::default().validate().is_ok());

        let bad = PolicyParameters {
            epsilon: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(TierCacheError::InvalidConfig(_))));

        let bad = PolicyParameters {
            decay_rate: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_reward_schedule() {
        let rewards = RewardSchedule::default();
        assert_eq!(rewards.reward_for(Outcome::Hit(Tier::Fast)), 7.0);
        assert_eq!(rewards.reward_for(Outcome::Hit(Tier::Second)), 4.0);
        assert_eq!(rewards.reward_for(Outcome::Miss), -3.0);
    }

    #[tokio::test]
    async fn test_unseen_key_chooses_cache() {
        let mut engine = engine(greedy()).await;
        for id in 0..50 {
            assert_eq!(engine.choose_action(&key(id)), Action::Cache);
        }
    }

    fn exploring() -> PolicyParameters {
        PolicyParameters {
            epsilon: 1.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exploration_ignores_table() {
        let mut engine = engine(exploring()).await;
        engine.set_q_value(&key(1), Action::Cache, 100.0);

        let evicts = (0..1000)
            .filter(|_| engine.choose_action(&key(1)) == Action::Evict)
            .count();
        assert!((400..=600).contains(&evicts), "{} evicts out of 1000", evicts);
    }

    #[tokio::test]
    async fn test_explored_evict_skips_resident_key() {
        let mut engine = engine(exploring()).await;
        engine.insert(key(1), "rows".into()).await;
        engine.set_q_value(&key(1), Action::Cache, 100.0);

        let mut evicted = 0;
        let mut fast_hits = 0;
        for _ in 0..50 {
            let lookup = engine.lookup(&key(1)).await;
            match lookup.action {
                Action::Evict => {
                    assert_eq!(lookup.value, None);
                    assert_eq!(lookup.tier, None);
                    evicted += 1;
                }
                Action::Cache => {
                    assert_eq!(lookup.tier, Some(Tier::Fast));
                    fast_hits += 1;
                }
            }
        }
        assert!(evicted > 0 && fast_hits > 0);
        assert!(engine.tiers().fast().contains(&key(1)));
    }

    #[tokio::test]
    async fn test_evict_action_skips_tiers() {
        let mut engine = engine(greedy()).await;
        engine.insert(key(1), "rows".into()).await;
        engine.set_q_value(&key(1), Action::Evict, 1.0);

        let lookup = engine.lookup(&key(1)).await;
        assert_eq!(lookup.action, Action::Evict);
        assert_eq!(lookup.value, None);
        assert_eq!(lookup.tier, None);
        assert_eq!(engine.access_count(&key(1)), 1);
    }

    #[tokio::test]
    async fn test_fast_hit_after_insert() {
        let mut engine = engine(greedy()).await;
        engine.insert(key(1), "rows".into()).await;

        let lookup = engine.lookup(&key(1)).await;
        assert_eq!(lookup.value.as_deref(), Some("rows"));
        assert_eq!(lookup.tier, Some(Tier::Fast));
        assert_eq!(lookup.outcome(), Outcome::Hit(Tier::Fast));
    }

    #[tokio::test]
    async fn test_miss_recorded_as_evict() {
        let mut engine = engine(greedy()).await;

        let lookup = engine.lookup(&key(9)).await;
        assert_eq!(lookup.action, Action::Cache);
        assert!(!lookup.is_hit());

        let credited = engine.record_outcome(&key(9), lookup.outcome(), -3.0);
        assert_eq!(credited, Action::Evict);
        assert!((engine.q_value(&key(9), Action::Evict) - (-0.9)).abs() < 1e-12);
        assert_eq!(engine.q_value(&key(9), Action::Cache), 0.0);
    }

    #[tokio::test]
    async fn test_sampled_attribution_credits_cache_on_miss() {
        let mut engine = engine(greedy())
            .await
            .with_attribution(Arc::new(SampledActionAttribution));

        let lookup = engine.lookup(&key(9)).await;
        let credited = engine.record_outcome(&key(9), lookup.outcome(), -3.0);
        assert_eq!(credited, Action::Cache);
        assert_eq!(engine.attribution_name(), "sampled");
    }

    #[tokio::test]
    async fn test_decay_all_is_global() {
        let mut engine = engine(greedy()).await;
        engine.set_q_value(&key(1), Action::Cache, 4.0);
        engine.set_q_value(&key(2), Action::Evict, -2.0);

        engine.decay_all();
        engine.decay_all();

        assert!((engine.q_value(&key(1), Action::Cache) - 4.0 * 0.75_f64.powi(2)).abs() < 1e-12);
        assert!((engine.q_value(&key(2), Action::Evict) + 2.0 * 0.75_f64.powi(2)).abs() < 1e-12);
        assert_eq!(engine.table_len(), 2);
    }
}
