//! Cache Module
//!
//! Two storage tiers behind a learned admission policy:
//! - Fast tier: bounded in-memory map, policy-ranked eviction
//! - Second tier: bounded external key/value store, arbitrary eviction
//! - Policy: tabular Q-learning deciding cache vs. evict per key

pub mod fast_tier;
pub mod payload;
pub mod policy;
#[cfg(feature = "redis-tier")]
pub mod redis_tier;
pub mod second_tier;
pub mod tier_manager;

pub use fast_tier::FastTier;
pub use payload::Payload;
pub use policy::{
    AttributionKind, Lookup, Outcome, OutcomeAttribution, PolicyEngine, PolicyParameters,
    RewardAttribution, RewardSchedule, SampledActionAttribution,
};
#[cfg(feature = "redis-tier")]
pub use redis_tier::RedisSecondTier;
pub use second_tier::{MemorySecondTier, SecondTierStore};
pub use tier_manager::{TierManager, TierStats};
