pub mod cache;
pub mod config;
pub mod core;
pub mod metrics;
pub mod simulation;
pub mod source;
pub mod workload;

// Re-export commonly used types
pub use cache::{
    AttributionKind, FastTier, Lookup, MemorySecondTier, Outcome, Payload, PolicyEngine,
    PolicyParameters, RewardAttribution, RewardSchedule, SecondTierStore, TierManager, TierStats,
};
#[cfg(feature = "redis-tier")]
pub use cache::RedisSecondTier;
pub use config::SimulationConfig;
pub use core::{
    Action, CacheKey, Datum, ParamValue, QueryRows, QueryTemplate, Result, Row, RunMode, Tier,
    TierCacheError,
};
pub use metrics::{encode_metrics, init_metrics};
pub use simulation::{
    ComparisonReport, RunConfig, RunEvent, RunSources, RunStatus, RunStreams, RunSummary,
    SimulationController, SimulationHarness, TierHits,
};
pub use source::{QueryResult, SimulatedSource, SourceLatencyConfig, SourceOfRecord};
pub use workload::{Regime, WorkloadGenerator, WorkloadQuery};
