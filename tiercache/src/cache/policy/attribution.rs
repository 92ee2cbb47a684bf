//! Reward attribution
//!
//! Decides which action label a reward is credited to, given the action the
//! policy sampled and what the lookup actually produced.

use serde::{Deserialize, Serialize};

use crate::core::types::{Action, Tier};

/// What a lookup produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit(Tier),
    Miss,
}

impl Outcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Outcome::Hit(_))
    }
}

pub trait RewardAttribution: Send + Sync {
    fn attribute(&self, sampled: Action, outcome: Outcome) -> Action;

    fn name(&self) -> &'static str;
}

/// Credits `Cache` on any hit and `Evict` on any miss, regardless of the
/// sampled action. A sampled `Cache` that missed both tiers is recorded as
/// `Evict`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeAttribution;

impl RewardAttribution for OutcomeAttribution {
    fn attribute(&self, _sampled: Action, outcome: Outcome) -> Action {
        if outcome.is_hit() {
            Action::Cache
        } else {
            Action::Evict
        }
    }

    fn name(&self) -> &'static str {
        "outcome"
    }
}

/// Credits the action that was actually sampled
#[derive(Debug, Clone, Copy, Default)]
pub struct SampledActionAttribution;

impl RewardAttribution for SampledActionAttribution {
    fn attribute(&self, sampled: Action, _outcome: Outcome) -> Action {
        sampled
    }

    fn name(&self) -> &'static str {
        "sampled"
    }
}

/// Config-selectable attribution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributionKind {
    #[default]
    Outcome,
    Sampled,
}

impl AttributionKind {
    pub fn build(self) -> std::sync::Arc<dyn RewardAttribution> {
        match self {
            AttributionKind::Outcome => std::sync::Arc::new(OutcomeAttribution),
            AttributionKind::Sampled => std::sync::Arc::new(SampledActionAttribution),
        }
    }
}
