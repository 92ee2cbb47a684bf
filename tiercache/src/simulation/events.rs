//! Events emitted by a simulation run to its reporter channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::cache::TierStats;
use crate::core::types::{RunMode, Tier};

/// Cumulative count of queries served per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierHits {
    pub fast: u64,
    pub second: u64,
    pub source: u64,
}

impl TierHits {
    pub fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Fast => self.fast += 1,
            Tier::Second => self.second += 1,
            Tier::Source => self.source += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.fast + self.second + self.source
    }

    /// Share of queries answered without the source
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.fast + self.second) as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub iteration: u64,
    pub rolling_avg_latency_ms: f64,
    pub tier_hits: TierHits,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateStats {
    pub count: u64,
    pub total_latency_ms: f64,
    pub avg_latency_ms: f64,
}

/// Aggregate result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub label: String,
    pub mode: RunMode,
    pub total_iterations: u64,
    pub total_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub tier_hits: TierHits,
    /// Keyed by template name; every catalog template is present
    pub per_template: BTreeMap<String, TemplateStats>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_stats: Option<TierStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_table_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Progress(ProgressEvent),
    Summary(RunSummary),
    Failed { label: String, error: String },
    /// Terminal marker: nothing else follows for this run
    Done { label: String },
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Done { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            RunEvent::Progress(p) => &p.label,
            RunEvent::Summary(s) => &s.label,
            RunEvent::Failed { label, .. } | RunEvent::Done { label } => label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_hits_record() {
        let mut hits = TierHits::default();
        hits.record(Tier::Fast);
        hits.record(Tier::Fast);
        hits.record(Tier::Second);
        hits.record(Tier::Source);

        assert_eq!(hits.total(), 4);
        assert_eq!(hits.hit_rate(), 0.75);
    }

    #[test]
    fn test_event_json_shape() {
        let event = RunEvent::Progress(ProgressEvent {
            iteration: 10,
            rolling_avg_latency_ms: 12.5,
            tier_hits: TierHits {
                fast: 3,
                second: 2,
                source: 5,
            },
            label: "cached".into(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["iteration"], 10);
        assert_eq!(json["tier_hits"]["fast"], 3);

        let done = serde_json::to_value(RunEvent::Done {
            label: "cached".into(),
        })
        .unwrap();
        assert_eq!(done["type"], "done");
        assert!(RunEvent::Done { label: "x".into() }.is_terminal());
    }
}
