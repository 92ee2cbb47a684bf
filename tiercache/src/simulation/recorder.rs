//! Per-iteration latency bookkeeping for a single run

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::events::{RunSummary, TemplateStats, TierHits};
use crate::core::types::{QueryTemplate, RunMode, Tier};

/// One processed query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationMetric {
    pub template: QueryTemplate,
    pub tier: Tier,
    pub latency_ms: f64,
}

#[derive(Debug)]
pub struct LatencyRecorder {
    samples: BTreeMap<QueryTemplate, Vec<f64>>,
    hits: TierHits,
    iterations: u64,
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self {
            samples: QueryTemplate::ALL.into_iter().map(|t| (t, Vec::new())).collect(),
            hits: TierHits::default(),
            iterations: 0,
        }
    }

    pub fn record(&mut self, metric: IterationMetric) {
        self.samples
            .entry(metric.template)
            .or_default()
            .push(metric.latency_ms);
        self.hits.record(metric.tier);
        self.iterations += 1;
    }

    /// Mean over each template's most recent `window` samples, pooled
    pub fn rolling_average(&self, window: usize) -> f64 {
        let (sum, count) = self
            .samples
            .values()
            .flat_map(|samples| &samples[samples.len().saturating_sub(window)..])
            .fold((0.0, 0usize), |(sum, count), ms| (sum + ms, count + 1));

        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    pub fn total_latency_ms(&self) -> f64 {
        self.samples.values().map(|s| s.iter().sum::<f64>()).sum()
    }

    pub fn hits(&self) -> TierHits {
        self.hits
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn summary(
        &self,
        run_id: Uuid,
        label: &str,
        mode: RunMode,
        started_at: DateTime<Utc>,
    ) -> RunSummary {
        let per_template = self
            .samples
            .iter()
            .map(|(template, samples)| {
                let total: f64 = samples.iter().sum();
                let count = samples.len() as u64;
                let stats = TemplateStats {
                    count,
                    total_latency_ms: total,
                    avg_latency_ms: if count == 0 { 0.0 } else { total / count as f64 },
                };
                (template.as_str().to_string(), stats)
            })
            .collect();

        let total = self.total_latency_ms();
        RunSummary {
            run_id,
            label: label.to_string(),
            mode,
            total_iterations: self.iterations,
            total_latency_ms: total,
            avg_latency_ms: if self.iterations == 0 {
                0.0
            } else {
                total / self.iterations as f64
            },
            tier_hits: self.hits,
            per_template,
            started_at,
            finished_at: Utc::now(),
            tier_stats: None,
            policy_table_size: None,
        }
    }
}
