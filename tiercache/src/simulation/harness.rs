//! Simulation Harness
//!
//! Drives one run: draws queries from the workload, serves them through the
//! policy engine (cached mode) or straight from the source (baseline mode),
//! times each one and streams progress to the reporter channel.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::events::{ProgressEvent, RunEvent, RunSummary};
use super::recorder::{IterationMetric, LatencyRecorder};
use crate::cache::{Outcome, PolicyEngine};
use crate::core::error::{Result, TierCacheError};
use crate::core::types::{CacheKey, QueryRows, RunMode, Tier};
use crate::metrics;
use crate::source::SourceOfRecord;
use crate::workload::WorkloadGenerator;

/// Loop settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub iterations: u64,
    /// Emit a progress event every this many iterations
    pub report_interval: u64,
    /// Sleep between iterations, excluded from the measured latency
    pub pause_between: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            report_interval: 10,
            pause_between: Duration::from_millis(1),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(TierCacheError::InvalidConfig(
                "iterations must be greater than zero".to_string(),
            ));
        }
        if self.report_interval == 0 {
            return Err(TierCacheError::InvalidConfig(
                "report_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct SimulationHarness {
    label: String,
    mode: RunMode,
    config: RunConfig,
    workload: WorkloadGenerator,
    source: Arc<dyn SourceOfRecord>,
    engine: Option<PolicyEngine<QueryRows>>,
    events: UnboundedSender<RunEvent>,
    recorder: LatencyRecorder,
}

impl SimulationHarness {
    /// A cached run needs an engine; a baseline run must not have one
    pub fn new(
        label: impl Into<String>,
        mode: RunMode,
        config: RunConfig,
        workload: WorkloadGenerator,
        source: Arc<dyn SourceOfRecord>,
        engine: Option<PolicyEngine<QueryRows>>,
        events: UnboundedSender<RunEvent>,
    ) -> Result<Self> {
        config.validate()?;
        match (mode, engine.is_some()) {
            (RunMode::Cached, false) => {
                return Err(TierCacheError::InvalidConfig(
                    "cached run requires a policy engine".to_string(),
                ));
            }
            (RunMode::Baseline, true) => {
                return Err(TierCacheError::InvalidConfig(
                    "baseline run must not use a policy engine".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            label: label.into(),
            mode,
            config,
            workload,
            source,
            engine,
            events,
            recorder: LatencyRecorder::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run every iteration, then emit the summary and the terminal event
    pub async fn run(mut self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting run '{}' ({}) id={} iterations={}",
            self.label,
            self.mode.as_str(),
            run_id,
            self.config.iterations
        );

        if let Err(e) = self.run_iterations().await {
            error!(
                "Run '{}' failed after {} iterations: {} (fatal={})",
                self.label,
                self.recorder.iterations(),
                e,
                e.is_fatal()
            );
            self.emit(RunEvent::Failed {
                label: self.label.clone(),
                error: e.to_string(),
            });
            self.emit(RunEvent::Done {
                label: self.label.clone(),
            });
            return Err(e);
        }

        let mut summary = self
            .recorder
            .summary(run_id, &self.label, self.mode, started_at);
        if let Some(engine) = &self.engine {
            summary.tier_stats = Some(engine.tiers().stats().clone());
            summary.policy_table_size = Some(engine.table_len());
            metrics::update_policy_table_size(self.mode, engine.table_len());
        }

        info!(
            "Run '{}' finished: avg={:.3}ms total={:.1}ms hits fast={} second={} source={}",
            self.label,
            summary.avg_latency_ms,
            summary.total_latency_ms,
            summary.tier_hits.fast,
            summary.tier_hits.second,
            summary.tier_hits.source
        );

        self.emit(RunEvent::Summary(summary.clone()));
        self.emit(RunEvent::Done {
            label: self.label.clone(),
        });
        Ok(summary)
    }

    async fn run_iterations(&mut self) -> Result<()> {
        let interval = self.config.report_interval;

        for iteration in 1..=self.config.iterations {
            let query = self.workload.next_query();
            let key = query.cache_key();

            let start = Instant::now();
            let tier = match self.engine.as_mut() {
                Some(engine) => serve_cached(engine, self.source.as_ref(), &key).await?,
                None => {
                    self.source.execute(key.template, &key.params).await?;
                    Tier::Source
                }
            };
            let elapsed = start.elapsed();

            self.recorder.record(IterationMetric {
                template: key.template,
                tier,
                latency_ms: elapsed.as_secs_f64() * 1000.0,
            });
            metrics::record_query(self.mode, tier, key.template, elapsed.as_secs_f64());

            if iteration % interval == 0 {
                if let Some(engine) = &self.engine {
                    metrics::update_policy_table_size(self.mode, engine.table_len());
                }
                self.emit(RunEvent::Progress(ProgressEvent {
                    iteration,
                    rolling_avg_latency_ms: self.recorder.rolling_average(interval as usize),
                    tier_hits: self.recorder.hits(),
                    label: self.label.clone(),
                }));
            }

            if !self.config.pause_between.is_zero() {
                tokio::time::sleep(self.config.pause_between).await;
            }
        }

        Ok(())
    }

    fn emit(&self, event: RunEvent) {
        if self.events.send(event).is_err() {
            debug!("Reporter for '{}' closed, dropping event", self.label);
        }
    }
}

/// One cached iteration: lookup, fetch and insert on a miss, then learn
async fn serve_cached(
    engine: &mut PolicyEngine<QueryRows>,
    source: &dyn SourceOfRecord,
    key: &CacheKey,
) -> Result<Tier> {
    let lookup = engine.lookup(key).await;
    let outcome = lookup.outcome();

    let tier = match outcome {
        Outcome::Hit(tier) => tier,
        Outcome::Miss => {
            let result = source.execute(key.template, &key.params).await?;
            engine.insert(key.clone(), result.rows).await;
            Tier::Source
        }
    };

    let reward = engine.reward_for(outcome);
    engine.record_outcome(key, outcome, reward);
    engine.decay_all();

    Ok(tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySecondTier, PolicyParameters, TierManager};
    use crate::source::{SimulatedSource, SourceLatencyConfig};
    use tokio::sync::mpsc;

    fn quick_config(iterations: u64) -> RunConfig {
        RunConfig {
            iterations,
            report_interval: 10,
            pause_between: Duration::ZERO,
        }
    }

    #[test]
    fn test_run_config_validation() {
        assert!(RunConfig::default().validate().is_ok());
        let mut config = RunConfig::default();
        config.iterations = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_mode_requires_engine() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let source: Arc<dyn SourceOfRecord> =
            Arc::new(SimulatedSource::new(SourceLatencyConfig::uniform(1.0), Some(1)));

        let result = SimulationHarness::new(
            "cached",
            RunMode::Cached,
            quick_config(10),
            WorkloadGenerator::new(Some(1)),
            source,
            None,
            tx,
        );
        assert!(matches!(result, Err(TierCacheError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_every_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source: Arc<dyn SourceOfRecord> =
            Arc::new(SimulatedSource::new(SourceLatencyConfig::uniform(2.0), Some(1)));
        let tiers = TierManager::open(10, 20, Arc::new(MemorySecondTier::new()))
            .await
            .unwrap();
        let engine = PolicyEngine::new(PolicyParameters::default(), tiers, Some(3)).unwrap();

        let harness = SimulationHarness::new(
            "cached",
            RunMode::Cached,
            quick_config(30),
            WorkloadGenerator::new(Some(2)),
            source,
            Some(engine),
            tx,
        )
        .unwrap();
        let summary = harness.run().await.unwrap();

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::Progress(p) = event {
                progress.push(p.iteration);
            }
        }
        assert_eq!(progress, vec![10, 20, 30]);
        assert_eq!(summary.total_iterations, 30);
        assert!(summary.policy_table_size.is_some());
    }
}
