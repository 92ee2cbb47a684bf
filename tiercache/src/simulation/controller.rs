//! Simulation Controller
//!
//! Owns the lifecycle of one comparison: a cached run and a baseline run
//! started together on the tokio runtime. Only one comparison may be in
//! flight at a time.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::events::{RunEvent, RunSummary};
use super::harness::SimulationHarness;
use super::report::ComparisonReport;
use crate::cache::{PolicyEngine, SecondTierStore, TierManager};
use crate::config::SimulationConfig;
use crate::core::error::{Result, TierCacheError};
use crate::core::types::{QueryRows, RunMode};
use crate::source::SourceOfRecord;
use crate::workload::WorkloadGenerator;

pub const CACHED_LABEL: &str = "With RL-based Multi-level Cache";
pub const BASELINE_LABEL: &str = "Without Cache (Baseline)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed(String),
}

/// Source of record for each run; the runs never share one
pub struct RunSources {
    pub cached: Arc<dyn SourceOfRecord>,
    pub baseline: Arc<dyn SourceOfRecord>,
}

impl RunSources {
    pub fn new(cached: Arc<dyn SourceOfRecord>, baseline: Arc<dyn SourceOfRecord>) -> Self {
        Self { cached, baseline }
    }
}

/// Event streams for the two runs of one comparison
pub struct RunStreams {
    pub cached: UnboundedReceiver<RunEvent>,
    pub baseline: UnboundedReceiver<RunEvent>,
}

#[derive(Debug)]
struct ControllerState {
    status: RunStatus,
    report: Option<ComparisonReport>,
}

pub struct SimulationController {
    config: SimulationConfig,
    state: Arc<RwLock<ControllerState>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationController {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ControllerState {
                status: RunStatus::Idle,
                report: None,
            })),
            join: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Start the cached and baseline runs concurrently
    pub async fn start(
        &self,
        sources: RunSources,
        second_tier: Arc<dyn SecondTierStore>,
    ) -> Result<RunStreams> {
        {
            let mut state = self.state.write();
            if state.status == RunStatus::Running {
                warn!("Rejected start: a comparison is already running");
                return Err(TierCacheError::RunInProgress);
            }
            state.status = RunStatus::Running;
            state.report = None;
        }

        match self.spawn_runs(sources, second_tier).await {
            Ok(streams) => Ok(streams),
            Err(e) => {
                error!("Failed to start comparison: {}", e);
                self.state.write().status = RunStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn spawn_runs(
        &self,
        sources: RunSources,
        second_tier: Arc<dyn SecondTierStore>,
    ) -> Result<RunStreams> {
        self.config.validate()?;

        let run_config = self.config.to_run_config();
        let seed = self.config.run.seed;

        let tiers = TierManager::<QueryRows>::open(
            self.config.cache.fast_capacity,
            self.config.cache.second_capacity,
            second_tier,
        )
        .await?;
        let engine = PolicyEngine::new(
            self.config.to_policy_parameters(),
            tiers,
            seed.map(|s| s.wrapping_add(2)),
        )?
        .with_attribution(self.config.policy.attribution.build());

        info!(
            "Starting comparison: iterations={} seed={:?} attribution={}",
            self.config.run.iterations,
            seed,
            engine.attribution_name()
        );

        let (cached_tx, cached_rx) = mpsc::unbounded_channel();
        let (baseline_tx, baseline_rx) = mpsc::unbounded_channel();

        let cached = SimulationHarness::new(
            CACHED_LABEL,
            RunMode::Cached,
            run_config.clone(),
            WorkloadGenerator::new(seed),
            sources.cached,
            Some(engine),
            cached_tx.clone(),
        )?;
        let baseline = SimulationHarness::new(
            BASELINE_LABEL,
            RunMode::Baseline,
            run_config,
            WorkloadGenerator::new(seed.map(|s| s.wrapping_add(1))),
            sources.baseline,
            None,
            baseline_tx.clone(),
        )?;

        let mut cached_task = tokio::spawn(cached.run());
        let mut baseline_task = tokio::spawn(baseline.run());

        let state = self.state.clone();
        let join = tokio::spawn(async move {
            // A fatal failure in either run ends the comparison at once
            let outcome = tokio::select! {
                joined = &mut cached_task => match settle(joined) {
                    Ok(cached) => settle(baseline_task.await).map(|b| (cached, b)),
                    Err(e) => {
                        fail(&state, &e);
                        cancel(baseline_task, &baseline_tx, BASELINE_LABEL, CACHED_LABEL).await;
                        Err(e)
                    }
                },
                joined = &mut baseline_task => match settle(joined) {
                    Ok(baseline) => settle(cached_task.await).map(|c| (c, baseline)),
                    Err(e) => {
                        fail(&state, &e);
                        cancel(cached_task, &cached_tx, CACHED_LABEL, BASELINE_LABEL).await;
                        Err(e)
                    }
                },
            };

            let mut state = state.write();
            match outcome {
                Ok((cached, baseline)) => {
                    let report = ComparisonReport::new(cached, baseline);
                    info!(
                        "Comparison completed: speedup={:.2}x improvement={:.2}%",
                        report.speedup_factor, report.improvement_pct
                    );
                    state.report = Some(report);
                    state.status = RunStatus::Completed;
                }
                Err(e) => {
                    error!("Comparison failed: {}", e);
                    state.status = RunStatus::Failed(e);
                }
            }
        });
        *self.join.lock() = Some(join);

        Ok(RunStreams {
            cached: cached_rx,
            baseline: baseline_rx,
        })
    }

    pub fn poll(&self) -> RunStatus {
        self.state.read().status.clone()
    }

    /// Comparison of the last completed pair of runs
    pub fn result(&self) -> Option<ComparisonReport> {
        self.state.read().report.clone()
    }

    /// Wait for the current comparison to finish and return its report
    pub async fn wait(&self) -> Option<ComparisonReport> {
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Comparison join task aborted: {}", e);
                self.state.write().status = RunStatus::Failed(e.to_string());
            }
        }
        self.result()
    }
}

fn fail(state: &RwLock<ControllerState>, reason: &str) {
    state.write().status = RunStatus::Failed(reason.to_string());
}

/// Abort the surviving run and close its stream with a failure marker
async fn cancel(
    task: JoinHandle<Result<RunSummary>>,
    events: &UnboundedSender<RunEvent>,
    label: &str,
    failed_label: &str,
) {
    task.abort();
    // A run that finished before the abort landed has already closed its stream
    if let Err(e) = task.await {
        if e.is_cancelled() {
            warn!("Cancelled run '{}' after '{}' failed", label, failed_label);
            let _ = events.send(RunEvent::Failed {
                label: label.to_string(),
                error: format!("cancelled: run '{}' failed", failed_label),
            });
            let _ = events.send(RunEvent::Done {
                label: label.to_string(),
            });
        }
    }
}

fn settle(
    joined: std::result::Result<Result<RunSummary>, tokio::task::JoinError>,
) -> std::result::Result<RunSummary, String> {
    match joined {
        Ok(Ok(summary)) => Ok(summary),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("run task panicked: {}", e)),
    }
}
