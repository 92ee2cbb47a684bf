//! Simulation
//!
//! Runs the same kind of workload with and without the learned cache and
//! compares the two.

pub mod controller;
pub mod events;
pub mod harness;
pub mod recorder;
pub mod report;

pub use controller::{
    BASELINE_LABEL, CACHED_LABEL, RunSources, RunStatus, RunStreams, SimulationController,
};
pub use events::{ProgressEvent, RunEvent, RunSummary, TemplateStats, TierHits};
pub use harness::{RunConfig, SimulationHarness};
pub use recorder::{IterationMetric, LatencyRecorder};
pub use report::{ComparisonReport, TemplateComparison};
