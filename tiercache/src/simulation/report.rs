//! Side-by-side comparison of a cached run against the baseline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::events::RunSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateComparison {
    pub baseline_avg_ms: f64,
    pub cached_avg_ms: f64,
    pub speedup_factor: f64,
    pub improvement_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub cached: RunSummary,
    pub baseline: RunSummary,
    pub time_saved_ms: f64,
    /// Baseline average over cached average; 0 when the cached average is 0
    pub speedup_factor: f64,
    pub improvement_pct: f64,
    pub per_template: BTreeMap<String, TemplateComparison>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl ComparisonReport {
    pub fn new(cached: RunSummary, baseline: RunSummary) -> Self {
        let time_saved_ms = baseline.total_latency_ms - cached.total_latency_ms;

        let per_template = cached
            .per_template
            .iter()
            .map(|(name, stats)| {
                let baseline_avg_ms = baseline
                    .per_template
                    .get(name)
                    .map(|s| s.avg_latency_ms)
                    .unwrap_or(0.0);
                let comparison = TemplateComparison {
                    baseline_avg_ms,
                    cached_avg_ms: stats.avg_latency_ms,
                    speedup_factor: ratio(baseline_avg_ms, stats.avg_latency_ms),
                    improvement_pct: ratio(baseline_avg_ms - stats.avg_latency_ms, baseline_avg_ms)
                        * 100.0,
                };
                (name.clone(), comparison)
            })
            .collect();

        Self {
            speedup_factor: ratio(baseline.avg_latency_ms, cached.avg_latency_ms),
            improvement_pct: ratio(time_saved_ms, baseline.total_latency_ms) * 100.0,
            time_saved_ms,
            per_template,
            cached,
            baseline,
        }
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, summary: &RunSummary) -> fmt::Result {
    writeln!(f, "{}", summary.label)?;
    writeln!(f, "  Total queries run: {}", summary.total_iterations)?;
    writeln!(f, "  Total time taken: {:.2} ms", summary.total_latency_ms)?;
    writeln!(f, "  Average query time: {:.2} ms", summary.avg_latency_ms)?;
    writeln!(
        f,
        "  Served by tier: fast={} second={} source={}",
        summary.tier_hits.fast, summary.tier_hits.second, summary.tier_hits.source
    )?;
    for (name, stats) in &summary.per_template {
        writeln!(
            f,
            "  - {}: {} queries, avg time {:.2} ms",
            name, stats.count, stats.avg_latency_ms
        )?;
    }
    writeln!(f)
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Simulation Summary ---")?;
        writeln!(f)?;
        write_summary(f, &self.cached)?;
        write_summary(f, &self.baseline)?;

        writeln!(f, "--- Performance Comparison ---")?;
        writeln!(f)?;
        writeln!(f, "Total time saved: {:.2} ms", self.time_saved_ms)?;
        writeln!(f, "Overall speedup factor: {:.2}x faster", self.speedup_factor)?;
        writeln!(
            f,
            "Overall performance improvement: {:.2}% faster on average",
            self.improvement_pct
        )?;
        writeln!(f)?;
        writeln!(f, "Per-query type improvement:")?;
        for (name, cmp) in &self.per_template {
            writeln!(f, "  - {}:", name)?;
            writeln!(f, "      Avg time without cache: {:.2} ms", cmp.baseline_avg_ms)?;
            writeln!(f, "      Avg time with cache: {:.2} ms", cmp.cached_avg_ms)?;
            writeln!(f, "      Speedup factor: {:.2}x", cmp.speedup_factor)?;
            writeln!(f, "      Improvement: {:.2}%", cmp.improvement_pct)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{QueryTemplate, RunMode, Tier};
    use crate::simulation::recorder::{IterationMetric, LatencyRecorder};
    use chrono::Utc;
    use uuid::Uuid;

    fn summary(label: &str, mode: RunMode, samples: &[(QueryTemplate, Tier, f64)]) -> RunSummary {
        let mut recorder = LatencyRecorder::new();
        for &(template, tier, latency_ms) in samples {
            recorder.record(IterationMetric {
                template,
                tier,
                latency_ms,
            });
        }
        recorder.summary(Uuid::new_v4(), label, mode, Utc::now())
    }

    #[test]
    fn test_overall_figures() {
        let cached = summary(
            "cached",
            RunMode::Cached,
            &[
                (QueryTemplate::DailySalesProduct, Tier::Fast, 1.0),
                (QueryTemplate::DailySalesProduct, Tier::Source, 9.0),
            ],
        );
        let baseline = summary(
            "baseline",
            RunMode::Baseline,
            &[
                (QueryTemplate::DailySalesProduct, Tier::Source, 10.0),
                (QueryTemplate::DailySalesProduct, Tier::Source, 10.0),
            ],
        );

        let report = ComparisonReport::new(cached, baseline);
        assert_eq!(report.time_saved_ms, 10.0);
        assert_eq!(report.speedup_factor, 2.0);
        assert_eq!(report.improvement_pct, 50.0);

        let daily = &report.per_template["daily_sales_product"];
        assert_eq!(daily.baseline_avg_ms, 10.0);
        assert_eq!(daily.cached_avg_ms, 5.0);
        assert_eq!(daily.speedup_factor, 2.0);

        // Templates never drawn compare as zero instead of dividing by zero
        let unused = &report.per_template["reviewed_and_bought"];
        assert_eq!(unused.speedup_factor, 0.0);
        assert_eq!(unused.improvement_pct, 0.0);
    }

    #[test]
    fn test_text_rendering() {
        let cached = summary(
            "With cache",
            RunMode::Cached,
            &[(QueryTemplate::UsersAlsoBought, Tier::Fast, 0.5)],
        );
        let baseline = summary(
            "Without cache",
            RunMode::Baseline,
            &[(QueryTemplate::UsersAlsoBought, Tier::Source, 35.0)],
        );

        let text = ComparisonReport::new(cached, baseline).to_string();
        assert!(text.contains("With cache"));
        assert!(text.contains("Without cache"));
        assert!(text.contains("Overall speedup factor: 70.00x faster"));
        assert!(text.contains("Total time saved: 34.50 ms"));
        assert!(text.contains("  - users_also_bought:"));
    }
}
