//! Prometheus Metrics for tiercache
//!
//! Per-run counters for the simulator:
//! - Lookups served by each tier
//! - End-to-end query latency per template
//! - Size of the learned action-value table

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge_vec,
};

use crate::core::types::{QueryTemplate, RunMode, Tier};

lazy_static! {
    /// Queries answered, by run and serving tier (fast, second, source)
    pub static ref TIER_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_tier_lookups_total",
        "Total number of queries answered by each tier",
        &["run", "tier"]
    ).unwrap();

    /// Query latency in seconds, as measured by the harness
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "tiercache_query_duration_seconds",
        "Query latency in seconds",
        &["run", "template"],
        vec![0.0001, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 1.0]
    ).unwrap();

    /// Keys tracked by the policy
    pub static ref POLICY_TABLE_SIZE: IntGaugeVec = register_int_gauge_vec!(
        "tiercache_policy_table_size",
        "Number of keys in the action-value table",
        &["run"]
    ).unwrap();
}

/// Force registration so the first scrape lists every family
pub fn init_metrics() {
    lazy_static::initialize(&TIER_LOOKUPS_TOTAL);
    lazy_static::initialize(&QUERY_DURATION);
    lazy_static::initialize(&POLICY_TABLE_SIZE);
}

/// Encode all registered metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one processed query
pub fn record_query(mode: RunMode, tier: Tier, template: QueryTemplate, duration_secs: f64) {
    TIER_LOOKUPS_TOTAL
        .with_label_values(&[mode.as_str(), tier.as_str()])
        .inc();
    QUERY_DURATION
        .with_label_values(&[mode.as_str(), template.as_str()])
        .observe(duration_secs);
}

pub fn update_policy_table_size(mode: RunMode, size: usize) {
    POLICY_TABLE_SIZE
        .with_label_values(&[mode.as_str()])
        .set(size as i64);
}
