//! Simulated source of record
//!
//! Sleeps for a per-template latency (with jitter) on the tokio timer and
//! returns deterministic synthetic rows derived from the parameters.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error};

use super::{QueryResult, SourceOfRecord, check_arity};
use crate::core::error::{Result, TierCacheError};
use crate::core::types::{Datum, ParamValue, QueryRows, QueryTemplate, Row};

/// Latency model for the simulated source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLatencyConfig {
    /// Base latency per template in milliseconds
    pub base_latency_ms: BTreeMap<QueryTemplate, f64>,
    /// Relative jitter applied around the base, e.g. 0.2 = ±20%
    pub jitter: f64,
}

impl Default for SourceLatencyConfig {
    fn default() -> Self {
        let base_latency_ms = [
            (QueryTemplate::DailySalesProduct, 12.0),
            (QueryTemplate::AvgOrderValueUser, 18.0),
            (QueryTemplate::UsersAlsoBought, 35.0),
            (QueryTemplate::RunningTotalSalesProduct, 15.0),
            (QueryTemplate::TopRatedProductsCategory, 8.0),
            (QueryTemplate::ReviewedAndBought, 40.0),
            (QueryTemplate::ProductsOnPromotionSeason, 20.0),
            (QueryTemplate::OrdersByCityInSeason, 45.0),
        ]
        .into_iter()
        .collect();

        Self {
            base_latency_ms,
            jitter: 0.2,
        }
    }
}

impl SourceLatencyConfig {
    /// Same latency for every template, no jitter
    pub fn uniform(latency_ms: f64) -> Self {
        Self {
            base_latency_ms: QueryTemplate::ALL
                .into_iter()
                .map(|t| (t, latency_ms))
                .collect(),
            jitter: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(TierCacheError::InvalidConfig(format!(
                "source jitter must be within [0, 1), got {}",
                self.jitter
            )));
        }
        if let Some((template, latency)) = self.base_latency_ms.iter().find(|(_, ms)| **ms < 0.0) {
            return Err(TierCacheError::InvalidConfig(format!(
                "negative base latency {} for {}",
                latency, template
            )));
        }
        Ok(())
    }
}

pub struct SimulatedSource {
    config: SourceLatencyConfig,
    rng: Mutex<StdRng>,
    calls: AtomicU64,
    fail_after: Option<u64>,
}

impl SimulatedSource {
    pub fn new(config: SourceLatencyConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
            calls: AtomicU64::new(0),
            fail_after: None,
        }
    }

    /// Make every call after the first `calls` fail as unavailable
    pub fn failing_after(mut self, calls: u64) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn latency_for(&self, template: QueryTemplate) -> Duration {
        let base = self
            .config
            .base_latency_ms
            .get(&template)
            .copied()
            .unwrap_or(10.0);
        let factor = if self.config.jitter > 0.0 {
            let jitter = self.config.jitter;
            1.0 + self.rng.lock().gen_range(-jitter..=jitter)
        } else {
            1.0
        };
        Duration::from_micros(((base * factor).max(0.0) * 1000.0).round() as u64)
    }
}

#[async_trait]
impl SourceOfRecord for SimulatedSource {
    async fn execute(&self, template: QueryTemplate, params: &[ParamValue]) -> Result<QueryResult> {
        check_arity(template, params)?;

        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(limit) = self.fail_after {
            if call > limit {
                error!("Simulated source failing call {} ({})", call, template);
                return Err(TierCacheError::SourceUnavailable(format!(
                    "simulated outage after {} calls",
                    limit
                )));
            }
        }

        let latency = self.latency_for(template);
        tokio::time::sleep(latency).await;
        debug!("Source executed {} in {:?}", template, latency);

        Ok(QueryResult {
            rows: synthesize_rows(template, params),
            elapsed: latency,
        })
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

fn int_param(params: &[ParamValue], index: usize) -> i64 {
    match params.get(index) {
        Some(ParamValue::Int(v)) => *v,
        Some(ParamValue::Text(t)) => (fnv1a(t) % 1000) as i64,
        None => 0,
    }
}

fn text_param(params: &[ParamValue], index: usize) -> String {
    params.get(index).map(|p| p.to_string()).unwrap_or_default()
}

/// Deterministic result set shaped like each template's real output
pub fn synthesize_rows(template: QueryTemplate, params: &[ParamValue]) -> QueryRows {
    let seed = fnv1a(&format!("{}{:?}", template, params));
    let epoch = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default();
    let day = |i: i64| Datum::Date(epoch + ChronoDuration::days(i));

    match template {
        QueryTemplate::DailySalesProduct => (0..7)
            .map(|i| vec![day(i), Datum::Int(((seed >> i) % 40) as i64 + 1)])
            .collect(),
        QueryTemplate::RunningTotalSalesProduct => {
            let mut total = 0i64;
            (0..7)
                .map(|i| {
                    total += ((seed >> (i * 2)) % 25) as i64 + 1;
                    vec![day(i), Datum::Int(total)]
                })
                .collect()
        }
        QueryTemplate::AvgOrderValueUser => {
            vec![vec![Datum::Float(((seed % 50_000) as f64) / 100.0)]]
        }
        QueryTemplate::UsersAlsoBought => {
            let pid = int_param(params, 0);
            (1..=5)
                .map(|i| vec![Datum::Int((pid + i * 37) % 1000 + 1)])
                .collect()
        }
        QueryTemplate::TopRatedProductsCategory => {
            let category = text_param(params, 0);
            (0..5)
                .map(|i| {
                    vec![
                        Datum::Text(format!("{} Model {}", category, (seed >> i) % 90 + 10)),
                        Datum::Float(5.0 - i as f64 * 0.2),
                    ]
                })
                .collect()
        }
        QueryTemplate::ReviewedAndBought => (0..3)
            .map(|i| {
                let user = ((seed >> (i * 3)) % 5000) as i64 + 1;
                vec![Datum::Int(user), Datum::Text(format!("user_{}", user))]
            })
            .collect(),
        QueryTemplate::ProductsOnPromotionSeason => {
            let season = text_param(params, 0);
            (0..4)
                .map(|i| {
                    let pid = ((seed >> i) % 1000) as i64 + 1;
                    vec![
                        Datum::Int(pid),
                        Datum::Text(format!("{} deal {}", season, pid)),
                        Datum::Float(((seed >> (i + 8)) % 200_000) as f64 / 100.0),
                    ]
                })
                .collect()
        }
        QueryTemplate::OrdersByCityInSeason => (0..6)
            .map(|i| -> Row {
                vec![
                    Datum::Int(((seed >> i) % 50_000) as i64 + 1),
                    Datum::Int(((seed >> (i + 4)) % 5000) as i64 + 1),
                    Datum::Int(int_param(params, 1) % 1000 + 1),
                    Datum::Int((i % 4) + 1),
                    day(i),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_is_reported() {
        let source = SimulatedSource::new(SourceLatencyConfig::uniform(25.0), Some(1));

        let start = tokio::time::Instant::now();
        let result = source
            .execute(QueryTemplate::DailySalesProduct, &[ParamValue::Int(2)])
            .await
            .unwrap();

        assert_eq!(result.elapsed, Duration::from_millis(25));
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(result.rows.len(), 7);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arity_mismatch_rejected() {
        let source = SimulatedSource::new(SourceLatencyConfig::uniform(1.0), Some(1));
        let result = source
            .execute(QueryTemplate::OrdersByCityInSeason, &["Delhi".into()])
            .await;
        assert!(matches!(result, Err(TierCacheError::InvalidQuery(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_after_limit() {
        let source =
            SimulatedSource::new(SourceLatencyConfig::uniform(1.0), Some(1)).failing_after(2);
        let params = [ParamValue::Int(1)];

        assert!(source.execute(QueryTemplate::UsersAlsoBought, &params).await.is_ok());
        assert!(source.execute(QueryTemplate::UsersAlsoBought, &params).await.is_ok());
        let third = source.execute(QueryTemplate::UsersAlsoBought, &params).await;
        assert!(matches!(third, Err(TierCacheError::SourceUnavailable(_))));
    }

    #[test]
    fn test_rows_are_deterministic() {
        let params = [ParamValue::from("Delhi"), ParamValue::from("College Start")];
        let a = synthesize_rows(QueryTemplate::OrdersByCityInSeason, &params);
        let b = synthesize_rows(QueryTemplate::OrdersByCityInSeason, &params);
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_latency_config_validation() {
        assert!(SourceLatencyConfig::default().validate().is_ok());
        let mut bad = SourceLatencyConfig::default();
        bad.jitter = 1.5;
        assert!(bad.validate().is_err());
    }
}
