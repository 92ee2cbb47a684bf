//! Synthetic Workload
//!
//! Produces an endless stream of (template, parameters) pairs with a skewed,
//! bursty shape. Each draw goes through three regimes in order:
//! - Burst (10%): a narrow spike on products, categories or seasons
//! - Hot (60% of the rest): weighted template choice with pinned parameters
//! - Cold: uniform template choice with default parameters

use lazy_static::lazy_static;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub mod catalog;

use crate::core::types::{CacheKey, ParamValue, QueryTemplate};
use catalog::{BURST_CATEGORIES, BURST_SEASONS, HOT_WEIGHTS, PRODUCT_IDS};

pub const BURST_PROBABILITY: f64 = 0.10;
pub const HOT_PROBABILITY: f64 = 0.60;

lazy_static! {
    /// Template picker for the hot regime, indexed like `QueryTemplate::ALL`
    static ref HOT_INDEX: WeightedIndex<f64> = WeightedIndex::new(HOT_WEIGHTS).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Burst,
    Hot,
    Cold,
}

/// One generated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadQuery {
    pub template: QueryTemplate,
    pub params: Vec<ParamValue>,
    pub regime: Regime,
}

impl WorkloadQuery {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.template, self.params.clone())
    }
}

pub struct WorkloadGenerator {
    rng: StdRng,
    seed: Option<u64>,
}

impl WorkloadGenerator {
    /// Generator seeded from `seed`, or from entropy when `None`
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Self::make_rng(seed),
            seed,
        }
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Rewind to the start of the sequence (a fresh draw when unseeded)
    pub fn restart(&mut self) {
        self.rng = Self::make_rng(self.seed);
    }

    pub fn next_query(&mut self) -> WorkloadQuery {
        if self.rng.gen_bool(BURST_PROBABILITY) {
            return self.burst();
        }

        if self.rng.gen_bool(HOT_PROBABILITY) {
            let template = QueryTemplate::ALL[HOT_INDEX.sample(&mut self.rng)];
            let params = catalog::hot_params(template, &mut self.rng)
                .unwrap_or_else(|| catalog::default_params(template, &mut self.rng));
            return WorkloadQuery {
                template,
                params,
                regime: Regime::Hot,
            };
        }

        let template = QueryTemplate::ALL[self.rng.gen_range(0..QueryTemplate::ALL.len())];
        WorkloadQuery {
            template,
            params: catalog::default_params(template, &mut self.rng),
            regime: Regime::Cold,
        }
    }

    fn burst(&mut self) -> WorkloadQuery {
        let (template, param) = match self.rng.gen_range(0..3) {
            0 => {
                let span = (PRODUCT_IDS.end() - PRODUCT_IDS.start() + 1) as usize;
                let sampled = rand::seq::index::sample(&mut self.rng, span, 3).into_vec();
                let offset = sampled[self.rng.gen_range(0..sampled.len())] as i64;
                (
                    QueryTemplate::DailySalesProduct,
                    ParamValue::Int(PRODUCT_IDS.start() + offset),
                )
            }
            1 => (
                QueryTemplate::TopRatedProductsCategory,
                ParamValue::from(*BURST_CATEGORIES.choose(&mut self.rng).unwrap_or(&"Laptops")),
            ),
            _ => (
                QueryTemplate::ProductsOnPromotionSeason,
                ParamValue::from(*BURST_SEASONS.choose(&mut self.rng).unwrap_or(&"Holiday Sale")),
            ),
        };

        WorkloadQuery {
            template,
            params: vec![param],
            regime: Regime::Burst,
        }
    }
}

impl Iterator for WorkloadGenerator {
    type Item = WorkloadQuery;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_query())
    }
}
