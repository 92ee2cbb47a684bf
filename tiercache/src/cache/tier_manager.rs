//! Tier Manager
//!
//! Owns the fast tier and the second-tier store and applies each tier's
//! eviction rule on insert:
//! - Fast tier: evict the key the policy values least (see `FastTier`)
//! - Second tier: delete the first key the store enumerates, no ranking

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::fast_tier::FastTier;
use super::payload;
use super::policy::table::{AccessStats, ActionValueTable};
use super::second_tier::SecondTierStore;
use crate::core::error::{Result, TierCacheError};
use crate::core::types::CacheKey;

/// Eviction and promotion counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub fast_evictions: u64,
    pub second_evictions: u64,
    pub promotions: u64,
    pub decode_failures: u64,
    pub store_errors: u64,
}

pub struct TierManager<V> {
    fast: FastTier<V>,
    second: Arc<dyn SecondTierStore>,
    second_capacity: usize,
    stats: TierStats,
}

impl<V> TierManager<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Validate capacities and start from an empty second tier
    pub async fn open(
        fast_capacity: usize,
        second_capacity: usize,
        second: Arc<dyn SecondTierStore>,
    ) -> Result<Self> {
        if fast_capacity == 0 {
            return Err(TierCacheError::InvalidConfig(
                "fast tier capacity must be greater than zero".to_string(),
            ));
        }
        if second_capacity == 0 {
            return Err(TierCacheError::InvalidConfig(
                "second tier capacity must be greater than zero".to_string(),
            ));
        }

        second.flush().await?;

        Ok(Self {
            fast: FastTier::new(fast_capacity),
            second,
            second_capacity,
            stats: TierStats::default(),
        })
    }

    pub fn get_fast(&self, key: &CacheKey) -> Option<V> {
        self.fast.get(key)
    }

    /// Read and decode from the second tier. Store errors and undecodable
    /// payloads read as a miss.
    pub async fn get_second(&mut self, key: &CacheKey) -> Option<V> {
        let bytes = match self.second.get(&key.storage_key()).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!("Second tier read failed for {}: {}", key, e);
                self.stats.store_errors += 1;
                return None;
            }
        };

        match payload::decode_value(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable second tier entry {}: {}", key, e);
                self.stats.decode_failures += 1;
                None
            }
        }
    }

    /// Write through both tiers, or only the fast tier for a promotion
    pub async fn put(
        &mut self,
        key: CacheKey,
        value: V,
        table: &ActionValueTable,
        access: &AccessStats,
        promotion: bool,
    ) {
        if promotion {
            self.stats.promotions += 1;
            debug!("Promoting {} to fast tier", key);
        } else {
            self.put_second(&key, &value).await;
        }
        self.put_fast(key, value, table, access);
    }

    pub fn put_fast(
        &mut self,
        key: CacheKey,
        value: V,
        table: &ActionValueTable,
        access: &AccessStats,
    ) {
        if self.fast.put(key, value, table, access).is_some() {
            self.stats.fast_evictions += 1;
        }
    }

    pub async fn put_second(&mut self, key: &CacheKey, value: &V) {
        if let Err(e) = self.try_put_second(key, value).await {
            warn!("Second tier write failed for {}: {}", key, e);
            self.stats.store_errors += 1;
        }
    }

    async fn try_put_second(&mut self, key: &CacheKey, value: &V) -> Result<()> {
        if self.second.size().await? >= self.second_capacity {
            let keys = self.second.keys().await?;
            if let Some(victim) = keys.first() {
                self.second.delete(victim).await?;
                self.stats.second_evictions += 1;
                debug!("Second tier EVICT: {}", victim);
            }
        }

        let bytes = payload::encode_value(value)?;
        self.second.set(&key.storage_key(), bytes).await
    }

    pub fn fast(&self) -> &FastTier<V> {
        &self.fast
    }

    pub fn second_capacity(&self) -> usize {
        self.second_capacity
    }

    pub fn stats(&self) -> &TierStats {
        &self.stats
    }
}
