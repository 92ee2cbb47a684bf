//! Redis-backed second tier
//!
//! Maps the store contract onto GET/SET/DBSIZE/KEYS/DEL against a dedicated
//! Redis database. Eviction order follows whatever `KEYS *` returns.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::info;

use super::second_tier::SecondTierStore;
use crate::core::error::{Result, TierCacheError};

fn storage_err(err: redis::RedisError) -> TierCacheError {
    TierCacheError::Storage(err.to_string())
}

pub struct RedisSecondTier {
    conn: MultiplexedConnection,
}

impl RedisSecondTier {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(storage_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(storage_err)?;
        info!("Connected to Redis second tier at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl SecondTierStore for RedisSecondTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(storage_err)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(storage_err)
    }

    async fn size(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let size: usize = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(size)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.keys("*").await.map_err(storage_err)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await.map_err(storage_err)?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
