//! Second Tier Store
//!
//! Capacity-bounded key/value collaborator behind the fast tier. Values are
//! opaque serialized payloads. The in-memory implementation enumerates keys in
//! insertion order so eviction victims are deterministic in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::core::error::Result;

#[async_trait]
pub trait SecondTierStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn size(&self) -> Result<usize>;
    /// Resident keys in the store's natural enumeration order
    async fn keys(&self) -> Result<Vec<String>>;
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every resident key
    async fn flush(&self) -> Result<()> {
        for key in self.keys().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    data: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
}

/// In-process second tier
#[derive(Default)]
pub struct MemorySecondTier {
    state: Mutex<MemoryState>,
}

impl MemorySecondTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().data.contains_key(key)
    }
}

#[async_trait]
impl SecondTierStore for MemorySecondTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.lock().data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock();
        if state.data.insert(key.to_string(), value).is_none() {
            state.order.push_back(key.to_string());
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.state.lock().data.len())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().order.iter().cloned().collect())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock();
        if state.data.remove(key).is_some() {
            state.order.retain(|k| k != key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.data.clear();
        state.order.clear();
        Ok(())
    }
}
