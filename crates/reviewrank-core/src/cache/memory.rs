use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheKey, CachedVerdict, Result, VerdictStore};

/// In-memory verdict store backed by a `HashMap<CacheKey, CachedVerdict>`.
///
/// Nothing survives the process; useful for one-off rounds and tests.
#[derive(Debug, Default)]
pub struct MemoryVerdictStore {
    records: RwLock<HashMap<CacheKey, CachedVerdict>>,
}

impl MemoryVerdictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VerdictStore for MemoryVerdictStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedVerdict>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, record: &CachedVerdict) -> Result<()> {
        self.records.write().await.insert(*key, record.clone());
        Ok(())
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.records.read().await.contains_key(key))
    }
}
