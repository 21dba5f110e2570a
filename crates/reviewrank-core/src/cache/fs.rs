use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::{CacheKey, CachedVerdict, Result, StoreError, VerdictStore};

/// Filesystem-backed verdict store with git-style 2-char sharding.
///
/// Layout: `<root>/verdicts/<first 2 hex chars>/<remaining hex chars>.json`
///
/// Reads go through `tokio::fs`; the temp-file write runs on the blocking pool.
pub struct FsVerdictStore {
    verdicts_dir: PathBuf,
}

impl FsVerdictStore {
    /// Create a new `FsVerdictStore` rooted at `root`. Creates `root/verdicts/` if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let verdicts_dir = root.as_ref().join("verdicts");
        fs::create_dir_all(&verdicts_dir)?;
        Ok(Self { verdicts_dir })
    }

    fn record_path(&self, key: &CacheKey) -> PathBuf {
        let hex = key.to_hex();
        self.verdicts_dir
            .join(&hex[..2])
            .join(format!("{}.json", &hex[2..]))
    }
}

/// Write `data` next to `path`, then rename it into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let shard_dir = path
        .parent()
        .ok_or_else(|| StoreError::Backend(format!("no shard dir for {}", path.display())))?;
    fs::create_dir_all(shard_dir)?;

    let mut tmp = NamedTempFile::new_in(shard_dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl VerdictStore for FsVerdictStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedVerdict>> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn put(&self, key: &CacheKey, record: &CachedVerdict) -> Result<()> {
        let path = self.record_path(key);
        let data = serde_json::to_vec_pretty(record)?;

        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .map_err(|e| StoreError::Backend(format!("verdict write task failed: {e}")))?
    }

    async fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.record_path(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionScores, RubricVerdict};

    fn make_store() -> (tempfile::TempDir, FsVerdictStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsVerdictStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn sample_record() -> CachedVerdict {
        CachedVerdict::new(
            "gpt-4.1-mini",
            RubricVerdict {
                scores: CriterionScores {
                    comprehension: 4.0,
                    technical_depth: 3.0,
                    specificity: 3.0,
                    constructiveness: 2.0,
                    evidence_based: 2.0,
                    professionalism: 5.0,
                },
                justification: "grounded critique".to_string(),
                confidence: 0.8,
                aggregate_score: 59.0,
                error: None,
            },
        )
    }

    #[tokio::test]
    async fn record_roundtrip() {
        let (_dir, store) = make_store();
        let key = CacheKey::derive("m", "ctx", "text");
        let record = sample_record();
        store.put(&key, &record).await.unwrap();
        let got = store.get(&key).await.unwrap().unwrap();
        assert_eq!(got, record);
    }

    #[tokio::test]
    async fn missing_key_is_none_not_error() {
        let (_dir, store) = make_store();
        let key = CacheKey::derive("m", "ctx", "never stored");
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(!store.contains(&key).await.unwrap());
    }

    #[tokio::test]
    async fn repeated_put_leaves_single_file() {
        let (dir, store) = make_store();
        let key = CacheKey::derive("m", "ctx", "dup");
        store.put(&key, &sample_record()).await.unwrap();
        store.put(&key, &sample_record()).await.unwrap();

        let hex = key.to_hex();
        let shard = dir.path().join("verdicts").join(&hex[..2]);
        let entries: Vec<_> = std::fs::read_dir(shard).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(store.contains(&key).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_puts_and_gets_land_intact() {
        let (_dir, store) = make_store();
        let store = std::sync::Arc::new(store);
        let keys: Vec<CacheKey> = (0..16)
            .map(|i| CacheKey::derive("m", "ctx", &format!("review {i}")))
            .collect();

        let puts = keys.iter().map(|key| {
            let store = store.clone();
            let key = *key;
            tokio::spawn(async move { store.put(&key, &sample_record()).await })
        });
        for put in futures::future::join_all(puts).await {
            put.unwrap().unwrap();
        }

        for key in &keys {
            let got = store.get(key).await.unwrap().unwrap();
            assert_eq!(got.verdict, sample_record().verdict);
        }
    }

    #[tokio::test]
    async fn corrupt_record_is_a_storage_error() {
        let (dir, store) = make_store();
        let key = CacheKey::derive("m", "ctx", "corrupt");
        let hex = key.to_hex();
        let shard = dir.path().join("verdicts").join(&hex[..2]);
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join(format!("{}.json", &hex[2..])), b"{not json").unwrap();

        match store.get(&key).await {
            Err(StoreError::Serialization(_)) => {}
            other => panic!("expected Serialization error, got {other:?}"),
        }
    }
}
