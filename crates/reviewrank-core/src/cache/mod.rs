pub mod fs;
pub mod memory;
pub mod surreal;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use thiserror::Error;

use crate::domain::RubricVerdict;

/// Version of the verdict record layout and rubric weighting.
///
/// Records written under a different version are read back as misses.
pub const SCHEMA_VERSION: u32 = 1;

/// SHA-256 over `model_id | item_context | submission_text`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derive the key for one oracle evaluation.
    pub fn derive(model_id: &str, item_context: &str, submission_text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update(b"|");
        hasher.update(item_context.as_bytes());
        hasher.update(b"|");
        hasher.update(submission_text.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex chars, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.short())
    }
}

impl FromStr for CacheKey {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| StoreError::InvalidKey(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(StoreError::InvalidKey(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Persisted form of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVerdict {
    #[serde(default)]
    pub schema_version: u32,
    pub model_id: String,
    pub cached_at: DateTime<Utc>,
    pub verdict: RubricVerdict,
}

impl CachedVerdict {
    pub fn new(model_id: &str, verdict: RubricVerdict) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            model_id: model_id.to_string(),
            cached_at: Utc::now(),
            verdict,
        }
    }

    pub fn is_current(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

/// Errors from verdict store backends. Absence is not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent memo of oracle verdicts keyed by [`CacheKey`].
///
/// Guarantees:
/// - `get` returns `Ok(None)` for unknown keys; `Err` only for backend failures.
/// - `put` for an existing key overwrites it; writes of the same key are idempotent.
/// - No eviction and no expiry.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedVerdict>>;

    async fn put(&self, key: &CacheKey, record: &CachedVerdict) -> Result<()>;

    async fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
