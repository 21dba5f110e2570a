//! SurrealDB-backed verdict store.
//!
//! Each verdict lives in the `verdicts` table under the record id
//! `verdicts:<hex key>`, so a put for a known key overwrites in place.
//! Works against the embedded engines (`mem://`, `surrealkv://<path>`) as well
//! as a remote endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use super::{CacheKey, CachedVerdict, Result, StoreError, VerdictStore};

const NAMESPACE: &str = "reviewrank";
const DATABASE: &str = "cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VerdictRow {
    cache_key: String,
    /// `CachedVerdict` as JSON text; kept opaque to the database.
    payload: String,
}

/// Verdict store on an embedded or remote SurrealDB instance.
#[derive(Clone)]
pub struct SurrealVerdictStore {
    db: Surreal<Any>,
}

impl SurrealVerdictStore {
    /// Connect to `endpoint` (e.g. `mem://` or `surrealkv://data/cache.db`)
    /// and define the table.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn connect(endpoint: &str) -> Result<Self> {
        info!("Connecting verdict store to SurrealDB");

        let db = surrealdb::engine::any::connect(endpoint)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect to {endpoint}: {e}")))?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;

        let store = Self { db };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory instance.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("mem://").await
    }

    async fn init_schema(&self) -> Result<()> {
        debug!("Defining verdicts table");
        let sql = r#"
            DEFINE TABLE IF NOT EXISTS verdicts SCHEMALESS;
            DEFINE FIELD IF NOT EXISTS cache_key ON verdicts TYPE string;
            DEFINE FIELD IF NOT EXISTS payload ON verdicts TYPE string;
        "#;
        self.db.query(sql).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl VerdictStore for SurrealVerdictStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedVerdict>> {
        let mut res = self
            .db
            .query("SELECT cache_key, payload FROM type::thing('verdicts', $key)")
            .bind(("key", key.to_hex()))
            .await?;

        let rows: Vec<VerdictRow> = res.take(0)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_str(&row.payload)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, record: &CachedVerdict) -> Result<()> {
        let row = VerdictRow {
            cache_key: key.to_hex(),
            payload: serde_json::to_string(record)?,
        };

        self.db
            .query("UPSERT type::thing('verdicts', $key) CONTENT $row")
            .bind(("key", key.to_hex()))
            .bind(("row", row))
            .await?
            .check()?;

        debug!(key = %key.short(), "verdict stored");
        Ok(())
    }
}
