//! Verdict resolution for a single submission.
//!
//! Lookup order: empty-text short circuit, verdict store, in-flight oracle
//! call for the same key, fresh oracle call. Only verdicts produced from a
//! successful oracle response are written to the store.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::aggregate::validate_and_aggregate;
use crate::cache::{CacheKey, CachedVerdict, StoreError, VerdictStore};
use crate::domain::{EngineError, OracleError, Result, RubricVerdict};
use crate::inflight::{FlightRole, InFlight};
use crate::metrics::METRICS;
use crate::obs::emit_oracle_failure;
use crate::oracle::{OracleClient, OracleRequest};

/// What to do when the verdict store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePolicy {
    /// Read failures count as misses, write failures are logged.
    #[default]
    Lenient,
    /// Any store failure aborts the round.
    Strict,
}

impl FromStr for StoragePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(StoragePolicy::Lenient),
            "strict" => Ok(StoragePolicy::Strict),
            other => Err(format!("unknown storage policy: {other}")),
        }
    }
}

/// Outcome of a store read.
enum Lookup {
    Hit(RubricVerdict),
    Miss,
    /// The read failed and the lenient policy let scoring continue.
    Unavailable,
}

/// Shared by every waiter of one flight. Storage errors travel as text
/// because `StoreError` is not `Clone`.
type FlightOutcome = std::result::Result<RubricVerdict, String>;

pub struct ReviewScorer {
    oracle: Arc<dyn OracleClient>,
    store: Option<Arc<dyn VerdictStore>>,
    policy: StoragePolicy,
    inflight: InFlight<FlightOutcome>,
}

impl ReviewScorer {
    pub fn new(oracle: Arc<dyn OracleClient>, store: Arc<dyn VerdictStore>) -> Self {
        Self {
            oracle,
            store: Some(store),
            policy: StoragePolicy::default(),
            inflight: InFlight::new(),
        }
    }

    /// Scorer that always asks the oracle.
    pub fn uncached(oracle: Arc<dyn OracleClient>) -> Self {
        Self {
            oracle,
            store: None,
            policy: StoragePolicy::default(),
            inflight: InFlight::new(),
        }
    }

    pub fn with_storage_policy(mut self, policy: StoragePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model_id(&self) -> &str {
        self.oracle.model_id()
    }

    pub fn cache_key(&self, item_context: &str, submission_text: &str) -> CacheKey {
        CacheKey::derive(self.model_id(), item_context, submission_text)
    }

    /// Resolve the verdict for one submission.
    ///
    /// Oracle failures, including hitting `deadline`, yield a fallback
    /// verdict. Only store failures under [`StoragePolicy::Strict`] return
    /// `Err`.
    ///
    /// `deadline` bounds this caller's wait only. A caller joining a flight
    /// started by another caller keeps its own deadline.
    pub async fn score(
        &self,
        item_context: &str,
        text: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<RubricVerdict> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            warn!("Empty submission text, assigning zero score");
            METRICS.inc_empty_submissions();
            return Ok(RubricVerdict::empty_submission());
        };

        let key = self.cache_key(item_context, text);
        let recheck = match self.lookup(&key).await? {
            Lookup::Hit(verdict) => {
                METRICS.inc_cache_hits();
                debug!(key = %key.short(), "using cached verdict");
                return Ok(verdict);
            }
            Lookup::Miss => true,
            Lookup::Unavailable => false,
        };
        METRICS.inc_cache_misses();

        let flight = self
            .inflight
            .run(key, || self.evaluate(key, item_context, text, recheck));
        let (outcome, role) = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, flight).await {
                Ok(landed) => landed,
                Err(_) => {
                    let error = OracleError::Timeout;
                    METRICS.inc_oracle_failures();
                    emit_oracle_failure(&key, &error);
                    return Ok(RubricVerdict::fallback(error.to_string()));
                }
            },
            None => flight.await,
        };
        if role == FlightRole::Follower {
            METRICS.inc_coalesced_waits();
            debug!(key = %key.short(), "joined in-flight oracle call");
        }

        outcome.map_err(|msg| EngineError::Storage(StoreError::Backend(msg)))
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Lookup> {
        let Some(store) = &self.store else {
            return Ok(Lookup::Miss);
        };
        match store.get(key).await {
            Ok(Some(record)) if record.is_current() => Ok(Lookup::Hit(record.verdict)),
            Ok(Some(record)) => {
                debug!(
                    key = %key.short(),
                    schema_version = record.schema_version,
                    "ignoring verdict from another schema version"
                );
                Ok(Lookup::Miss)
            }
            Ok(None) => Ok(Lookup::Miss),
            Err(e) => {
                METRICS.inc_storage_errors();
                match self.policy {
                    StoragePolicy::Strict => Err(e.into()),
                    StoragePolicy::Lenient => {
                        warn!(key = %key.short(), error = %e, "verdict store read failed, treating as miss");
                        Ok(Lookup::Unavailable)
                    }
                }
            }
        }
    }

    async fn persist(&self, key: &CacheKey, verdict: &RubricVerdict) -> std::result::Result<(), String> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = CachedVerdict::new(self.model_id(), verdict.clone());
        if let Err(e) = store.put(key, &record).await {
            METRICS.inc_storage_errors();
            match self.policy {
                StoragePolicy::Strict => return Err(e.to_string()),
                StoragePolicy::Lenient => {
                    warn!(key = %key.short(), error = %e, "verdict store write failed")
                }
            }
        }
        Ok(())
    }

    /// Body of one flight: runs at most once per key at a time.
    ///
    /// Not bounded by any caller's deadline; a caller that stops waiting
    /// leaves the call to the remaining waiters.
    async fn evaluate(
        &self,
        key: CacheKey,
        item_context: &str,
        text: &str,
        recheck: bool,
    ) -> FlightOutcome {
        // A flight that landed between our lookup and joining may have stored it.
        if recheck {
            if let Lookup::Hit(verdict) = self.lookup(&key).await.map_err(|e| e.to_string())? {
                return Ok(verdict);
            }
        }

        let request = OracleRequest::new(item_context, text);
        METRICS.inc_oracle_calls();
        match self.oracle.evaluate(&request).await {
            Ok(raw) => {
                let verdict = validate_and_aggregate(&raw);
                self.persist(&key, &verdict).await?;
                Ok(verdict)
            }
            Err(e) => {
                METRICS.inc_oracle_failures();
                emit_oracle_failure(&key, &e);
                Ok(RubricVerdict::fallback(e.to_string()))
            }
        }
    }
}
