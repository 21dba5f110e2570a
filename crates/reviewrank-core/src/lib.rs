//! ReviewRank Core Library
//!
//! Scores free-text reviews against a fixed rubric with an LLM oracle,
//! ranks them per item and turns the ranks into normalized rewards.

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fakes;
pub mod inflight;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod oracle;
pub mod rank;
pub mod scorer;
pub mod telemetry;

pub use domain::{
    CatalogError, ConfigError, Criterion, CriterionScores, EngineError, OracleError, OracleResult,
    Result, RubricVerdict, Submission, AGGREGATE_SCALE, CRITERION_MAX, DEFAULT_CONFIDENCE,
};

pub use aggregate::validate_and_aggregate;
pub use cache::fs::FsVerdictStore;
pub use cache::memory::MemoryVerdictStore;
pub use cache::surreal::SurrealVerdictStore;
pub use cache::{CacheKey, CachedVerdict, StoreError, VerdictStore, SCHEMA_VERSION};
pub use catalog::{ContextLookup, ItemCatalog, ItemMetadata, UNKNOWN_ITEM_CONTEXT};
pub use config::{CacheConfig, EngineConfig};
pub use engine::{ReviewEngine, RoundOptions, RoundOutcome};
pub use normalize::{RewardSummary, RewardVector};
pub use oracle::{OpenAiOracle, OpenAiOracleConfig, OracleClient, OracleRequest, RawVerdict};
pub use rank::{assign_ranks, decay_factor, rank_group, rank_reward, Ranked, RANK_DECAY_RATE};
pub use scorer::{ReviewScorer, StoragePolicy};

pub use metrics::METRICS;
pub use obs::{
    emit_group_ranked, emit_missing_context, emit_oracle_failure, emit_round_finished,
    emit_round_started, round_span,
};
pub use telemetry::init_tracing;

/// ReviewRank version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
