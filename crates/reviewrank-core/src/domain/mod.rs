//! Domain models for reviewrank.
//!
//! - `Submission`: one submitter's text for one item, plus written-back results
//! - `RubricVerdict`: validated six-criterion verdict with its aggregate
//! - `Criterion`: the rubric dimensions and their fixed weights

pub mod error;
pub mod submission;
pub mod verdict;

pub use error::{CatalogError, ConfigError, EngineError, OracleError, OracleResult, Result};
pub use submission::Submission;
pub use verdict::{
    Criterion, CriterionScores, RubricVerdict, AGGREGATE_SCALE, CRITERION_MAX, DEFAULT_CONFIDENCE,
};
