//! Turns raw oracle output into a validated [`RubricVerdict`].
//!
//! This is the only place raw oracle data is read. Missing criteria count as
//! 0, out-of-range values are clamped, and the function cannot fail.

use crate::domain::{Criterion, CriterionScores, RubricVerdict, CRITERION_MAX, DEFAULT_CONFIDENCE};
use crate::oracle::RawVerdict;

/// Clamp every field, fill defaults and compute the aggregate.
pub fn validate_and_aggregate(raw: &RawVerdict) -> RubricVerdict {
    let mut scores = CriterionScores::default();
    for criterion in Criterion::ALL {
        let value = raw
            .criterion(criterion)
            .map(|v| v.clamp(0.0, CRITERION_MAX))
            .unwrap_or(0.0);
        scores.set(criterion, value);
    }

    let confidence = raw
        .confidence
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    RubricVerdict {
        aggregate_score: scores.aggregate(),
        scores,
        justification: raw.justification.clone().unwrap_or_default(),
        confidence,
        error: None,
    }
}
