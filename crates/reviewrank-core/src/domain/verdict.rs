//! Rubric criteria and the validated verdict record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound of a single criterion score.
pub const CRITERION_MAX: f64 = 5.0;

/// Factor that maps the weighted criterion mean (0-5) onto 0-100.
pub const AGGREGATE_SCALE: f64 = 20.0;

/// Confidence assumed when the oracle does not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// One of the six rubric dimensions the oracle scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Comprehension,
    TechnicalDepth,
    Specificity,
    Constructiveness,
    EvidenceBased,
    Professionalism,
}

impl Criterion {
    /// All criteria in rubric order.
    pub const ALL: [Criterion; 6] = [
        Criterion::Comprehension,
        Criterion::TechnicalDepth,
        Criterion::Specificity,
        Criterion::Constructiveness,
        Criterion::EvidenceBased,
        Criterion::Professionalism,
    ];

    /// Weight of this criterion in the aggregate. The six weights sum to 1.0.
    pub const fn weight(self) -> f64 {
        match self {
            Criterion::Comprehension => 0.20,
            Criterion::TechnicalDepth => 0.25,
            Criterion::Specificity => 0.20,
            Criterion::Constructiveness => 0.15,
            Criterion::EvidenceBased => 0.15,
            Criterion::Professionalism => 0.05,
        }
    }

    /// Field name used on the oracle wire and in cache records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Criterion::Comprehension => "comprehension",
            Criterion::TechnicalDepth => "technical_depth",
            Criterion::Specificity => "specificity",
            Criterion::Constructiveness => "constructiveness",
            Criterion::EvidenceBased => "evidence_based",
            Criterion::Professionalism => "professionalism",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Six clamped criterion scores, each in `[0, 5]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub comprehension: f64,
    pub technical_depth: f64,
    pub specificity: f64,
    pub constructiveness: f64,
    pub evidence_based: f64,
    pub professionalism: f64,
}

impl CriterionScores {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Comprehension => self.comprehension,
            Criterion::TechnicalDepth => self.technical_depth,
            Criterion::Specificity => self.specificity,
            Criterion::Constructiveness => self.constructiveness,
            Criterion::EvidenceBased => self.evidence_based,
            Criterion::Professionalism => self.professionalism,
        }
    }

    pub fn set(&mut self, criterion: Criterion, value: f64) {
        let slot = match criterion {
            Criterion::Comprehension => &mut self.comprehension,
            Criterion::TechnicalDepth => &mut self.technical_depth,
            Criterion::Specificity => &mut self.specificity,
            Criterion::Constructiveness => &mut self.constructiveness,
            Criterion::EvidenceBased => &mut self.evidence_based,
            Criterion::Professionalism => &mut self.professionalism,
        };
        *slot = value;
    }

    /// Weighted sum scaled onto `[0, 100]`.
    pub fn aggregate(&self) -> f64 {
        Criterion::ALL
            .iter()
            .map(|c| self.get(*c) * c.weight())
            .sum::<f64>()
            * AGGREGATE_SCALE
    }
}

/// A fully-populated rubric verdict.
///
/// Only the score aggregator and the fallback constructors build these, so
/// every field is already clamped: criteria in `[0, 5]`, confidence in
/// `[0, 1]`, aggregate in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricVerdict {
    #[serde(flatten)]
    pub scores: CriterionScores,

    /// Free-text explanation from the oracle.
    pub justification: String,

    /// Oracle's self-reported certainty.
    pub confidence: f64,

    /// `Σ(criterion · weight) · 20`.
    pub aggregate_score: f64,

    /// Set only on fallback verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RubricVerdict {
    /// Zero verdict for a failed oracle call. Never cached.
    pub fn fallback(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            scores: CriterionScores::default(),
            justification: format!("Error during scoring: {reason}"),
            confidence: 0.0,
            aggregate_score: 0.0,
            error: Some(reason),
        }
    }

    /// Zero verdict for a submission with no text; the oracle is not consulted.
    pub fn empty_submission() -> Self {
        Self {
            scores: CriterionScores::default(),
            justification: "Empty submission, assigned zero score".to_string(),
            confidence: 0.0,
            aggregate_score: 0.0,
            error: Some("Empty submission".to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}
