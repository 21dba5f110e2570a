//! Rubric oracle boundary.
//!
//! The oracle is an external collaborator. This module defines what the core
//! sends it ([`OracleRequest`]), what it may send back ([`RawVerdict`], every
//! field optional) and the [`OracleClient`] seam that production clients and
//! test stubs implement.

pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{Criterion, OracleError, OracleResult};

pub use openai::{OpenAiOracle, OpenAiOracleConfig};
pub use prompt::RUBRIC_SYSTEM_PROMPT;

/// Maximum item-context length sent to the oracle, in characters.
pub const MAX_CONTEXT_CHARS: usize = 1000;

/// Maximum submission length sent to the oracle, in characters.
pub const MAX_SUBMISSION_CHARS: usize = 3000;

/// Cut `s` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One bounded evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub system_prompt: &'static str,
    pub item_context: String,
    pub submission_text: String,
}

impl OracleRequest {
    /// Build a request, truncating both inputs to their bounds.
    pub fn new(item_context: &str, submission_text: &str) -> Self {
        Self {
            system_prompt: RUBRIC_SYSTEM_PROMPT,
            item_context: truncate_chars(item_context, MAX_CONTEXT_CHARS).to_string(),
            submission_text: truncate_chars(submission_text, MAX_SUBMISSION_CHARS).to_string(),
        }
    }

    pub fn user_prompt(&self) -> String {
        prompt::user_prompt(&self.item_context, &self.submission_text)
    }
}

/// Oracle output as received: any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVerdict {
    pub comprehension: Option<f64>,
    pub technical_depth: Option<f64>,
    pub specificity: Option<f64>,
    pub constructiveness: Option<f64>,
    pub evidence_based: Option<f64>,
    pub professionalism: Option<f64>,
    pub justification: Option<String>,
    pub confidence: Option<f64>,
}

impl RawVerdict {
    pub fn criterion(&self, criterion: Criterion) -> Option<f64> {
        match criterion {
            Criterion::Comprehension => self.comprehension,
            Criterion::TechnicalDepth => self.technical_depth,
            Criterion::Specificity => self.specificity,
            Criterion::Constructiveness => self.constructiveness,
            Criterion::EvidenceBased => self.evidence_based,
            Criterion::Professionalism => self.professionalism,
        }
    }

    fn set_criterion(&mut self, criterion: Criterion, value: Option<f64>) {
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

    /// Parse the oracle's message content.
    ///
    /// The content must be a JSON object. Absent or `null` fields become
    /// `None`. Criteria and confidence accept numbers and numeric strings;
    /// `justification` must be a string. A field of any other shape makes the
    /// whole response malformed.
    pub fn parse(content: &str) -> OracleResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> OracleResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| OracleError::Malformed("expected a JSON object".to_string()))?;

        let mut raw = RawVerdict::default();
        for criterion in Criterion::ALL {
            raw.set_criterion(criterion, numeric_field(obj, criterion.as_str())?);
        }
        raw.confidence = numeric_field(obj, "confidence")?;
        raw.justification = match obj.get("justification") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(OracleError::Malformed(
                    "field `justification` is not a string".to_string(),
                ))
            }
        };
        Ok(raw)
    }
}

fn numeric_field(obj: &Map<String, Value>, field: &str) -> OracleResult<Option<f64>> {
    let parsed = match obj.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(OracleError::Malformed(format!(
            "field `{field}` is not a finite number"
        ))),
    }
}

/// Evaluates one submission against the rubric.
///
/// Implementations own their own timeouts. The engine treats every `Err` as
/// a transient failure and never caches it.
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Model identity; part of every cache key.
    fn model_id(&self) -> &str;

    async fn evaluate(&self, request: &OracleRequest) -> OracleResult<RawVerdict>;
}
