//! Submissions delivered for one aggregation round.

use serde::{Deserialize, Serialize};

use super::verdict::RubricVerdict;

/// A text submission answering one item.
///
/// `verdict`, `rank`, `raw_reward` and `reward` are written back by the
/// engine after scoring so the caller can audit how each reward was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub submitter_id: String,

    /// Item the submission answers. Submissions without one receive reward 0.
    #[serde(default)]
    pub item_id: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    /// Opaque submitter-supplied context, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<RubricVerdict>,

    /// 0-based position within the item group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,

    /// `aggregate · decay(rank) · confidence`, before population normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_reward: Option<f64>,

    /// Final normalized reward in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
}

impl Submission {
    pub fn new(
        submitter_id: impl Into<String>,
        item_id: Option<&str>,
        text: Option<&str>,
    ) -> Self {
        Self {
            submitter_id: submitter_id.into(),
            item_id: item_id.map(str::to_string),
            text: text.map(str::to_string),
            metadata: None,
            verdict: None,
            rank: None,
            raw_reward: None,
            reward: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Text worth sending to the oracle, or `None` when missing or blank.
    ///
    /// Whitespace-only text counts as empty: it gets the empty-submission
    /// verdict and is never sent to the oracle or cached.
    pub fn scorable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_not_scorable() {
        assert!(Submission::new("a", Some("p1"), None).scorable_text().is_none());
        assert!(Submission::new("a", Some("p1"), Some("")).scorable_text().is_none());
        assert!(Submission::new("a", Some("p1"), Some("  \n")).scorable_text().is_none());
        assert_eq!(
            Submission::new("a", Some("p1"), Some("solid review")).scorable_text(),
            Some("solid review")
        );
    }

    #[test]
    fn deserializes_with_optional_fields_absent() {
        let s: Submission = serde_json::from_str(r#"{"submitter_id": "7"}"#).unwrap();
        assert_eq!(s.submitter_id, "7");
        assert!(s.item_id.is_none());
        assert!(s.text.is_none());
        assert!(s.verdict.is_none());
    }
}
