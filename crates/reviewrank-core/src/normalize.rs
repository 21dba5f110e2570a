//! Population-wide reward normalization.

use serde::{Deserialize, Serialize};

/// One reward per input submission, index-aligned with the round's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardVector(Vec<f64>);

/// min / max / mean of a reward vector, for the round summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl RewardVector {
    /// All-zero vector of length `len`.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn from_raw(rewards: Vec<f64>) -> Self {
        Self(rewards)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    pub(crate) fn set(&mut self, index: usize, reward: f64) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = reward;
                true
            }
            None => false,
        }
    }

    /// Largest entry, or 0.0 for an empty vector.
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(0.0, f64::max)
    }

    /// Divide every entry by the population maximum.
    ///
    /// After this the maximum is exactly 1.0 unless every entry was 0, in
    /// which case the vector is left unchanged.
    pub fn normalize(&mut self) {
        let max = self.max();
        if max > 0.0 {
            for r in &mut self.0 {
                *r /= max;
            }
        }
    }

    pub fn summary(&self) -> RewardSummary {
        if self.0.is_empty() {
            return RewardSummary::default();
        }
        let min = self.0.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = self.0.iter().sum::<f64>() / self.0.len() as f64;
        RewardSummary { min, max, mean }
    }
}

impl std::ops::Index<usize> for RewardVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}
