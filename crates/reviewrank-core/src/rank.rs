//! Per-item ranking and rank-decayed rewards.

use std::cmp::Ordering;

use crate::domain::RubricVerdict;

/// Exponent coefficient of the rank decay.
pub const RANK_DECAY_RATE: f64 = 0.5;

/// `exp(-0.5 · rank)`. Rank 0 yields exactly 1.0.
pub fn decay_factor(rank: usize) -> f64 {
    if rank == 0 {
        return 1.0;
    }
    (-RANK_DECAY_RATE * rank as f64).exp()
}

/// Reward for one verdict at `rank`: `aggregate · decay(rank) · confidence`.
pub fn rank_reward(verdict: &RubricVerdict, rank: usize) -> f64 {
    verdict.aggregate_score * decay_factor(rank) * verdict.confidence
}

/// Rank and reward of one group member, aligned with the input slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub rank: usize,
    pub reward: f64,
}

/// Rank a group by `aggregate_score` descending.
///
/// Returns one rank per input position. Equal scores keep their input order,
/// so the earlier submission gets the better rank.
pub fn assign_ranks(verdicts: &[RubricVerdict]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..verdicts.len()).collect();
    // `sort_by` is stable.
    order.sort_by(|&a, &b| {
        verdicts[b]
            .aggregate_score
            .partial_cmp(&verdicts[a].aggregate_score)
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0; verdicts.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}

/// Rank a group and compute each member's raw reward.
pub fn rank_group(verdicts: &[RubricVerdict]) -> Vec<Ranked> {
    assign_ranks(verdicts)
        .into_iter()
        .zip(verdicts)
        .map(|(rank, verdict)| Ranked {
            rank,
            reward: rank_reward(verdict, rank),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CriterionScores;

    fn verdict(score: f64, confidence: f64) -> RubricVerdict {
        RubricVerdict {
            scores: CriterionScores::default(),
            justification: String::new(),
            confidence,
            aggregate_score: score,
            error: None,
        }
    }

    #[test]
    fn decay_at_rank_zero_is_exactly_one() {
        assert_eq!(decay_factor(0), 1.0);
    }

    #[test]
    fn decay_follows_exponential() {
        for k in 1..6 {
            assert!((decay_factor(k) - (-0.5 * k as f64).exp()).abs() < 1e-15);
        }
        assert!(decay_factor(1) > decay_factor(2));
    }

    #[test]
    fn ranks_are_a_permutation_ordered_by_score() {
        let group = vec![
            verdict(10.0, 1.0),
            verdict(70.0, 1.0),
            verdict(40.0, 1.0),
            verdict(95.0, 1.0),
        ];
        let ranks = assign_ranks(&group);
        assert_eq!(ranks, vec![3, 1, 2, 0]);

        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let group = vec![verdict(50.0, 1.0), verdict(80.0, 1.0), verdict(50.0, 1.0)];
        assert_eq!(assign_ranks(&group), vec![1, 0, 2]);
    }

    #[test]
    fn reward_combines_score_decay_and_confidence() {
        let group = vec![verdict(80.0, 0.5), verdict(60.0, 1.0)];
        let ranked = rank_group(&group);
        assert_eq!(ranked[0].rank, 0);
        assert!((ranked[0].reward - 40.0).abs() < 1e-12);
        assert_eq!(ranked[1].rank, 1);
        assert!((ranked[1].reward - 60.0 * (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn empty_group_ranks_nothing() {
        assert!(rank_group(&[]).is_empty());
    }
}
