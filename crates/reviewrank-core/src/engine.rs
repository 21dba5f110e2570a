//! Aggregation round orchestration.
//!
//! A round groups submissions by item, scores every group (items run
//! concurrently, bounded by `max_concurrent_items`), ranks each group once
//! all of its members are scored, then normalizes rewards across the whole
//! population. The returned [`RewardVector`] is index-aligned with the input
//! regardless of evaluation order.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::catalog::ContextLookup;
use crate::config::EngineConfig;
use crate::domain::{EngineError, Result, RubricVerdict, Submission};
use crate::metrics::METRICS;
use crate::normalize::RewardVector;
use crate::obs::{emit_group_ranked, emit_round_finished, emit_round_started, round_span};
use crate::rank::{rank_group, Ranked};
use crate::scorer::ReviewScorer;

/// Scheduling limits for one round.
#[derive(Debug, Clone)]
pub struct RoundOptions {
    pub max_concurrent_items: usize,
    pub round_timeout: Option<Duration>,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            max_concurrent_items: 8,
            round_timeout: None,
        }
    }
}

impl From<&EngineConfig> for RoundOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_concurrent_items: config.max_concurrent_items,
            round_timeout: config.round_timeout(),
        }
    }
}

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_id: String,
    pub rewards: RewardVector,
    /// `submitter_ids[i]` owns `rewards[i]`.
    pub submitter_ids: Vec<String>,
}

/// Submissions of one item, by position in the round input.
struct ItemGroup {
    item_id: String,
    members: Vec<(usize, Option<String>)>,
}

struct ScoredMember {
    index: usize,
    verdict: RubricVerdict,
    ranked: Ranked,
}

pub struct ReviewEngine {
    scorer: ReviewScorer,
    options: RoundOptions,
}

impl ReviewEngine {
    pub fn new(scorer: ReviewScorer, options: RoundOptions) -> Self {
        Self { scorer, options }
    }

    pub fn scorer(&self) -> &ReviewScorer {
        &self.scorer
    }

    /// Score, rank and reward one batch of submissions.
    ///
    /// Writes `verdict`, `rank`, `raw_reward` and `reward` back onto each
    /// submission. Submissions without an item get reward 0 and no verdict.
    pub async fn score_round(
        &self,
        submissions: &mut [Submission],
        contexts: &dyn ContextLookup,
    ) -> Result<RoundOutcome> {
        let round_id = Uuid::new_v4().to_string();
        let span = round_span(&round_id);
        self.run_round(round_id, submissions, contexts)
            .instrument(span)
            .await
    }

    async fn run_round(
        &self,
        round_id: String,
        submissions: &mut [Submission],
        contexts: &dyn ContextLookup,
    ) -> Result<RoundOutcome> {
        let started = std::time::Instant::now();
        let deadline = self.options.round_timeout.map(|t| Instant::now() + t);

        let groups = group_by_item(submissions);
        emit_round_started(&round_id, submissions.len(), groups.len());

        let scored: Vec<Vec<ScoredMember>> = stream::iter(groups)
            .map(|group| self.score_group(group, contexts, deadline))
            .buffer_unordered(self.options.max_concurrent_items.max(1))
            .try_collect()
            .await?;

        let mut rewards = RewardVector::zeros(submissions.len());
        for submission in submissions.iter_mut() {
            submission.verdict = None;
            submission.rank = None;
            submission.raw_reward = None;
        }
        for member in scored.into_iter().flatten() {
            if !rewards.set(member.index, member.ranked.reward) {
                return Err(EngineError::Internal(format!(
                    "group member index {} out of range for {} submissions",
                    member.index,
                    submissions.len()
                )));
            }
            let submission = &mut submissions[member.index];
            submission.verdict = Some(member.verdict);
            submission.rank = Some(member.ranked.rank);
            submission.raw_reward = Some(member.ranked.reward);
        }

        rewards.normalize();
        for (submission, reward) in submissions.iter_mut().zip(rewards.as_slice()) {
            submission.reward = Some(*reward);
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        emit_round_finished(&round_id, duration_ms, &rewards.summary());
        METRICS.flush();

        Ok(RoundOutcome {
            round_id,
            rewards,
            submitter_ids: submissions.iter().map(|s| s.submitter_id.clone()).collect(),
        })
    }

    /// Score every member, wait for all of them, then rank.
    async fn score_group(
        &self,
        group: ItemGroup,
        contexts: &dyn ContextLookup,
        deadline: Option<Instant>,
    ) -> Result<Vec<ScoredMember>> {
        let context = contexts.context_for(&group.item_id);

        let verdicts: Vec<RubricVerdict> = futures::future::try_join_all(
            group
                .members
                .iter()
                .map(|(_, text)| self.scorer.score(&context, text.as_deref(), deadline)),
        )
        .await?;

        let ranked = rank_group(&verdicts);
        let top_score = verdicts
            .iter()
            .map(|v| v.aggregate_score)
            .fold(0.0, f64::max);
        emit_group_ranked(&group.item_id, verdicts.len(), top_score);

        Ok(group
            .members
            .into_iter()
            .zip(verdicts.into_iter().zip(ranked))
            .map(|((index, _), (verdict, ranked))| ScoredMember {
                index,
                verdict,
                ranked,
            })
            .collect())
    }
}

/// Group by item id in order of first appearance; members keep input order.
fn group_by_item(submissions: &[Submission]) -> Vec<ItemGroup> {
    let mut groups: Vec<ItemGroup> = Vec::new();
    let mut by_item: HashMap<&str, usize> = HashMap::new();

    for (index, submission) in submissions.iter().enumerate() {
        let Some(item_id) = submission
            .item_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            debug!(index, submitter = %submission.submitter_id, "no item id, reward 0");
            continue;
        };
        let slot = *by_item.entry(item_id).or_insert_with(|| {
            groups.push(ItemGroup {
                item_id: item_id.to_string(),
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot]
            .members
            .push((index, submission.text.clone()));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_preserves_first_appearance_and_skips_unmatched() {
        let subs = vec![
            Submission::new("0", Some("b"), Some("x")),
            Submission::new("1", None, Some("y")),
            Submission::new("2", Some("a"), Some("z")),
            Submission::new("3", Some("b"), None),
            Submission::new("4", Some(" "), Some("w")),
        ];
        let groups = group_by_item(&subs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].item_id, "b");
        assert_eq!(
            groups[0].members.iter().map(|m| m.0).collect::<Vec<_>>(),
            vec![0, 3]
        );
        assert_eq!(groups[1].item_id, "a");
        assert_eq!(groups[1].members[0].0, 2);
    }

    #[test]
    fn round_options_follow_config() {
        let config = EngineConfig {
            max_concurrent_items: 3,
            round_timeout_secs: Some(9),
            ..Default::default()
        };
        let options = RoundOptions::from(&config);
        assert_eq!(options.max_concurrent_items, 3);
        assert_eq!(options.round_timeout, Some(Duration::from_secs(9)));
    }
}
