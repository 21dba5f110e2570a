//! Structured observability hooks for aggregation rounds.
//!
//! This module provides:
//! - Round-scoped tracing spans via [`round_span`]
//! - Emission functions for round lifecycle events
//!
//! Events are emitted at `info!` level unless noted. For JSON output, start
//! the binary with `--json`.

use tracing::{info, warn};

use crate::cache::CacheKey;
use crate::normalize::RewardSummary;

/// Span covering one aggregation round, tagged with its round_id.
///
/// # Example
///
/// ```ignore
/// use tracing::Instrument;
/// run_round().instrument(round_span("6f1c...")).await;
/// // every event inside carries round_id = "6f1c..."
/// ```
pub fn round_span(round_id: &str) -> tracing::Span {
    tracing::info_span!("reviewrank.round", round_id = %round_id)
}

/// Emit event: round started.
pub fn emit_round_started(round_id: &str, submissions: usize, items: usize) {
    info!(
        event = "round.started",
        round_id = %round_id,
        submissions = submissions,
        items = items,
    );
}

/// Emit event: one item group scored and ranked.
pub fn emit_group_ranked(item_id: &str, group_size: usize, top_score: f64) {
    info!(
        event = "group.ranked",
        item_id = %item_id,
        group_size = group_size,
        top_score = top_score,
    );
}

/// Emit event: oracle call failed and a fallback verdict was used (warning level).
pub fn emit_oracle_failure(key: &CacheKey, error: &dyn std::fmt::Display) {
    warn!(event = "oracle.failure", key = %key.short(), error = %error);
}

/// Emit event: an item had no usable context (warning level).
pub fn emit_missing_context(item_id: &str, fallback: &str) {
    warn!(event = "item.missing_context", item_id = %item_id, fallback = %fallback);
}

/// Emit event: round finished with reward statistics.
pub fn emit_round_finished(round_id: &str, duration_ms: u64, summary: &RewardSummary) {
    info!(
        event = "round.finished",
        round_id = %round_id,
        duration_ms = duration_ms,
        reward_min = summary.min,
        reward_max = summary.max,
        reward_mean = summary.mean,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_span_enter_does_not_panic() {
        let _entered = round_span("test-round-id").entered();
        emit_round_started("test-round-id", 3, 1);
        emit_round_finished("test-round-id", 5, &RewardSummary::default());
    }
}
