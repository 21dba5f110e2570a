//! Verdict cache behaviour across rounds, backends and concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use reviewrank_core::fakes::ScriptedOracle;
use reviewrank_core::{
    CacheKey, CachedVerdict, EngineError, FsVerdictStore, ItemCatalog, ItemMetadata,
    MemoryVerdictStore, ReviewEngine, ReviewScorer, RoundOptions, StoragePolicy, StoreError,
    Submission, SurrealVerdictStore, VerdictStore, SCHEMA_VERSION,
};

fn catalog() -> ItemCatalog {
    ItemCatalog::new().with_item("p1", ItemMetadata::new(Some("An abstract"), None))
}

fn round() -> Vec<Submission> {
    vec![
        Submission::new("0", Some("p1"), Some("first review")),
        Submission::new("1", Some("p1"), Some("second review")),
    ]
}

fn oracle() -> Arc<ScriptedOracle> {
    Arc::new(
        ScriptedOracle::new("stub")
            .respond_uniform("first review", 4.0, 1.0)
            .respond_uniform("second review", 2.0, 0.5),
    )
}

/// Store whose reads and writes always fail.
#[derive(Default)]
struct BrokenStore {
    gets: AtomicUsize,
}

#[async_trait]
impl VerdictStore for BrokenStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedVerdict>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("disk on fire".to_string()))
    }

    async fn put(&self, _key: &CacheKey, _record: &CachedVerdict) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk on fire".to_string()))
    }
}

#[tokio::test]
async fn second_round_is_served_from_memory_cache() {
    let oracle = oracle();
    let scorer = ReviewScorer::new(oracle.clone(), Arc::new(MemoryVerdictStore::new()));
    let engine = ReviewEngine::new(scorer, RoundOptions::default());

    let mut first = round();
    let a = engine.score_round(&mut first, &catalog()).await.unwrap();
    let mut second = round();
    let b = engine.score_round(&mut second, &catalog()).await.unwrap();

    assert_eq!(a.rewards, b.rewards);
    assert_eq!(first[0].verdict, second[0].verdict);
    assert_eq!(oracle.calls_for("first review"), 1);
    assert_eq!(oracle.calls_for("second review"), 1);
}

#[tokio::test]
async fn fs_cache_survives_a_new_engine() {
    let dir = tempfile::tempdir().unwrap();

    let first_oracle = oracle();
    let engine = ReviewEngine::new(
        ReviewScorer::new(
            first_oracle.clone(),
            Arc::new(FsVerdictStore::new(dir.path()).unwrap()),
        ),
        RoundOptions::default(),
    );
    let mut subs = round();
    let a = engine.score_round(&mut subs, &catalog()).await.unwrap();
    assert_eq!(first_oracle.calls(), 2);

    // Fresh process: new store handle, new oracle.
    let second_oracle = oracle();
    let engine = ReviewEngine::new(
        ReviewScorer::new(
            second_oracle.clone(),
            Arc::new(FsVerdictStore::new(dir.path()).unwrap()),
        ),
        RoundOptions::default(),
    );
    let mut subs = round();
    let b = engine.score_round(&mut subs, &catalog()).await.unwrap();

    assert_eq!(second_oracle.calls(), 0);
    assert_eq!(a.rewards, b.rewards);
}

#[tokio::test]
async fn surreal_cache_round_trip() {
    let store = Arc::new(SurrealVerdictStore::in_memory().await.unwrap());
    let oracle = oracle();
    let engine = ReviewEngine::new(
        ReviewScorer::new(oracle.clone(), store),
        RoundOptions::default(),
    );

    let mut subs = round();
    engine.score_round(&mut subs, &catalog()).await.unwrap();
    let mut subs = round();
    engine.score_round(&mut subs, &catalog()).await.unwrap();

    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn changing_model_misses_cache() {
    let store: Arc<dyn VerdictStore> = Arc::new(MemoryVerdictStore::new());
    let a = oracle();
    let engine = ReviewEngine::new(
        ReviewScorer::new(a.clone(), store.clone()),
        RoundOptions::default(),
    );
    engine.score_round(&mut round(), &catalog()).await.unwrap();

    let b = Arc::new(
        ScriptedOracle::new("another-model")
            .respond_uniform("first review", 4.0, 1.0)
            .respond_uniform("second review", 2.0, 0.5),
    );
    let engine = ReviewEngine::new(ReviewScorer::new(b.clone(), store), RoundOptions::default());
    engine.score_round(&mut round(), &catalog()).await.unwrap();

    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 2);
}

#[tokio::test]
async fn stale_schema_record_is_a_miss() {
    let store = Arc::new(MemoryVerdictStore::new());
    let oracle = oracle();
    let scorer = ReviewScorer::new(oracle.clone(), store.clone());

    let key = scorer.cache_key("An abstract", "first review");
    let mut stale = CachedVerdict::new("stub", reviewrank_core::RubricVerdict::fallback("old"));
    stale.schema_version = SCHEMA_VERSION + 1;
    store.put(&key, &stale).await.unwrap();

    let verdict = scorer
        .score("An abstract", Some("first review"), None)
        .await
        .unwrap();

    assert!(!verdict.is_fallback());
    assert_eq!(oracle.calls(), 1);
    assert!(store.get(&key).await.unwrap().unwrap().is_current());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rounds_share_one_oracle_call() {
    let oracle = Arc::new(
        ScriptedOracle::new("stub")
            .respond_uniform("shared", 3.0, 1.0)
            .with_latency(Duration::from_millis(100)),
    );
    let scorer = ReviewScorer::new(oracle.clone(), Arc::new(MemoryVerdictStore::new()));
    let engine = Arc::new(ReviewEngine::new(scorer, RoundOptions::default()));

    let mut handles = Vec::new();
    for i in 0..4 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut subs = vec![Submission::new(i.to_string(), Some("p1"), Some("shared"))];
            let outcome = engine.score_round(&mut subs, &catalog()).await.unwrap();
            (outcome, subs)
        }));
    }

    for handle in handles {
        let (outcome, subs) = handle.await.unwrap();
        assert_eq!(outcome.rewards.as_slice(), &[1.0]);
        assert!(!subs[0].verdict.as_ref().unwrap().is_fallback());
    }
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn duplicate_texts_in_one_round_call_once() {
    // Latency keeps the first call in flight while the second member arrives.
    let oracle = Arc::new(
        ScriptedOracle::new("stub")
            .respond_uniform("same", 3.0, 1.0)
            .with_latency(Duration::from_millis(20)),
    );
    let engine = ReviewEngine::new(ReviewScorer::uncached(oracle.clone()), RoundOptions::default());
    let mut subs = vec![
        Submission::new("0", Some("p1"), Some("same")),
        Submission::new("1", Some("p1"), Some("same")),
    ];

    engine.score_round(&mut subs, &catalog()).await.unwrap();

    assert_eq!(oracle.calls(), 1);
    assert_eq!(subs[0].verdict, subs[1].verdict);
    assert_eq!(subs[0].rank, Some(0));
    assert_eq!(subs[1].rank, Some(1));
}

#[tokio::test(start_paused = true)]
async fn joined_caller_keeps_its_own_deadline() {
    let oracle = Arc::new(
        ScriptedOracle::new("stub")
            .respond_uniform("shared", 3.0, 1.0)
            .with_latency(Duration::from_secs(2)),
    );
    let scorer = ReviewScorer::new(oracle.clone(), Arc::new(MemoryVerdictStore::new()));
    let tight = Instant::now() + Duration::from_secs(1);

    let (hurried, patient) = tokio::join!(
        scorer.score("ctx", Some("shared"), Some(tight)),
        scorer.score("ctx", Some("shared"), None),
    );

    let hurried = hurried.unwrap();
    assert!(hurried.is_fallback());
    assert!(hurried.error.as_deref().unwrap().contains("timed out"));

    let patient = patient.unwrap();
    assert!(!patient.is_fallback());
    assert!((patient.aggregate_score - 60.0).abs() < 1e-9);
    // The abandoned call is restarted by the caller still waiting.
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn later_deadline_rides_an_earlier_flight() {
    let oracle = Arc::new(
        ScriptedOracle::new("stub")
            .respond_uniform("shared", 3.0, 1.0)
            .with_latency(Duration::from_secs(2)),
    );
    let scorer = ReviewScorer::new(oracle.clone(), Arc::new(MemoryVerdictStore::new()));
    let generous = Instant::now() + Duration::from_secs(5);

    let (first, second) = tokio::join!(
        scorer.score("ctx", Some("shared"), None),
        scorer.score("ctx", Some("shared"), Some(generous)),
    );

    assert!(!first.unwrap().is_fallback());
    assert!(!second.unwrap().is_fallback());
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn failed_calls_are_not_cached() {
    let store = Arc::new(MemoryVerdictStore::new());
    let oracle = Arc::new(ScriptedOracle::new("stub").respond("bad", "[1, 2, 3]"));
    let engine = ReviewEngine::new(
        ReviewScorer::new(oracle.clone(), store.clone()),
        RoundOptions::default(),
    );

    for _ in 0..2 {
        let mut subs = vec![Submission::new("0", Some("p1"), Some("bad"))];
        engine.score_round(&mut subs, &catalog()).await.unwrap();
        assert!(subs[0].verdict.as_ref().unwrap().is_fallback());
    }

    assert_eq!(oracle.calls(), 2);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn lenient_policy_scores_through_store_failures() {
    let store = Arc::new(BrokenStore::default());
    let oracle = oracle();
    let engine = ReviewEngine::new(
        ReviewScorer::new(oracle.clone(), store.clone()),
        RoundOptions::default(),
    );

    let mut subs = round();
    let outcome = engine.score_round(&mut subs, &catalog()).await.unwrap();

    assert_eq!(outcome.rewards[0], 1.0);
    assert_eq!(oracle.calls(), 2);
    // One read per submission: a failed read is not retried inside the flight.
    assert_eq!(store.gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn strict_policy_aborts_the_round() {
    let oracle = oracle();
    let scorer = ReviewScorer::new(oracle.clone(), Arc::new(BrokenStore::default()))
        .with_storage_policy(StoragePolicy::Strict);
    let engine = ReviewEngine::new(scorer, RoundOptions::default());

    let mut subs = round();
    let err = engine.score_round(&mut subs, &catalog()).await.unwrap_err();

    assert!(matches!(err, EngineError::Storage(_)));
    assert_eq!(oracle.calls(), 0);
}
