//! ReviewRank - rubric-based review scoring CLI
//!
//! The `reviewrank` command scores a batch of reviews with an LLM oracle and
//! prints one normalized reward per submission.
//!
//! ## Commands
//!
//! - `score`: Run one aggregation round over a submissions file
//! - `cache show`: Print a cached verdict record
//! - `cache key`: Print the cache key for an (item context, review) pair

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use reviewrank_core::{
    CacheKey, CachedVerdict, ContextLookup, EngineConfig, ItemCatalog, OracleClient,
    ReviewEngine, ReviewScorer, RewardVector, RoundOptions, Submission,
};

#[derive(Parser, Debug)]
#[command(name = "reviewrank")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score reviews against a rubric and turn them into ranked rewards", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML config file (environment variables still override it)
    #[arg(long, global = true, env = "REVIEWRANK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a batch of submissions in one round
    Score {
        /// JSON array of submissions
        #[arg(short, long)]
        submissions: PathBuf,

        /// Item metadata file (defaults to the configured metadata_path)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect the verdict cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the cached record for a key
    Show {
        /// 64-char hex cache key
        key: String,
    },

    /// Print the cache key for a context and review text
    Key {
        #[arg(long)]
        context: String,

        #[arg(long)]
        text: String,
    },
}

/// Output of `score`.
#[derive(Debug, Serialize)]
struct ScoreReport {
    round_id: String,
    submitter_ids: Vec<String>,
    rewards: RewardVector,
    submissions: Vec<Submission>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    reviewrank_core::init_tracing(cli.json, level);

    let config =
        EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Score {
            submissions,
            metadata,
            output,
        } => cmd_score(&config, &submissions, metadata.as_deref(), output.as_deref()).await,
        Commands::Cache { action } => match action {
            CacheAction::Show { key } => cmd_cache_show(&config, &key).await,
            CacheAction::Key { context, text } => {
                println!("{}", derive_key(&config, &context, &text));
                Ok(())
            }
        },
    }
}

async fn cmd_score(
    config: &EngineConfig,
    submissions_path: &Path,
    metadata: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let submissions = read_submissions(submissions_path)?;

    let metadata_path = metadata.unwrap_or(config.metadata_path.as_path());
    let catalog = ItemCatalog::load(metadata_path)
        .with_context(|| format!("Failed to load item metadata from {:?}", metadata_path))?;

    let oracle: Arc<dyn OracleClient> =
        Arc::new(config.build_oracle().context("Failed to build oracle client")?);
    let engine = build_engine(config, oracle).await?;

    let report = score_submissions(&engine, submissions, &catalog).await?;
    write_json(&report, output)
}

fn read_submissions(path: &Path) -> Result<Vec<Submission>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read submissions from {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid submissions file {:?}", path))
}

async fn build_engine(config: &EngineConfig, oracle: Arc<dyn OracleClient>) -> Result<ReviewEngine> {
    let store = config
        .build_store()
        .await
        .context("Failed to open verdict store")?;
    let scorer = match store {
        Some(store) => ReviewScorer::new(oracle, store),
        None => ReviewScorer::uncached(oracle),
    }
    .with_storage_policy(config.storage_policy);
    Ok(ReviewEngine::new(scorer, RoundOptions::from(config)))
}

async fn score_submissions(
    engine: &ReviewEngine,
    mut submissions: Vec<Submission>,
    contexts: &dyn ContextLookup,
) -> Result<ScoreReport> {
    let outcome = engine
        .score_round(&mut submissions, contexts)
        .await
        .context("Scoring round failed")?;
    info!(
        round_id = %outcome.round_id,
        submissions = submissions.len(),
        "round complete"
    );
    Ok(ScoreReport {
        round_id: outcome.round_id,
        submitter_ids: outcome.submitter_ids,
        rewards: outcome.rewards,
        submissions,
    })
}

async fn cmd_cache_show(config: &EngineConfig, key: &str) -> Result<()> {
    let record = load_cached(config, key).await?;
    write_json(&record, None)
}

async fn load_cached(config: &EngineConfig, key: &str) -> Result<CachedVerdict> {
    let key = CacheKey::from_str(key.trim()).context("Not a valid cache key")?;
    let store = config
        .open_store()
        .await
        .context("Failed to open verdict store")?;
    match store.get(&key).await.context("Cache lookup failed")? {
        Some(record) => Ok(record),
        None => bail!("No cached verdict for {}", key),
    }
}

fn derive_key(config: &EngineConfig, context: &str, text: &str) -> CacheKey {
    CacheKey::derive(&config.model, context, text)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write to {:?}", path))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
