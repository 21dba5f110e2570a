//! Deterministic oracle stub (testing only)
//!
//! `ScriptedOracle` answers by submission text, counts calls and can add
//! artificial latency, so scoring behaviour can be checked without network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{OracleError, OracleResult};
use crate::oracle::{OracleClient, OracleRequest, RawVerdict};

#[derive(Debug, Clone)]
enum Script {
    Respond(String),
    Fail(OracleError),
}

/// Oracle stub keyed by (truncated) submission text.
///
/// Texts without a script fail with [`OracleError::Malformed`] unless a
/// default response is set.
#[derive(Debug)]
pub struct ScriptedOracle {
    model: String,
    scripts: HashMap<String, Script>,
    default: Option<Script>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    calls_by_text: Mutex<HashMap<String, usize>>,
}

impl ScriptedOracle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scripts: HashMap::new(),
            default: None,
            latency: None,
            calls: AtomicUsize::new(0),
            calls_by_text: Mutex::new(HashMap::new()),
        }
    }

    /// Answer `text` with the given raw message content.
    pub fn respond(mut self, text: impl Into<String>, content: impl Into<String>) -> Self {
        self.scripts
            .insert(text.into(), Script::Respond(content.into()));
        self
    }

    /// Answer `text` with every criterion set to `value`.
    pub fn respond_uniform(self, text: impl Into<String>, value: f64, confidence: f64) -> Self {
        self.respond(text, uniform_content(value, confidence))
    }

    pub fn fail(mut self, text: impl Into<String>, error: OracleError) -> Self {
        self.scripts.insert(text.into(), Script::Fail(error));
        self
    }

    pub fn respond_default(mut self, content: impl Into<String>) -> Self {
        self.default = Some(Script::Respond(content.into()));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total number of `evaluate` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls_by_text
            .lock()
            .unwrap()
            .get(text)
            .copied()
            .unwrap_or(0)
    }
}

/// Oracle message content with all six criteria set to `value`.
pub fn uniform_content(value: f64, confidence: f64) -> String {
    serde_json::json!({
        "comprehension": value,
        "technical_depth": value,
        "specificity": value,
        "constructiveness": value,
        "evidence_based": value,
        "professionalism": value,
        "justification": format!("uniform {value}"),
        "confidence": confidence,
    })
    .to_string()
}

#[async_trait]
impl OracleClient for ScriptedOracle {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn evaluate(&self, request: &OracleRequest) -> OracleResult<RawVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_text
            .lock()
            .unwrap()
            .entry(request.submission_text.clone())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let script = self
            .scripts
            .get(&request.submission_text)
            .or(self.default.as_ref())
            .cloned();
        match script {
            Some(Script::Respond(content)) => RawVerdict::parse(&content),
            Some(Script::Fail(error)) => Err(error),
            None => Err(OracleError::Malformed(
                "no scripted response for submission".to_string(),
            )),
        }
    }
}
