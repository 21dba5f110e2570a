//! OpenAI-compatible chat-completions oracle.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use super::{OracleClient, OracleRequest, RawVerdict};
use crate::domain::{OracleError, OracleResult};

/// Connection settings for [`OpenAiOracle`].
#[derive(Debug, Clone)]
pub struct OpenAiOracleConfig {
    pub model: String,
    pub api_key: String,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl OpenAiOracleConfig {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Rubric oracle backed by a chat-completions endpoint in JSON mode.
pub struct OpenAiOracle {
    config: OpenAiOracleConfig,
    http_client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiOracleConfig) -> OracleResult<Self> {
        if config.api_key.is_empty() {
            return Err(OracleError::Config("api key is empty".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("reviewrank/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn request_body(&self, request: &OracleRequest) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt() },
            ],
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl OracleClient for OpenAiOracle {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn evaluate(&self, request: &OracleRequest) -> OracleResult<RawVerdict> {
        let resp = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = resp.json().await?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or(OracleError::MissingContent)?;

        debug!(bytes = content.len(), "oracle content received");
        RawVerdict::parse(content)
    }
}
