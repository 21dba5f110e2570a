//! Engine configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! environment variables. [`EngineConfig::validate`] runs last.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::fs::FsVerdictStore;
use crate::cache::memory::MemoryVerdictStore;
use crate::cache::surreal::SurrealVerdictStore;
use crate::cache::{StoreError, VerdictStore};
use crate::domain::{ConfigError, OracleError, OracleResult};
use crate::oracle::{OpenAiOracle, OpenAiOracleConfig};
use crate::scorer::StoragePolicy;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CACHE_DIR: &str = "data/cache";
pub const DEFAULT_METADATA_PATH: &str = "data/processed/paper_metadata.json";

/// Where verdicts are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CacheConfig {
    Fs { dir: PathBuf },
    Surreal { endpoint: String },
    Memory,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Fs {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: String,
    pub temperature: f32,
    pub api_base: String,
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Upper bound on one whole round; expiry turns pending oracle calls into fallbacks.
    pub round_timeout_secs: Option<u64>,
    pub use_cache: bool,
    pub cache: CacheConfig,
    pub storage_policy: StoragePolicy,
    pub max_concurrent_items: usize,
    pub metadata_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            request_timeout_secs: 60,
            round_timeout_secs: None,
            use_cache: true,
            cache: CacheConfig::default(),
            storage_policy: StoragePolicy::default(),
            max_concurrent_items: 8,
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    field: &'static str,
    raw: String,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{raw:?}: {e}"),
    })
}

impl EngineConfig {
    /// Defaults, optional TOML file, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REVIEWRANK_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("REVIEWRANK_TEMPERATURE") {
            self.temperature = parse_env("temperature", v)?;
        }
        if let Some(v) = lookup("REVIEWRANK_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("REVIEWRANK_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("request_timeout_secs", v)?;
        }
        if let Some(v) = lookup("REVIEWRANK_ROUND_TIMEOUT_SECS") {
            self.round_timeout_secs = Some(parse_env("round_timeout_secs", v)?);
        }
        if let Some(v) = lookup("REVIEWRANK_USE_CACHE") {
            self.use_cache = parse_env("use_cache", v)?;
        }
        if let Some(v) = lookup("REVIEWRANK_CACHE_DIR") {
            self.cache = CacheConfig::Fs { dir: v.into() };
        }
        if let Some(v) = lookup("REVIEWRANK_STORAGE_POLICY") {
            self.storage_policy = parse_env("storage_policy", v)?;
        }
        if let Some(v) = lookup("REVIEWRANK_MAX_CONCURRENT_ITEMS") {
            self.max_concurrent_items = parse_env("max_concurrent_items", v)?;
        }
        if let Some(v) = lookup("REVIEWRANK_METADATA_PATH") {
            self.metadata_path = v.into();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model",
                reason: "must not be empty".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                field: "temperature",
                reason: format!("{} is outside [0, 2]", self.temperature),
            });
        }
        if self.max_concurrent_items == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_items",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn round_timeout(&self) -> Option<Duration> {
        self.round_timeout_secs.map(Duration::from_secs)
    }

    /// Build the chat-completions oracle. Requires an API key.
    pub fn build_oracle(&self) -> OracleResult<OpenAiOracle> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| OracleError::Config("OPENAI_API_KEY is not set".to_string()))?;
        OpenAiOracle::new(
            OpenAiOracleConfig::new(&self.model, api_key)
                .with_api_base(&self.api_base)
                .with_temperature(self.temperature)
                .with_timeout(Duration::from_secs(self.request_timeout_secs)),
        )
    }

    /// Open the configured verdict store, or `None` when caching is off.
    pub async fn build_store(&self) -> Result<Option<Arc<dyn VerdictStore>>, StoreError> {
        if !self.use_cache {
            return Ok(None);
        }
        self.open_store().await.map(Some)
    }

    /// Open the configured verdict store regardless of `use_cache`.
    pub async fn open_store(&self) -> Result<Arc<dyn VerdictStore>, StoreError> {
        let store: Arc<dyn VerdictStore> = match &self.cache {
            CacheConfig::Fs { dir } => Arc::new(FsVerdictStore::new(dir)?),
            CacheConfig::Surreal { endpoint } => {
                Arc::new(SurrealVerdictStore::connect(endpoint).await?)
            }
            CacheConfig::Memory => Arc::new(MemoryVerdictStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.use_cache);
        assert_eq!(config.storage_policy, StoragePolicy::Lenient);
        assert!(config.round_timeout().is_none());
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = EngineConfig::from_toml(
            r#"
            model = "gpt-4o"
            max_concurrent_items = 2
            storage_policy = "strict"
            round_timeout_secs = 30

            [cache]
            backend = "surreal"
            endpoint = "mem://"
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_concurrent_items, 2);
        assert_eq!(config.storage_policy, StoragePolicy::Strict);
        assert_eq!(config.round_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.cache,
            CacheConfig::Surreal {
                endpoint: "mem://".to_string()
            }
        );
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EngineConfig::default();
        config
            .apply_env_with(env(&[
                ("REVIEWRANK_MODEL", "gpt-4o-mini"),
                ("OPENAI_API_KEY", "sk-test"),
                ("REVIEWRANK_USE_CACHE", "false"),
                ("REVIEWRANK_CACHE_DIR", "/tmp/verdicts"),
                ("REVIEWRANK_STORAGE_POLICY", "strict"),
            ]))
            .unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert!(!config.use_cache);
        assert_eq!(
            config.cache,
            CacheConfig::Fs {
                dir: PathBuf::from("/tmp/verdicts")
            }
        );
        assert_eq!(config.storage_policy, StoragePolicy::Strict);
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env_with(env(&[("REVIEWRANK_MAX_CONCURRENT_ITEMS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("max_concurrent_items"));
    }

    #[test]
    fn validation_catches_bad_ranges() {
        let config = EngineConfig {
            temperature: 3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            max_concurrent_items: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oracle_requires_api_key() {
        let config = EngineConfig::default();
        assert!(matches!(config.build_oracle(), Err(OracleError::Config(_))));
    }

    #[tokio::test]
    async fn store_disabled_when_cache_off() {
        let config = EngineConfig {
            use_cache: false,
            ..Default::default()
        };
        assert!(config.build_store().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fs_store_is_created_under_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            cache: CacheConfig::Fs {
                dir: dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        assert!(config.build_store().await.unwrap().is_some());
        assert!(dir.path().join("verdicts").is_dir());
    }
}
