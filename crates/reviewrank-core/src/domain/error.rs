//! Error taxonomy for the scoring pipeline.

use crate::cache::StoreError;

/// Failures of a single oracle invocation.
///
/// These never reach the caller of the engine: the scorer turns each one into
/// a fallback verdict.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("http error: {0}")]
    Http(String),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle call timed out")]
    Timeout,

    #[error("oracle response missing content")]
    MissingContent,

    #[error("malformed oracle output: {0}")]
    Malformed(String),

    #[error("oracle misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OracleError::Timeout
        } else {
            OracleError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Malformed(err.to_string())
    }
}

/// Errors surfaced by an aggregation round.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors loading the item metadata file. A missing file is not an error.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read item metadata {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid item metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_status_error_display() {
        let err = OracleError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
    }

    #[test]
    fn storage_error_converts_into_engine_error() {
        let err: EngineError = StoreError::Backend("disk full".to_string()).into();
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn config_invalid_names_field() {
        let err = ConfigError::Invalid {
            field: "temperature",
            reason: "must be within [0, 2]".to_string(),
        };
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn catalog_parse_error_keeps_serde_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CatalogError::from(source);
        assert!(err.to_string().starts_with("invalid item metadata"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
