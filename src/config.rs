//! Engine configuration
//!
//! Every field is defaulted, so `{}` is a valid configuration and the
//! defaults give the plain pushdown protocol with no fallbacks.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{JsonLogger, Severity};

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "GEO_CONFIG_IO",
            ConfigError::Parse(_) => "GEO_CONFIG_PARSE",
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sort a still-unconsumed SORT option by materializing the filtered
    /// stream (default: false)
    #[serde(default)]
    pub sort_fallback: bool,

    /// Enforce query bounds over the raw cursor when the backend left them
    /// to the engine (default: false)
    #[serde(default)]
    pub bounds_fallback: bool,

    /// Lowest severity written by sinks built from this config
    /// (default: "INFO")
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sort_fallback: false,
            bounds_fallback: false,
            min_severity: default_min_severity(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Enables both the sort and the bounds fallback
    pub fn with_fallbacks(mut self) -> Self {
        self.sort_fallback = true;
        self.bounds_fallback = true;
        self
    }

    /// A stderr JSON logger at this config's threshold
    pub fn stderr_logger(&self) -> JsonLogger<io::Stderr> {
        JsonLogger::stderr().with_min_severity(self.min_severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::DiagnosticSink;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.sort_fallback);
        assert!(!config.bounds_fallback);
        assert_eq!(config.min_severity, Severity::Info);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(r#"{"sort_fallback": true, "min_severity": "TRACE"}"#).unwrap();
        assert!(config.sort_fallback);
        assert!(!config.bounds_fallback);
        assert_eq!(config.min_severity, Severity::Trace);
    }

    #[test]
    fn test_invalid_json() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), "GEO_CONFIG_PARSE");
        let err = EngineConfig::from_json(r#"{"min_severity": "LOUD"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid config JSON"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"bounds_fallback": true}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.bounds_fallback);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code(), "GEO_CONFIG_IO");
    }

    #[test]
    fn test_stderr_logger_threshold() {
        let config = EngineConfig::from_json(r#"{"min_severity": "WARN"}"#).unwrap();
        let logger = config.stderr_logger();
        assert!(!logger.enabled(Severity::Info));
        assert!(logger.enabled(Severity::Error));
    }
}
