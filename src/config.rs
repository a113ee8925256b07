use crate::extraction::ExtractorConfig;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extraction: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default = "default_error_log_path")]
    pub error_log_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Messages extracted concurrently by the runner
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            error_log_path: default_error_log_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("output/signals.csv")
}

fn default_error_log_path() -> PathBuf {
    PathBuf::from("output/errors.jsonl")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_concurrency() -> usize {
    8
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_file("config.json")
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(config_str) => serde_json::from_str::<AppConfig>(&config_str)
                .with_context(|| format!("invalid configuration in {}", path.display()))?,
            Err(e) => {
                warn!(
                    "Could not read {} ({}), using default configuration",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override file values from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override file values from `lookup` (MIN_CONFIDENCE, CSV_OUTPUT_PATH, ERROR_LOG_PATH, LOG_LEVEL)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup("MIN_CONFIDENCE") {
            let min_confidence: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("MIN_CONFIDENCE is not a number: {}", raw))?;
            info!("MIN_CONFIDENCE override: {}", min_confidence);
            self.extraction.min_confidence = min_confidence;
        }
        if let Some(path) = lookup("CSV_OUTPUT_PATH") {
            self.output.csv_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("ERROR_LOG_PATH") {
            self.output.error_log_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn default_config_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Self::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("does/not/exist.json").unwrap();
        assert_eq!(config.output.csv_path, PathBuf::from("output/signals.csv"));
        assert_eq!(config.runtime.concurrency, 8);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"extraction": {{"min_confidence": 0.6, "admissible_symbols": ["XAUUSD"]}}}}"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.extraction.admissible_symbols, vec!["XAUUSD".to_string()]);
        assert_eq!(config.extraction.confidence_weights.symbol, 0.25);
        assert_eq!(config.extraction.symbol_aliases.normalize("gold"), "XAUUSD");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("MIN_CONFIDENCE", "0.9"),
            ("CSV_OUTPUT_PATH", "/tmp/out.csv"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.extraction.min_confidence, 0.9);
        assert_eq!(config.output.csv_path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(config.output.error_log_path, PathBuf::from("output/errors.jsonl"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_min_confidence_override() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "MIN_CONFIDENCE").then(|| "high".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_roundtrips() {
        let json = AppConfig::default_config_json().unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.extraction.min_confidence, 0.75);
        assert_eq!(parsed.extraction.patterns, crate::extraction::PatternLibrarySpec::default());
    }
}
