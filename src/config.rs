//! Frozen run configuration.
//!
//! A model directory carries the `config.yaml` its training run was frozen
//! with. Only the keys needed for inspection are read; everything else in
//! the file is ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::error::{ConfigError, InputError, InspectResult};

/// Name of the frozen config inside a model directory.
pub const CONFIG_FILE: &str = "config.yaml";

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings read from a model directory's frozen config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Prediction records to inspect, as JSON Lines.
    pub predict_input_path: PathBuf,
    /// Vocabulary file, one token per line.
    pub vocab_path: PathBuf,
    /// Level name for the log filter, e.g. `INFO` or `WARNING`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl RunConfig {
    /// Loads `config.yaml` from `model_dir`.
    ///
    /// Relative paths in the config are resolved against `model_dir`.
    ///
    /// # Errors
    /// Returns an input error if the file cannot be read and a config error
    /// if it does not parse.
    pub fn load(model_dir: &Path) -> InspectResult<Self> {
        let path = model_dir.join(CONFIG_FILE);
        let text = fs::read_to_string(&path).map_err(|source| InputError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse { path, message },
            other => other,
        })?;
        Ok(config.resolved_against(model_dir))
    }

    /// Parses a config from YAML text without touching the filesystem.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the text is not a valid config.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })
    }

    /// Joins relative input paths onto `base`; absolute paths are kept.
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        if self.predict_input_path.is_relative() {
            self.predict_input_path = base.join(&self.predict_input_path);
        }
        if self.vocab_path.is_relative() {
            self.vocab_path = base.join(&self.vocab_path);
        }
        self
    }

    /// The configured log level.
    ///
    /// Accepts the usual level names in any case, plus `warning`,
    /// `critical` and `fatal` as written by training configs.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidLogLevel`] for anything else.
    pub fn level(&self) -> Result<Level, ConfigError> {
        let normalized = self.log_level.trim().to_ascii_lowercase();
        let name = match normalized.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        Level::from_str(name).map_err(|_| ConfigError::InvalidLogLevel {
            level: self.log_level.clone(),
        })
    }
}
