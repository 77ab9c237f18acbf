//! Export worker configuration.
//!
//! Layering: defaults, then a JSON document, then `FERRY_*` environment
//! variables, then `validate()`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::domain::MaxFailures;
use crate::handler::DEFAULT_MAX_SIGNALLED_FAILURES;
use crate::marker::{MarkerError, SuccessMatcher};
use crate::plan::{DEFAULT_MARKER_NAME, ExportPlanner};
use crate::ports::storage::PutOptions;

pub const ENV_MAX_SIGNALLED_FAILURES: &str = "FERRY_MAX_SIGNALLED_FAILURES";
pub const ENV_WORKERS: &str = "FERRY_WORKERS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "FERRY_OPERATION_TIMEOUT_MS";
pub const ENV_MARKER_NAME: &str = "FERRY_MARKER_NAME";
pub const ENV_STORAGE_CLASS: &str = "FERRY_STORAGE_CLASS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value '{value}' for {variable}")]
    InvalidEnv { variable: &'static str, value: String },

    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Marker(#[from] MarkerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Retry ceiling for transient failures (signalled failures, not attempts).
    pub max_signalled_failures: u32,

    /// Ordered "last key" patterns; empty disables success markers.
    pub success_marker_patterns: Vec<String>,

    pub marker_name: String,

    pub operation_timeout_ms: Option<u64>,

    /// Storage class requested for every copied object and marker.
    pub storage_class: Option<String>,

    pub workers: usize,

    /// Redelivery budget of the bundled in-memory queue.
    pub max_deliveries: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_signalled_failures: DEFAULT_MAX_SIGNALLED_FAILURES,
            success_marker_patterns: Vec::new(),
            marker_name: DEFAULT_MARKER_NAME.to_string(),
            operation_timeout_ms: None,
            storage_class: None,
            workers: 4,
            max_deliveries: 10,
        }
    }
}

impl ExportConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Full load: optional file, process environment, validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FERRY_*` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MAX_SIGNALLED_FAILURES) {
            self.max_signalled_failures = parse_env(ENV_MAX_SIGNALLED_FAILURES, &v)?;
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            self.workers = parse_env(ENV_WORKERS, &v)?;
        }
        if let Some(v) = lookup(ENV_OPERATION_TIMEOUT_MS) {
            self.operation_timeout_ms = Some(parse_env(ENV_OPERATION_TIMEOUT_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_MARKER_NAME) {
            self.marker_name = v;
        }
        if let Some(v) = lookup(ENV_STORAGE_CLASS) {
            self.storage_class = Some(v).filter(|v| !v.trim().is_empty());
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidField {
                field: "workers",
                reason: "must be at least 1",
            });
        }
        if self.max_deliveries == 0 {
            return Err(ConfigError::InvalidField {
                field: "max_deliveries",
                reason: "must be at least 1",
            });
        }
        if self.marker_name.is_empty() || self.marker_name.contains('/') {
            return Err(ConfigError::InvalidField {
                field: "marker_name",
                reason: "must be a non-empty name without '/'",
            });
        }
        if self.operation_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidField {
                field: "operation_timeout_ms",
                reason: "must be positive when set",
            });
        }
        self.matcher()?;
        Ok(())
    }

    pub fn matcher(&self) -> Result<SuccessMatcher, ConfigError> {
        Ok(SuccessMatcher::build(&self.success_marker_patterns)?)
    }

    pub fn escalation(&self) -> MaxFailures {
        MaxFailures::new(self.max_signalled_failures)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            storage_class: self.storage_class.clone(),
        }
    }

    pub fn planner(&self) -> Result<ExportPlanner, ConfigError> {
        Ok(ExportPlanner::new(self.matcher()?, self.marker_name.clone()))
    }
}

fn parse_env<T: std::str::FromStr>(variable: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        variable,
        value: value.to_string(),
    })
}
