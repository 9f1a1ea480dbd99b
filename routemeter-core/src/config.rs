use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::labeler::PathDepth;
use crate::registry::{validate_buckets, HistogramSpec, DEFAULT_BUCKETS};

pub const DEFAULT_METRIC_NAME: &str = "http_metrics";
pub const DEFAULT_HELP: &str = "The time taken fulfilling servlet requests";
pub const DEFAULT_PATH_COMPONENTS: i64 = 1;

/// Parameter keys accepted by [`MetricsConfig::from_params`]
pub const PARAM_METRIC_NAME: &str = "metric-name";
pub const PARAM_HELP: &str = "help";
pub const PARAM_BUCKETS: &str = "buckets";
pub const PARAM_PATH_COMPONENTS: &str = "path-components";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// Request timing histogram configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub metric_name: String,
    pub help: String,
    /// Comma-separated, strictly increasing upper bounds in seconds
    pub buckets: Option<String>,
    /// Path segments kept in the `path` label; below 1 keeps the full path
    pub path_components: i64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            help: DEFAULT_HELP.to_string(),
            buckets: None,
            path_components: DEFAULT_PATH_COMPONENTS,
        }
    }
}

impl MetricsConfig {
    /// Build from string-keyed filter parameters (`metric-name`, `help`,
    /// `buckets`, `path-components`). Unknown keys are ignored and every key is
    /// optional.
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = params.get(PARAM_METRIC_NAME) {
            config.metric_name.clone_from(name);
        }
        if let Some(help) = params.get(PARAM_HELP) {
            config.help.clone_from(help);
        }
        config.buckets = params.get(PARAM_BUCKETS).cloned();
        if let Some(raw) = params.get(PARAM_PATH_COMPONENTS) {
            config.path_components = parse_path_components(raw);
        }

        config
    }

    /// Histogram definition with the bucket fallback applied
    #[must_use]
    pub fn histogram_spec(&self) -> HistogramSpec {
        HistogramSpec::new(
            self.metric_name.clone(),
            self.help.clone(),
            buckets_or_default(self.buckets.as_deref()),
        )
    }

    #[must_use]
    pub fn path_depth(&self) -> PathDepth {
        PathDepth::from_components(self.path_components)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources
    /// Priority (highest first):
    /// 1. Environment variables
    /// 2. Config file (if provided and present)
    /// 3. Defaults
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // ROUTEMETER_METRICS__PATH_COMPONENTS, ROUTEMETER_LOGGING__LEVEL, ...
        builder = builder.add_source(
            Environment::with_prefix("ROUTEMETER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path))
    }
}

/// Strictly parse a comma-separated bucket list.
///
/// Any element that is not a finite positive number, or a sequence that is not
/// strictly increasing, rejects the whole list.
pub fn parse_buckets(raw: &str) -> Result<Vec<f64>> {
    let buckets = raw
        .split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<f64>()
                .map_err(|e| Error::InvalidBuckets(format!("{item:?}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    validate_buckets(&buckets)?;
    Ok(buckets)
}

/// Parse a bucket list, substituting [`DEFAULT_BUCKETS`] when it is absent or malformed.
#[must_use]
pub fn buckets_or_default(raw: Option<&str>) -> Vec<f64> {
    let Some(raw) = raw else {
        return DEFAULT_BUCKETS.to_vec();
    };

    parse_buckets(raw).unwrap_or_else(|e| {
        warn!(buckets = raw, error = %e, "Falling back to default histogram buckets");
        DEFAULT_BUCKETS.to_vec()
    })
}

fn parse_path_components(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or_else(|e| {
        warn!(
            path_components = raw,
            error = %e,
            "Invalid path-components, using {DEFAULT_PATH_COMPONENTS}"
        );
        DEFAULT_PATH_COMPONENTS
    })
}
