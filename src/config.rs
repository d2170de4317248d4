//! Configuration management for the throttle service.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ThrottleError};
use crate::ratelimit::{LimitRule, RateWindow};

/// Prefix for environment variable overrides, e.g.
/// `SEO_THROTTLE_RATE_LIMITING__MAX_REQUESTS=50`.
pub const ENV_PREFIX: &str = "SEO_THROTTLE";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Default rate limiting budget
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-resource limit overrides
    #[serde(default)]
    pub limits: Vec<LimitRule>,
}

/// Budget applied to any resource without a matching limit rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Window length in seconds
    #[serde(default = "default_time_window_secs")]
    pub time_window_secs: f64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            time_window_secs: default_time_window_secs(),
        }
    }
}

fn default_max_requests() -> u64 {
    100
}

fn default_time_window_secs() -> f64 {
    60.0
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ThrottleConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `SEO_THROTTLE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ThrottleConfig::load`], but reads overrides from `env` instead
    /// of the process environment when it is given.
    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading throttle configuration");
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Yaml));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize::<ThrottleConfig>()?;

        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ThrottleError::Config(format!("Failed to parse throttle config: {}", e)))
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ThrottleError::Config(e.to_string()))
    }

    /// The validated default window.
    pub fn default_window(&self) -> Result<RateWindow> {
        RateWindow::from_secs_f64(
            self.rate_limiting.max_requests,
            self.rate_limiting.time_window_secs,
        )
    }

    /// Check the default budget and every limit rule.
    pub fn validate(&self) -> Result<()> {
        self.default_window()?;
        for rule in &self.limits {
            rule.window()?;
        }
        Ok(())
    }
}
