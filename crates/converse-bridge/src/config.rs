use converse_bridge_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied when a request leaves an option unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_budget_tokens")]
    pub budget_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_catalog_url")]
    pub url: String,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Used when the catalog has no context length for a model
    #[serde(default = "default_context_length")]
    pub default_context_length: u64,

    #[serde(default = "default_max_output_tokens")]
    pub default_max_output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            budget_tokens: default_budget_tokens(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_catalog_url(),
            ttl_secs: default_ttl_secs(),
            timeout_secs: default_timeout_secs(),
            failure_backoff_secs: default_failure_backoff_secs(),
        }
    }
}

impl CatalogConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tools: default_max_tools(),
            default_context_length: default_context_length(),
            default_max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file (`.toml`) or YAML file (anything else)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Inference defaults
        if let Some(val) = env_parse("CONVERSE_BRIDGE_MAX_TOKENS") {
            self.inference.default_max_tokens = val;
        }
        if let Some(val) = env_parse("CONVERSE_BRIDGE_TEMPERATURE") {
            self.inference.default_temperature = val;
        }

        // Reasoning
        if let Some(val) = env_parse("CONVERSE_BRIDGE_REASONING_ENABLED") {
            self.reasoning.enabled = val;
        }
        if let Some(val) = env_parse("CONVERSE_BRIDGE_REASONING_BUDGET_TOKENS") {
            self.reasoning.budget_tokens = val;
        }

        // Capability catalog
        if let Some(val) = env_parse("CONVERSE_BRIDGE_CATALOG_ENABLED") {
            self.catalog.enabled = val;
        }
        if let Ok(val) = std::env::var("CONVERSE_BRIDGE_CATALOG_URL") {
            self.catalog.url = val;
        }
        if let Some(val) = env_parse("CONVERSE_BRIDGE_CATALOG_TTL_SECS") {
            self.catalog.ttl_secs = val;
        }

        // Limits
        if let Some(val) = env_parse("CONVERSE_BRIDGE_MAX_TOOLS") {
            self.limits.max_tools = val;
        }

        // Logging
        if let Ok(val) = std::env::var("CONVERSE_BRIDGE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = env_parse("CONVERSE_BRIDGE_LOG_JSON") {
            self.logging.json = val;
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            eprintln!("Warning: Invalid {} '{}', ignoring", name, val);
            None
        }
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_budget_tokens() -> u32 {
    4096
}

fn default_catalog_url() -> String {
    converse_bridge_capabilities::catalog::DEFAULT_CATALOG_URL.to_string()
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_failure_backoff_secs() -> u64 {
    300
}

fn default_max_tools() -> usize {
    converse_bridge_convert::validate::MAX_TOOLS
}

fn default_context_length() -> u64 {
    128_000
}

fn default_max_output_tokens() -> u64 {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}
