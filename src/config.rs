//! Configuration
//!
//! Layered, later wins:
//! 1. compiled defaults
//! 2. `~/.agentlink/config.toml` (optional)
//! 3. an explicit `--config` file (must exist)
//! 4. `AGENTLINK__<SECTION>__<KEY>` environment variables

use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "AGENTLINK";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub a2a: A2aConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// Remote agent calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct A2aConfig {
    /// Upper bound for one `message/send` call.
    pub rpc_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub user_agent: String,
    /// Sent as `acceptedOutputModes` on every call.
    pub accepted_output_modes: Vec<String>,
}

impl Default for A2aConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 30,
            discovery_timeout_secs: 10,
            user_agent: format!("agentlink/{}", crate::VERSION),
            accepted_output_modes: vec!["text/plain".to_string(), "application/json".to_string()],
        }
    }
}

impl A2aConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// Shared HTTP client for discovery and RPC. Timeouts are applied per
    /// request, not here.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite URL, e.g. `sqlite://agents.db?mode=rwc`. Unset keeps the
    /// registry in memory.
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    pub json: bool,
    /// Directory for daily-rotated log files. Unset logs to stderr only.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load all layers. `explicit` is the `--config` path, if given.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(default_config_path().as_deref(), explicit, None)
    }

    fn build(
        user_file: Option<&Path>,
        explicit: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = user_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "Config: loading explicit file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("a2a.accepted_output_modes")
                .source(env),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.a2a.rpc_timeout_secs == 0 || self.a2a.discovery_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least one second".to_string()));
        }
        if self.a2a.accepted_output_modes.is_empty() {
            return Err(ConfigError::Invalid(
                "a2a.accepted_output_modes must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `~/.agentlink/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".agentlink").join("config.toml"))
}
