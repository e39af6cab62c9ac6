//! Agent configuration

use anyhow::{Context, Result};
use memwatch_lib::EngineConfig;
use serde::Deserialize;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "MEMWATCH_CONFIG";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name attached to log events
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Sampling interval in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Mount point of procfs
    #[serde(default = "default_proc_root")]
    pub proc_root: String,

    /// Consecutive collection failures before reporting unhealthy
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_collection_interval() -> u64 {
    5
}

fn default_proc_root() -> String {
    "/proc".to_string()
}

fn default_max_consecutive_failures() -> u32 {
    3
}

impl AgentConfig {
    /// Load configuration from an optional file and `MEMWATCH_*` variables.
    ///
    /// Nested keys use `__`, e.g. `MEMWATCH_ENGINE__WINDOW_CAPACITY=60`.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MEMWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        agent.validate()?;
        Ok(agent)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection_interval_secs == 0 {
            anyhow::bail!("collection_interval_secs must be greater than zero");
        }
        self.engine.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AgentConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_json("{}");

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.collection_interval_secs, 5);
        assert_eq!(config.proc_root, "/proc");
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_engine_overrides() {
        let config = from_json(
            r#"{ "collection_interval_secs": 10, "engine": { "window_capacity": 60 } }"#,
        );

        assert_eq!(config.collection_interval_secs, 10);
        assert_eq!(config.engine.window_capacity, 60);
        assert_eq!(config.engine.rules.swap.threshold, 80.0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = from_json(r#"{ "collection_interval_secs": 0 }"#);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_engine_rejected() {
        let config = from_json(r#"{ "engine": { "window_capacity": 0 } }"#);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_capacity"));
    }
}
