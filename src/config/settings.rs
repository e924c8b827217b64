use alloy::primitives::Address;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use tracing::info;

use crate::adapters::compound_v2::CompoundDeployment;

/// Environment variable naming the configuration file (without extension).
pub const CONFIG_PATH_ENV: &str = "COMPOUND_TVL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/compound-tvl";
const ENV_PREFIX: &str = "COMPOUND_TVL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub chains: HashMap<String, ChainSettings>,
    #[serde(default)]
    pub deployments: Vec<CompoundDeployment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    pub rpc_url: String,
    /// Multicall3 deployment; batches fall back to parallel calls without it
    #[serde(default)]
    pub multicall: Option<Address>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load from the file named by `COMPOUND_TVL_CONFIG` (optional), then
    /// `COMPOUND_TVL__*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(&path)
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        info!(
            path = %path,
            chains = settings.chains.len(),
            deployments = settings.deployments.len(),
            "Configuration loaded"
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (chain, settings) in &self.chains {
            url::Url::parse(&settings.rpc_url)
                .map_err(|e| ConfigError::Message(format!("invalid rpc_url for {}: {}", chain, e)))?;
        }

        let mut seen = HashSet::new();
        for deployment in &self.deployments {
            deployment
                .validate()
                .map_err(|e| ConfigError::Message(e.to_string()))?;

            if !self.chains.contains_key(&deployment.chain) {
                return Err(ConfigError::Message(format!(
                    "deployment {} uses chain {} which has no rpc_url",
                    deployment.name, deployment.chain
                )));
            }
            if !seen.insert((deployment.name.as_str(), deployment.chain.as_str())) {
                return Err(ConfigError::Message(format!(
                    "deployment {} is listed twice for {}",
                    deployment.name, deployment.chain
                )));
            }
        }
        Ok(())
    }
}
