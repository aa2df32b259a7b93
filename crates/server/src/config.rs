//! Server configuration

use anyhow::Result;
use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the fitted model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Service name reported by the health endpoints
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_model_dir() -> String {
    "models".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_service_name() -> String {
    "Endometriosis Prediction API".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            api_port: default_api_port(),
            service_name: default_service_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment (prefix `ENDO`)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENDO"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.model_dir, "models");
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.service_name, "Endometriosis Prediction API");
    }
}
