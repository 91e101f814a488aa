//! Daemon configuration.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory holding the index database and the hash store.
    pub data_dir: PathBuf,
    /// API configuration.
    #[serde(default)]
    pub api: ApiConfig,
}

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API bind address.
    pub bind_address: String,
    /// Basic-auth password; unset disables authentication.
    pub password: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9980".to_string(),
            password: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".sia-explorer"),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file (if present) and apply CLI
    /// overrides.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("failed to read config file")?;
            toml::from_str(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        if let Some(ref data_dir) = args.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(ref api_bind) = args.api_bind {
            config.api.bind_address = api_bind.clone();
        }
        if let Some(ref password) = args.api_password {
            config.api.password = Some(password.clone());
        }

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
