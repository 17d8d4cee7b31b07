//! Global CLI configuration management
//!
//! Stores the account tag, origin certificate location and directory
//! location in ~/.tunnelctl/config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Global CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Origin certificate; credentials files are written next to it
    #[serde(default = "default_origin_cert")]
    pub origin_cert: PathBuf,

    /// Account tag recorded in every credentials file
    #[serde(default)]
    pub account_tag: String,

    /// Where the local tunnel directory keeps its records
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Point of presence reported by `run`
    #[serde(default = "default_colo_name")]
    pub colo_name: String,
}

fn default_origin_cert() -> PathBuf {
    PathBuf::from("~/.tunnelctl/cert.pem")
}

fn default_directory() -> PathBuf {
    PathBuf::from("~/.tunnelctl/directory")
}

fn default_colo_name() -> String {
    "local".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            origin_cert: default_origin_cert(),
            account_tag: String::new(),
            directory: default_directory(),
            colo_name: default_colo_name(),
        }
    }
}

impl CliConfig {
    /// Apply command-line (or environment) overrides on top of the file
    pub fn with_overrides(mut self, origin_cert: Option<PathBuf>, directory: Option<PathBuf>) -> Self {
        if let Some(origin_cert) = origin_cert {
            self.origin_cert = origin_cert;
        }
        if let Some(directory) = directory {
            self.directory = directory;
        }
        self
    }
}

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".tunnelctl").join("config.json"))
    }

    /// Load the configuration from disk
    pub fn load() -> Result<CliConfig> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the configuration from `path`, defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<CliConfig> {
        if !path.exists() {
            return Ok(CliConfig::default());
        }

        let json =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;

        let config: CliConfig = serde_json::from_str(&json)
            .context(format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Save the configuration to `path`, creating its directory
    pub fn save_to(path: &Path, config: &CliConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(path, json).context(format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Set the account tag written into new credentials files
    pub fn set_account_tag(path: &Path, tag: String) -> Result<CliConfig> {
        let mut config = Self::load_from(path)?;
        config.account_tag = tag;
        Self::save_to(path, &config)?;
        Ok(config)
    }
}
