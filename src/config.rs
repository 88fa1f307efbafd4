use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result};

fn default_num_workers() -> usize {
    4
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_retention() -> usize {
    100
}

/// Runtime configuration for the orchestrator.
///
/// Loaded from `~/.taskforge/config.toml` when present; every field has a
/// default so a missing file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of concurrent workers in the pool.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// How long `stop()` waits for each worker to finish, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// How many terminal tasks `clear_completed_tasks` keeps by default.
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            retention: default_retention(),
        }
    }
}

impl OrchestratorConfig {
    pub fn forge_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskforge"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::forge_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("OrchestratorConfig::load path={}", path.display());
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        debug!(
            "Config loaded: num_workers={}, shutdown_timeout_secs={}, retention={}",
            config.num_workers, config.shutdown_timeout_secs, config.retention
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let forge_dir = Self::forge_dir()?;
        if !forge_dir.exists() {
            fs::create_dir_all(&forge_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
