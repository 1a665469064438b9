//! Configuration for the bleloc CLI.
//!
//! Stored in ~/.bleloc/config.yaml. Relative paths inside the file are
//! resolved against the file's directory.

use std::path::{Path, PathBuf};

use bleloc_locator::{LocatorConfig, Strategy};
use bleloc_similarity::Metric;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".bleloc";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fingerprint table (CSV).
    pub dataset: PathBuf,
    /// Median profile document (JSON).
    pub profiles: PathBuf,
    pub k: usize,
    pub strategy: Strategy,
    pub metric: Metric,
    pub batch_size: u32,
    /// HTTP listen address, e.g. `:8080` or `127.0.0.1:8080`.
    pub listen: String,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let locator = LocatorConfig::default();
        Self {
            dataset: PathBuf::from("data/fingerprints.csv"),
            profiles: PathBuf::from("data/median_data.json"),
            k: locator.k,
            strategy: locator.strategy,
            metric: locator.metric,
            batch_size: locator.batch_size,
            listen: ":8080".to_string(),
            config_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.resolve(&self.dataset)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.resolve(&self.profiles)
    }

    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            k: self.k,
            strategy: self.strategy,
            metric: self.metric,
            batch_size: self.batch_size,
        }
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        match self.config_path.parent() {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p.to_path_buf(),
        }
    }
}

/// Loads the configuration, creating a default file on first run.
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.config_path = config_path;
    Ok(cfg)
}
