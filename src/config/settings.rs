//! Broker settings and data search paths

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{config, defaults, env};

fn default_write_delay_ms() -> u64 {
    defaults::WRITE_DELAY_MS
}

fn default_persist() -> bool {
    true
}

fn default_launch_helper() -> String {
    defaults::LAUNCH_HELPER.to_string()
}

/// Daemon settings, stored as JSON next to the shortcuts file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Debounce delay between the last mutation and the shortcut write-out
    #[serde(default = "default_write_delay_ms")]
    pub write_delay_ms: u64,

    /// Keep shortcuts across restarts
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// Override for the persisted shortcuts location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcuts_file: Option<PathBuf>,

    /// Searched after the XDG data directories for launcher files
    #[serde(default)]
    pub extra_data_dirs: Vec<PathBuf>,

    #[serde(default = "default_launch_helper")]
    pub launch_helper: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            write_delay_ms: default_write_delay_ms(),
            persist: default_persist(),
            shortcuts_file: None,
            extra_data_dirs: Vec::new(),
            launch_helper: default_launch_helper(),
        }
    }
}

fn config_dir() -> PathBuf {
    #[cfg(not(test))]
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    #[cfg(test)]
    let mut path = std::env::temp_dir().join("shortcut-broker-test");

    path.push(config::APP_DIR);
    path
}

impl BrokerConfig {
    pub fn path() -> PathBuf {
        config_dir().join(config::FILENAME)
    }

    /// Load settings from the default location or create them
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load settings from JSON, writing a default file when none exists
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default config at {:?}",
                config_path
            );
            let config = BrokerConfig::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        let config: BrokerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", config_path))?;

        debug!(?config, "Loaded broker config");
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json_string =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        fs::write(config_path, json_string)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }

    /// Where persisted shortcuts live
    pub fn shortcuts_path(&self) -> PathBuf {
        self.shortcuts_file
            .clone()
            .unwrap_or_else(|| config_dir().join(config::SHORTCUTS_FILENAME))
    }

    pub fn search_paths(&self) -> SearchPaths {
        SearchPaths::from_env(&self.extra_data_dirs)
    }
}

/// Ordered list of data directories, most specific first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPaths {
    data_dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(data_dirs: Vec<PathBuf>) -> Self {
        Self { data_dirs }
    }

    /// User data dir, then `XDG_DATA_DIRS`, then `extra`
    pub fn from_env(extra: &[PathBuf]) -> Self {
        let mut data_dirs: Vec<PathBuf> = dirs::data_dir().into_iter().collect();

        let system_dirs = std::env::var(env::DATA_DIRS)
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| env::DEFAULT_DATA_DIRS.to_string());
        data_dirs.extend(
            system_dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        );
        data_dirs.extend(extra.iter().cloned());
        data_dirs.dedup();

        Self { data_dirs }
    }

    pub fn data_dirs(&self) -> &[PathBuf] {
        &self.data_dirs
    }

    /// `<dir>/<subdir>` for every data dir that has one
    pub fn existing_subdirs(&self, subdir: &str) -> Vec<PathBuf> {
        self.data_dirs
            .iter()
            .map(|dir| dir.join(subdir))
            .filter(|dir| dir.is_dir())
            .collect()
    }

    /// First `<dir>/<subdir>/<file_name>` that exists
    pub fn locate(&self, subdir: &str, file_name: &str) -> Option<PathBuf> {
        self.data_dirs
            .iter()
            .map(|dir| dir.join(subdir).join(file_name))
            .find(|path| path.exists())
    }
}
