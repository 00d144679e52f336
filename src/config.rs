//! Configuration loading and persistence.
//!
//! The configuration lives in `kiosk.json` inside the data directory.
//! Environment variables override file values.

// Rust guideline compliant 2026-02

use std::fmt;
use std::str::FromStr;
use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants;

/// What the loader does when a plugin fails to load.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Log the failure, skip the plugin and keep loading.
    #[default]
    Isolate,
    /// Abort the whole batch on the first failure.
    FailFast,
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolate => write!(f, "isolate"),
            Self::FailFast => write!(f, "fail_fast"),
        }
    }
}

impl FromStr for LoadPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "isolate" => Ok(Self::Isolate),
            "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => bail!("Unknown load policy '{other}'"),
        }
    }
}

/// Configuration for the kiosk shell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Data directory (config, log, keymap, user plugins). Not serialized.
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Directories scanned for user plugins, in order.
    pub plugin_dirs: Vec<PathBuf>,
    /// Plugin load failure policy.
    pub load_policy: LoadPolicy,
    /// IR keymap edited by the configurator.
    pub keymap_file: PathBuf,
    /// Virtual terminal the kiosk runs on (returned to after the system log).
    pub kiosk_vt: u16,
    /// evdev input devices monitored for the `key` event list.
    pub input_devices: Vec<PathBuf>,
    /// Remote-control device to learn from (`/sys/class/rc/rcN`); discovered
    /// when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_device: Option<PathBuf>,
    /// Run privileged commands through `sudo -n`.
    pub use_sudo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_data_dir(Self::default_data_dir())
    }
}

impl Config {
    /// Default configuration rooted at `data_dir`.
    #[must_use]
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            plugin_dirs: vec![data_dir.join(constants::PLUGINS_DIR)],
            keymap_file: data_dir.join(constants::KEYMAP_FILE),
            data_dir,
            load_policy: LoadPolicy::default(),
            kiosk_vt: constants::DEFAULT_KIOSK_VT,
            input_devices: Vec::new(),
            ir_device: None,
            use_sudo: true,
        }
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("KIOSK_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .map(|d| d.join("kiosk"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns the data directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `KIOSK_DIR` env var: explicit override
    /// 2. Default: platform data dir (Linux: ~/.local/share/kiosk)
    pub fn data_dir() -> Result<PathBuf> {
        let dir = Self::default_data_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let data_dir = Self::data_dir()?;
        let mut config = Self::load_from_dir(&data_dir).unwrap_or_else(|e| {
            log::debug!("Using default configuration: {e:#}");
            Self::with_data_dir(data_dir.clone())
        });
        config.data_dir = data_dir;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_dir(data_dir: &std::path::Path) -> Result<Self> {
        let config_path = data_dir.join(constants::CONFIG_FILE);
        if !config_path.exists() {
            bail!("Config file not found");
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dirs) = std::env::var("KIOSK_PLUGIN_DIRS") {
            self.plugin_dirs = std::env::split_paths(&dirs).collect();
        }

        if let Ok(policy) = std::env::var("KIOSK_LOAD_POLICY") {
            match policy.parse() {
                Ok(policy) => self.load_policy = policy,
                Err(e) => log::warn!("Ignoring KIOSK_LOAD_POLICY: {e}"),
            }
        }

        if let Ok(file) = std::env::var("KIOSK_KEYMAP_FILE") {
            self.keymap_file = PathBuf::from(file);
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join(constants::CONFIG_FILE);
        fs::write(&config_path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_policy_parsing() {
        assert_eq!("isolate".parse::<LoadPolicy>().ok(), Some(LoadPolicy::Isolate));
        assert_eq!("fail-fast".parse::<LoadPolicy>().ok(), Some(LoadPolicy::FailFast));
        assert_eq!("FAIL_FAST".parse::<LoadPolicy>().ok(), Some(LoadPolicy::FailFast));
        assert!("retry".parse::<LoadPolicy>().is_err());
    }

    #[test]
    fn test_defaults_under_data_dir() {
        let config = Config::with_data_dir(PathBuf::from("/srv/kiosk"));
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("/srv/kiosk/plugins")]);
        assert_eq!(config.keymap_file, PathBuf::from("/srv/kiosk/rc-keymap.toml"));
        assert_eq!(config.load_policy, LoadPolicy::Isolate);
        assert_eq!(config.kiosk_vt, 7);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut config = Config::with_data_dir(dir.path().to_path_buf());
        config.load_policy = LoadPolicy::FailFast;
        config.kiosk_vt = 2;
        config.save().expect("Should save config");

        let loaded = Config::load_from_dir(dir.path()).expect("Should load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        fs::write(
            dir.path().join(constants::CONFIG_FILE),
            r#"{"load_policy": "fail_fast"}"#,
        )
        .expect("Should write config");

        let loaded = Config::load_from_dir(dir.path()).expect("Should load config");
        assert_eq!(loaded.load_policy, LoadPolicy::FailFast);
        assert!(loaded.use_sudo);
    }
}
