// Configuration save/restore functionality

use crate::snapshot::{ConnectionFilter, DEFAULT_PROCESS_CACHE_TTL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_DIR: &str = ".config/netstatview";
const CONFIG_FILE: &str = "config.json";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How often the connection table is polled
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long resolved process names are cached
    #[serde(default = "default_process_cache_ttl_secs")]
    pub process_cache_ttl_secs: u64,

    /// Preferred connection table backend
    #[serde(default)]
    pub preferred_backend: Option<String>,

    /// Filter applied when no filter flags are given on the command line
    #[serde(default)]
    pub default_filter: ConnectionFilter,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_process_cache_ttl_secs() -> u64 {
    DEFAULT_PROCESS_CACHE_TTL.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            process_cache_ttl_secs: default_process_cache_ttl_secs(),
            preferred_backend: None,
            default_filter: ConnectionFilter::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        let config_dir = home.join(CONFIG_DIR);

        // Create config directory if it doesn't exist
        fs::create_dir_all(&config_dir).context(format!(
            "Failed to create config directory: {:?}",
            config_dir
        ))?;

        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            log::debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&path).context(format!("Failed to read config file: {:?}", path))?;

        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents).context(format!("Failed to write config file: {:?}", path))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin; tokio's interval panics on it
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn process_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.process_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.preferred_backend = Some("procfs".to_string());
        config.default_filter.remote_port = Some(443);

        let json = serde_json::to_string_pretty(&config).unwrap();
        println!("{}", json);

        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.poll_interval_ms, 500);
        assert_eq!(deserialized.preferred_backend.as_deref(), Some("procfs"));
        assert_eq!(deserialized.default_filter.remote_port, Some(443));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.process_cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.default_filter, ConnectionFilter::default());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_filter_deserializes() {
        let config: Config =
            serde_json::from_str(r#"{"default_filter": {"remote_addr": "1.1.1.1"}}"#).unwrap();
        assert_eq!(
            config.default_filter,
            ConnectionFilter {
                remote_addr: Some(Ipv4Addr::new(1, 1, 1, 1)),
                ..Default::default()
            }
        );
    }
}
