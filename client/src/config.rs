// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest allowed delay between two sync cycles
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Longest allowed delay between two sync cycles
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the match server
    pub server_url: String,
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Consecutive transport failures tolerated by the sync loop
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_event_buffer_size() -> usize {
    256
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            poll_interval: default_poll_interval(),
            max_retries: default_max_retries(),
            request_timeout: default_request_timeout(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl ClientConfig {
    /// Poll interval clamped to the supported range
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }

    /// Retry budget; zero would stop the loop before its first attempt
    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.max(1)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "phantomgo", "phantomgo")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("client.toml"))
}

pub fn load_config() -> Result<ClientConfig> {
    let config_path = get_config_path().context("Failed to determine config path")?;
    load_config_from(&config_path)
}

/// Load a config file, writing the defaults out when it does not exist yet
pub fn load_config_from(config_path: &Path) -> Result<ClientConfig> {
    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default at: {}",
            config_path.display()
        );

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = ClientConfig::default();
        let toml_content = toml::to_string_pretty(&default_config)
            .context("Failed to serialize default config")?;

        fs::write(config_path, toml_content).context("Failed to write default config file")?;

        return Ok(default_config);
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    toml::from_str::<ClientConfig>(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

pub fn save_config(config: &ClientConfig, config_path: &Path) -> Result<()> {
    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(config_path, toml_content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    tracing::info!("Saved config to: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.event_buffer_size, 256);
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let mut config = ClientConfig {
            poll_interval: Duration::from_millis(200),
            ..ClientConfig::default()
        };
        assert_eq!(config.effective_poll_interval(), MIN_POLL_INTERVAL);

        config.poll_interval = Duration::from_secs(30);
        assert_eq!(config.effective_poll_interval(), MAX_POLL_INTERVAL);
    }

    #[test]
    fn test_humantime_fields() {
        let config: ClientConfig = toml::from_str(
            r#"
            server_url = "http://go.example:8080"
            poll_interval = "1500ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_load_creates_default_then_round_trips() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("nested").join("client.toml");

        let created = load_config_from(&config_path)?;
        assert!(config_path.exists());
        assert_eq!(created, ClientConfig::default());

        let edited = ClientConfig {
            server_url: "http://other:4000".to_string(),
            max_retries: 5,
            ..created
        };
        save_config(&edited, &config_path)?;
        assert_eq!(load_config_from(&config_path)?, edited);

        Ok(())
    }
}
