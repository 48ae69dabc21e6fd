// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform config dir.
const APP_DIR: &str = "arena-remote";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Tilt control settings.
    pub tilt: TiltConfig,

    /// Message log settings.
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter alias advertised to peers.
    pub device_name: String,

    /// Service name registered for the serial profile.
    pub service_name: String,

    /// RFCOMM channel for both listening and outbound connects.
    pub channel: u8,

    /// Delay before listening again after a session drops.
    pub restart_delay_ms: u64,

    /// Upper bound on a single write; 0 disables the bound.
    pub write_timeout_ms: u64,

    /// Start listening for the robot as soon as the app starts.
    pub listen_on_startup: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_name: "Arena Remote".to_string(),
            service_name: "BluetoothSerial".to_string(),
            channel: 1,
            restart_delay_ms: 1000,
            write_timeout_ms: 2000,
            listen_on_startup: true,
        }
    }
}

impl BluetoothConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltConfig {
    /// Dead-zone on each axis, in m/s^2.
    pub threshold: f32,

    /// Minimum interval between two tilt commands.
    pub interval_ms: u64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            interval_ms: 500,
        }
    }
}

impl TiltConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Number of message log lines kept for display.
    pub max_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { max_lines: 20 }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from the default location or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth]\nchannel = 3\nwrite_timeout_ms = 0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bluetooth.channel, 3);
        assert_eq!(config.bluetooth.write_timeout(), None);
        assert_eq!(config.bluetooth.restart_delay(), Duration::from_secs(1));
        assert_eq!(config.tilt, TiltConfig::default());
        assert_eq!(config.log.max_lines, 20);
    }
}
