//! Client configuration management
//!
//! Everything the original hard-coded is a config value here: device port
//! and credential, both timeouts, the probe cap, and the log level. The
//! file lives at `~/.config/zk-attendance/config.toml`; `--save-config`
//! writes the defaults there as a starting point.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use common::{
    DEFAULT_MAX_IN_FLIGHT, DEFAULT_PORT, ScanSettings, SessionSettings,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client: ClientSection,
    pub device: DeviceSection,
    pub scan: ScanSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Vendor protocol port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Communication password the terminal was provisioned with; 0 for a
    /// terminal without one.
    #[serde(default)]
    pub password: u32,
    /// Bound on each request/response exchange.
    #[serde(default = "default_session_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Per-probe connect timeout.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Concurrent probe cap.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_timeout_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client: ClientSection {
                log_level: "info".to_string(),
            },
            device: DeviceSection {
                port: default_port(),
                password: 0,
                timeout_ms: default_session_timeout_ms(),
            },
            scan: ScanSection {
                probe_timeout_ms: default_probe_timeout_ms(),
                max_in_flight: default_max_in_flight(),
            },
        }
    }
}

impl ClientConfig {
    /// Default config file location (`~/.config/zk-attendance/config.toml`).
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("zk-attendance").join("config.toml")
        } else {
            PathBuf::from(".config/zk-attendance/config.toml")
        }
    }

    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_else(|error| {
                tracing::warn!(%error, "ignoring unreadable config file");
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("serializing configuration")?;
        fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            port: self.device.port,
            probe_timeout: Duration::from_millis(self.scan.probe_timeout_ms),
            max_in_flight: self.scan.max_in_flight.max(1),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            port: self.device.port,
            password: self.device.password,
            timeout: Duration::from_millis(self.device.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vendor_conventions() {
        let config = ClientConfig::default();
        assert_eq!(config.device.port, 4370);
        assert_eq!(config.scan_settings().max_in_flight, 50);
        assert_eq!(config.session_settings().timeout, Duration::from_secs(5));
        assert_eq!(
            config.scan_settings().probe_timeout,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::default();
        config.device.password = 123;
        config.scan.max_in_flight = 8;
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.device.password, 123);
        assert_eq!(loaded.scan.max_in_flight, 8);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[client]\nlog_level = \"debug\"\n\n[device]\npassword = 7\n\n[scan]\n",
        )
        .unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.client.log_level, "debug");
        assert_eq!(loaded.device.password, 7);
        assert_eq!(loaded.device.port, 4370);
        assert_eq!(loaded.scan.max_in_flight, 50);
    }

    #[test]
    fn zero_probe_cap_is_clamped() {
        let mut config = ClientConfig::default();
        config.scan.max_in_flight = 0;
        assert_eq!(config.scan_settings().max_in_flight, 1);
    }
}
