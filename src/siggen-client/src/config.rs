// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for the siggen client.
//!
//! Supports loading configuration from TOML files with the following search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./siggen.toml` (current directory)
//! 3. `~/.config/siggen/siggen.toml` (XDG config)
//! 4. `/etc/siggen/siggen.toml` (system-wide)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use siggen_app::{ConfigError, ConfigFile};
use siggen_core::{ChannelSettings, ModulationSettings};

use crate::session::SessionConfig;
use crate::transport::SerialTransport;

/// Top-level client configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub general: GeneralConfig,
    pub serial: SerialConfig,
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path (e.g. /dev/ttyUSB0), or `dummy` for the in-memory device.
    pub port: Option<String>,
    pub baud: u32,
    /// Inter-character read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Delay after opening the port before the first command, in milliseconds.
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: SerialTransport::DEFAULT_BAUD,
            read_timeout_ms: SerialTransport::DEFAULT_READ_TIMEOUT.as_millis() as u64,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// How long to wait for a reply, in milliseconds.
    pub response_timeout_ms: u64,
    /// Input poll interval while waiting, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 10_000,
            poll_interval_ms: 10,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                return Err("[serial].port must not be empty when set".to_string());
            }
        }
        if self.serial.baud == 0 {
            return Err("[serial].baud must be > 0".to_string());
        }
        if self.serial.read_timeout_ms == 0 {
            return Err("[serial].read_timeout_ms must be > 0".to_string());
        }
        if self.exchange.response_timeout_ms == 0 {
            return Err("[exchange].response_timeout_ms must be > 0".to_string());
        }
        if self.exchange.poll_interval_ms == 0 {
            return Err("[exchange].poll_interval_ms must be > 0".to_string());
        }
        if self.exchange.poll_interval_ms > self.exchange.response_timeout_ms {
            return Err(
                "[exchange].poll_interval_ms must not exceed response_timeout_ms".to_string(),
            );
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.read_timeout_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            settle: Duration::from_millis(self.serial.settle_ms),
            response_timeout: Duration::from_millis(self.exchange.response_timeout_ms),
            poll_interval: Duration::from_millis(self.exchange.poll_interval_ms),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        <Self as ConfigFile>::load_from_file(path)
    }

    /// Load configuration from the default search paths.
    /// Returns default config if no config file is found.
    pub fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        <Self as ConfigFile>::load_from_default_paths()
    }

    /// Generate an example configuration as a TOML string.
    pub fn example_toml() -> String {
        let example = ClientConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            serial: SerialConfig {
                port: Some("/dev/ttyUSB0".to_string()),
                ..Default::default()
            },
            exchange: ExchangeConfig::default(),
        };

        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ClientConfig {
    fn config_filename() -> &'static str {
        "siggen.toml"
    }
}

/// Full device setup for `siggen apply`, using the wire field names.
///
/// ```toml
/// [channel1]
/// type = "Sine"
/// frequency = 1000.0
///
/// [modulation]
/// type = "MFSK"
/// data = [1, 0, 1, 1]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyProfile {
    pub channel1: ChannelSettings,
    pub channel2: ChannelSettings,
    pub modulation: ModulationSettings,
}

impl ApplyProfile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }
}
