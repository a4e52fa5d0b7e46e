// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default search paths for a config file name
/// (current directory → XDG config → /etc).
pub fn config_search_paths(file_name: &str) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(file_name)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("siggen").join(file_name));
    }
    paths.push(PathBuf::from("/etc/siggen").join(file_name));
    paths
}

/// Trait for configuration structs backed by a TOML file.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// File name looked up in every search directory (e.g. `"siggen.toml"`).
    fn config_filename() -> &'static str;

    fn default_search_paths() -> Vec<PathBuf> {
        config_search_paths(Self::config_filename())
    }

    /// Load from a specific path. Missing keys take their serde defaults.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load the first existing file from the default search paths.
    ///
    /// Returns `(Default::default(), None)` when none exists.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in Self::default_search_paths() {
            if path.exists() {
                let cfg = Self::load_from_file(&path)?;
                return Ok((cfg, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }
}
