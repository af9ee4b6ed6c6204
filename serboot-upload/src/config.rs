// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Optional `serboot.toml` settings, layered under the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "serboot.toml";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub chunk_size: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = std::fs::read_to_string(path)?;
        toml::from_str(&config).map_err(Into::into)
    }

    /// Load `explicit` if given, otherwise `serboot.toml` in the working
    /// directory when it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, Error> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Effective connection settings after layering CLI, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub chunk_size: usize,
}

impl Settings {
    pub fn resolve(cli: &Config, file: &Config) -> Self {
        Self {
            port: cli.port.clone().or_else(|| file.port.clone()),
            baud_rate: cli.baud_rate.or(file.baud_rate).unwrap_or(DEFAULT_BAUD_RATE),
            timeout_ms: cli.timeout_ms.or(file.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS),
            chunk_size: cli.chunk_size.or(file.chunk_size).unwrap_or(DEFAULT_CHUNK_SIZE),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Toml(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "failed to read config file: {e}"),
            Error::Toml(e) => write!(f, "config file format error in TOML: {e}"),
        }
    }
}

impl std::error::Error for Error {}
