//! Server configuration.
//!
//! Values come from an optional YAML file named by `EMBER_CONFIG`, then
//! `LISTEN` and `KEEP_ALIVE` environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid KEEP_ALIVE value {0:?}")]
    InvalidKeepAlive(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub keep_alive_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub directories: Vec<PathBuf>,
}

/// Process-wide settings, fixed once the server starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    pub keep_alive_timeout_secs: u64,
}

impl ServerSettings {
    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            keep_alive_timeout_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            keep_alive_timeout_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl Config {
    /// Loads the file named by `EMBER_CONFIG` (defaults otherwise) and
    /// applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os("EMBER_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                Self::from_yaml_str(&text)?
            }
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        if let Ok(keep_alive) = std::env::var("KEEP_ALIVE") {
            cfg.server.keep_alive_timeout_secs = keep_alive
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidKeepAlive(keep_alive))?;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn settings(&self) -> ServerSettings {
        ServerSettings {
            keep_alive_timeout_secs: self.server.keep_alive_timeout_secs,
        }
    }
}
