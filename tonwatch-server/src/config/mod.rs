//! Configuration module for tonwatch-server.
//!
//! Handles loading configuration from the TOML file and applying CLI
//! overrides.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, then apply CLI overrides. A missing file is not
    /// an error; every field has a usable default.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let mut config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.config_path.display(), "config file not found, using defaults");
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loader = ConfigLoader::new("/nonexistent/tonwatch.toml", None);
        let config = loader.load().unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn listen_override_wins_over_file_default() {
        let override_addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loader = ConfigLoader::new("/nonexistent/tonwatch.toml", Some(override_addr));
        let config = loader.load().unwrap();
        assert_eq!(config.server.listen, override_addr);
    }
}
