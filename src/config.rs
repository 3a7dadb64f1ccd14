//! # Configuration
//!
//! Settings come from three places, later ones winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file passed with `--config`,
//! 3. individual command-line flags.
//!
//! ```toml
//! [http]
//! addr = "0.0.0.0:3000"
//!
//! [shutdown]
//! timeout_secs = 10
//! ```
//!
//! Log verbosity is controlled separately through `RUST_LOG`.

use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Runs the sample components under the lifecycle orchestrator")]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address the HTTP endpoint listens on.
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,

    /// Upper bound for the whole shutdown sequence, in seconds. 0 disables it.
    #[arg(long)]
    pub shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cant read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cant parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ShutdownConfig {
    /// `None` when the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the effective configuration from `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(addr) = args.http_addr {
            config.http.addr = addr;
        }
        if let Some(secs) = args.shutdown_timeout_secs {
            config.shutdown.timeout_secs = secs;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(&Args::default()).unwrap();
        assert_eq!(config.http.addr.port(), 3000);
        assert_eq!(config.shutdown.timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str("[shutdown]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.shutdown.timeout(), None);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<AppConfig>("[http]\nport = 1\n").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!("lifecycle-recipe-{}.toml", std::process::id()));
        std::fs::write(&path, "[http]\naddr = \"127.0.0.1:8080\"\n").unwrap();

        let args = Args::parse_from([
            "lifecycle-recipe",
            "--config",
            path.to_str().unwrap(),
            "--shutdown-timeout-secs",
            "3",
        ]);
        let config = AppConfig::load(&args).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.http.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.shutdown.timeout_secs, 3);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/lifecycle.toml")),
            ..Args::default()
        };
        let err = AppConfig::load(&args).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
