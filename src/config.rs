//! Session configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_port() -> u16 {
    50505
}

fn default_manifest_path() -> String {
    "deps.js".into()
}

fn default_core_module() -> String {
    "runtime.core".into()
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

/// Session configuration parsed from `config.toml` or assembled from CLI
/// flags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Remote host name or address running the embedded engine server.
    pub host: String,
    /// TCP port the engine server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Compiler output directory, shared with the remote host through the
    /// bulk volume. Stack-frame paths resolve against this root.
    pub output_dir: PathBuf,
    /// Dependency manifest path, relative to `output_dir`.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Core runtime module loaded during bootstrap.
    #[serde(default = "default_core_module")]
    pub core_module: String,
    /// Seconds to wait for the TCP connect before giving up.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl SessionConfig {
    /// Assemble a configuration from the required fields, using defaults
    /// for the rest.
    #[must_use]
    pub fn new(host: String, output_dir: PathBuf) -> Self {
        Self {
            host,
            port: default_port(),
            output_dir,
            manifest_path: default_manifest_path(),
            core_module: default_core_module(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// `host:port` address string for the TCP connect.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Validate field constraints and canonicalize `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a field is out of range or the
    /// output directory does not exist.
    pub fn validate(&mut self) -> Result<()> {
        if self.host.is_empty() {
            return Err(AppError::Config("host must not be empty".into()));
        }

        if self.port == 0 {
            return Err(AppError::Config("port must be greater than zero".into()));
        }

        let canonical_output = self
            .output_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("output_dir invalid: {err}")))?;
        self.output_dir = canonical_output;

        Ok(())
    }
}
