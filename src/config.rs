//! Configuration management for powershell-out.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::arch::Architecture;
use crate::cli::Args;
use crate::execution::{ExecutionOptions, POWERSHELL_EXE};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PowerShell engine settings.
    pub powershell: PowershellSection,
    /// Execution defaults.
    pub execution: ExecutionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// PowerShell engine section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowershellSection {
    /// Executable to spawn.
    pub executable: String,
}

impl Default for PowershellSection {
    fn default() -> Self {
        Self {
            executable: POWERSHELL_EXE.to_string(),
        }
    }
}

/// Execution defaults section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Architecture override applied to every call.
    pub architecture: Option<Architecture>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(exe) = lookup("POWERSHELL_OUT_EXECUTABLE").filter(|v| !v.is_empty()) {
            self.powershell.executable = exe;
        }

        if let Some(arch) = lookup("POWERSHELL_OUT_ARCH") {
            let parsed = arch
                .parse::<Architecture>()
                .map_err(|_| ConfigError::InvalidValue("POWERSHELL_OUT_ARCH", arch))?;
            self.execution.architecture = Some(parsed);
        }

        if let Some(timeout) = lookup("POWERSHELL_OUT_TIMEOUT") {
            let parsed = timeout
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("POWERSHELL_OUT_TIMEOUT", timeout))?;
            self.execution.timeout_secs = Some(parsed);
        }

        if let Some(level) = lookup("POWERSHELL_OUT_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref exe) = args.executable {
            self.powershell.executable = exe.clone();
        }

        if args.architecture.is_some() {
            self.execution.architecture = args.architecture;
        }

        if args.timeout_secs.is_some() {
            self.execution.timeout_secs = args.timeout_secs;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Base execution options derived from this configuration.
    pub fn execution_options(&self) -> ExecutionOptions {
        let mut options = ExecutionOptions::new();
        options.architecture = self.execution.architecture;
        if let Some(secs) = self.execution.timeout_secs {
            options = options.timeout(Duration::from_secs(secs));
        }
        options
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid value in an environment variable.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, value) => write!(f, "invalid value for {}: '{}'", name, value),
        }
    }
}

impl std::error::Error for ConfigError {}
