//! Shell configuration.
//!
//! Every field has a default, so an absent or partial TOML file is fine.
//! The shell only ever reads this file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::{ChannelConfig, ClockRate, Status};
use crate::error::{Result, ShellError};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MPSSE_SHELL_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "mpsse-shell.toml";

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Channel index to open.
    pub channel: u32,
    pub clock_rate: ClockRate,
    pub latency_timer_ms: u8,
    /// Raw option bits handed to channel initialization.
    pub channel_options: u32,
    pub prompt: String,
    /// Highlight reported errors on the console.
    pub color: bool,
    pub simulator: SimulatorConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            clock_rate: ClockRate::Fast,
            latency_timer_ms: 5,
            channel_options: 0,
            prompt: "MPSSE >".to_string(),
            color: true,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ShellError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
            .map_err(|e| ShellError::Config(format!("{}: {e}", path.display())))
    }

    /// Locate and load the config.
    ///
    /// Resolution order:
    /// 1. The path named by `MPSSE_SHELL_CONFIG` (must exist)
    /// 2. `mpsse-shell.toml` in the working directory, if present
    /// 3. Built-in defaults
    pub fn resolve() -> Result<(Self, Option<PathBuf>)> {
        let explicit = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::resolve_from(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    fn resolve_from(explicit: Option<&Path>, fallback: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        if fallback.is_file() {
            return Ok((Self::from_file(fallback)?, Some(fallback.to_path_buf())));
        }
        log::debug!("No config file found -- using defaults");
        Ok((Self::default(), None))
    }

    /// Settings for channel initialization.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            clock_rate: self.clock_rate,
            latency_timer_ms: self.latency_timer_ms,
            options: self.channel_options,
        }
    }
}

/// Devices attached to the simulated bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    pub devices: Vec<SimulatedDeviceConfig>,
}

/// One simulated I2C target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedDeviceConfig {
    /// 7-bit device address.
    pub address: u8,
    /// Initial register contents starting at register 0.
    #[serde(default)]
    pub registers: Vec<u8>,
    /// Status every transfer to this device fails with.
    #[serde(default)]
    pub fault: Option<Status>,
}
