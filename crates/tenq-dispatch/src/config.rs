//! Dispatcher configuration
//!
//! # Environment Variables
//!
//! - `TENQ_DEVICE`: initial device (`auto`, `cpu`, `gpu`)
//! - `TENQ_PRELOAD_CONSTANTS`: register the constant set on creation
//!   (`1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`)
//! - `TENQ_STDERR_DIAGNOSTICS`: echo chain failures to stderr

use tenq_core::{ArgumentError, Result};
use tenq_exec::{Device, ExecHints};

pub const ENV_DEVICE: &str = "TENQ_DEVICE";
pub const ENV_PRELOAD_CONSTANTS: &str = "TENQ_PRELOAD_CONSTANTS";
pub const ENV_STDERR_DIAGNOSTICS: &str = "TENQ_STDERR_DIAGNOSTICS";

/// Dispatcher configuration
#[derive(Clone, Debug, PartialEq)]
pub struct DispatcherConfig {
    /// Register the preloaded constants on creation
    pub preload_constants: bool,
    /// Echo chain-tier failures to stderr as well as the log
    pub stderr_diagnostics: bool,
    /// Engine hints
    pub hints: ExecHints,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            preload_constants: true,
            stderr_diagnostics: true,
            hints: ExecHints::default(),
        }
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ArgumentError::Parameter {
            op: var.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }
        .into()),
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the `TENQ_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`DispatcherConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(device) = lookup(ENV_DEVICE) {
            config.hints.device = device.parse::<Device>()?;
        }
        if let Some(flag) = lookup(ENV_PRELOAD_CONSTANTS) {
            config.preload_constants = parse_flag(ENV_PRELOAD_CONSTANTS, &flag)?;
        }
        if let Some(flag) = lookup(ENV_STDERR_DIAGNOSTICS) {
            config.stderr_diagnostics = parse_flag(ENV_STDERR_DIAGNOSTICS, &flag)?;
        }
        Ok(config)
    }

    pub fn with_preload_constants(mut self, preload: bool) -> Self {
        self.preload_constants = preload;
        self
    }

    pub fn with_stderr_diagnostics(mut self, enabled: bool) -> Self {
        self.stderr_diagnostics = enabled;
        self
    }

    pub fn with_hints(mut self, hints: ExecHints) -> Self {
        self.hints = hints;
        self
    }

    /// Shorthand for the device hint.
    pub fn with_device(mut self, device: Device) -> Self {
        self.hints.device = device;
        self
    }
}
