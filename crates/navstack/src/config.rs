//! Navigation configuration
//!
//! Layered as defaults, then an optional TOML file, then `NAVSTACK_*`
//! environment variables, then validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{NavigationError, Result};

/// Default debounce window: one frame at 60 Hz.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 16;

/// Upper bound on the debounce window. Notifications must stay prompt.
pub const MAX_DEBOUNCE_WINDOW_MS: u64 = 1_000;

/// Default capacity of the bus's async broadcast stream.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "NAVSTACK_";

/// Tunables shared by every stack built from one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Window in which stack mutations coalesce into one broadcast
    pub debounce_window_ms: u64,
    /// Buffered broadcasts per async receiver before it lags
    pub bus_capacity: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl NavigationConfig {
    /// Debounce window as a `Duration`
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NavigationError::invalid_config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NavigationError::config_io(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `NAVSTACK_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `NAVSTACK_*` overrides from an explicit variable set
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DEBOUNCE_WINDOW_MS" => self.debounce_window_ms = parse_var(&key, &value)?,
                "BUS_CAPACITY" => self.bus_capacity = parse_var(&key, &value)?,
                _ => tracing::debug!(key = %key, "Ignoring unknown navigation override"),
            }
        }
        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bus_capacity == 0 {
            return Err(NavigationError::invalid_config(
                "bus_capacity must be greater than zero",
            ));
        }
        if self.debounce_window_ms > MAX_DEBOUNCE_WINDOW_MS {
            return Err(NavigationError::invalid_config(format!(
                "debounce_window_ms {} exceeds maximum {MAX_DEBOUNCE_WINDOW_MS}",
                self.debounce_window_ms
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| NavigationError::invalid_config(format!("{key}={value}: {e}")))
}
