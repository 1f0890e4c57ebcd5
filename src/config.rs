//! Run configuration for the `sea16-emu` binary.
//!
//! Settings come from, lowest priority first:
//! 1. Built-in defaults
//! 2. A JSON file passed with `--config`
//! 3. The `SEA16_STEPS` environment variable
//! 4. Explicit command-line flags
//!
//! # Config File Format
//!
//! ```json
//! {
//!   "steps": 1000,
//!   "trace": true,
//!   "quirks": { "switchrange_discards_default": false }
//! }
//! ```
//!
//! Every field is optional.

use crate::cpu::Quirks;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default step budget.
pub const DEFAULT_STEPS: u64 = 20;

/// Environment variable that overrides the step budget.
pub const STEPS_ENV: &str = "SEA16_STEPS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of instructions to execute.
    pub steps: u64,
    /// Print the register line before every step.
    pub trace: bool,
    /// Print the final registers as JSON.
    pub dump_state: bool,
    /// Compatibility switches passed to the CPU.
    pub quirks: Quirks,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            trace: false,
            dump_state: false,
            quirks: Quirks::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(STEPS_ENV) {
            self.apply_steps_override(&value);
        }
    }

    fn apply_steps_override(&mut self, value: &str) {
        match value.trim().parse() {
            Ok(steps) => {
                log::info!("Using {}={} from environment", STEPS_ENV, steps);
                self.steps = steps;
            }
            Err(e) => log::warn!("Ignoring {}={:?}: {}", STEPS_ENV, value, e),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
