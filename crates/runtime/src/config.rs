// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! device = "reference"
//! num_requests = 2
//! enable_profiling = true
//! ```

use crate::{Backend, ReferenceBackend, RuntimeError};
use std::path::Path;

/// Configuration for compiling models and sizing request pools.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Device backend name: `"reference"` (aliases: `"interpreter"`, `"cpu"`).
    pub device: String,
    /// Number of requests created by [`crate::load`].
    #[serde(default = "default_num_requests")]
    pub num_requests: usize,
    /// Whether executions collect per-node profiling.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

fn default_num_requests() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Creates the device backend specified by this config.
    pub fn create_backend(&self) -> Result<Box<dyn Backend>, RuntimeError> {
        match self.device.to_lowercase().as_str() {
            "reference" | "interpreter" | "cpu" => Ok(Box::new(ReferenceBackend::new())),
            other => Err(RuntimeError::Config(format!(
                "unknown device '{other}'; expected 'reference'"
            ))),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            device: "reference".to_string(),
            num_requests: 1,
            enable_profiling: true,
        }
    }
}
