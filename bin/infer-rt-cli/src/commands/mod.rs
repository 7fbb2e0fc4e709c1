// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CLI subcommand implementations.

pub mod bench;
pub mod inspect;
pub mod run;

use model_graph::{ModelGraph, ModelManifest, Validated};
use std::path::Path;

/// Initializes tracing based on the `-v` count. `RUST_LOG` wins when set.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads and validates a model manifest.
pub fn load_graph(path: &Path) -> anyhow::Result<ModelGraph<Validated>> {
    let manifest = ModelManifest::from_file(path).map_err(|e| {
        anyhow::anyhow!("failed to load manifest '{}': {e}", path.display())
    })?;
    Ok(manifest.into_graph()?)
}

/// Prints the standard banner box.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {title:<52} ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}
