// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # infer-rt
//!
//! Command-line interface for the inference request runtime.
//!
//! ## Usage
//! ```bash
//! # Run inference on a manifest model
//! infer-rt run --model ./models/fc-classifier/model.json --fill 0.5
//!
//! # Pipeline asynchronously across a request pool
//! infer-rt run --model ./model.json --requests 4 --pipelined
//!
//! # Inspect model structure
//! infer-rt inspect --model ./model.json
//!
//! # Measure sync vs async throughput
//! infer-rt bench --model ./model.json --iterations 100 --requests 4
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "infer-rt",
    about = "Inference request lifecycle runtime",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference on a manifest model.
    Run {
        /// Path to the model manifest (model.json).
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Constant value used to fill every input tensor.
        #[arg(long, default_value_t = 1.0)]
        fill: f32,

        /// Number of requests in the pool.
        #[arg(short, long, default_value_t = 1)]
        requests: usize,

        /// Submit asynchronously across the pool instead of running one
        /// synchronous request.
        #[arg(long)]
        pipelined: bool,
    },

    /// Inspect a model: ports, nodes, variables, weight sizes.
    Inspect {
        /// Path to the model manifest (model.json).
        #[arg(short, long)]
        model: std::path::PathBuf,
    },

    /// Measure synchronous vs. pipelined throughput.
    Bench {
        /// Path to the model manifest (model.json).
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Number of inferences per mode.
        #[arg(long, default_value_t = 100)]
        iterations: usize,

        /// Number of requests in the async pool.
        #[arg(short, long, default_value_t = 4)]
        requests: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => runtime::RuntimeConfig::from_file(path)?,
        None => runtime::RuntimeConfig::default(),
    };

    match cli.command {
        Commands::Run {
            model,
            fill,
            requests,
            pipelined,
        } => commands::run::execute(model, fill, requests, pipelined, config),
        Commands::Inspect { model } => commands::inspect::execute(model),
        Commands::Bench {
            model,
            iterations,
            requests,
        } => commands::bench::execute(model, iterations, requests, config),
    }
}
