// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `infer-rt bench` command: measure sync vs. pipelined throughput.

use runtime::{CompiledModel, InferStatus, RuntimeConfig};
use std::path::PathBuf;
use std::time::Instant;
use tensor_core::{Dimension, Shape, Tensor};

pub fn execute(
    model: PathBuf,
    iterations: usize,
    requests: usize,
    mut config: RuntimeConfig,
) -> anyhow::Result<()> {
    super::banner("infer-rt · Throughput Bench");

    // Profiling adds per-node timing overhead; keep the bench clean.
    config.enable_profiling = false;
    config.num_requests = requests.max(1);

    let graph = super::load_graph(&model)?;
    println!("  {}", graph.summary());
    println!("  Iterations: {iterations}, pool size: {}", config.num_requests);
    println!();

    let (compiled, pool) = runtime::load(graph, &config)?;
    let inputs = fill_inputs(&compiled)?;

    // ── Synchronous loop on one request ────────────────────────
    let request = &pool[0];
    for (name, tensor) in &inputs {
        request.set_tensor(name.as_str(), tensor.clone())?;
    }
    let start = Instant::now();
    for _ in 0..iterations {
        request.infer()?;
    }
    let sync_elapsed = start.elapsed();
    let sync_rate = iterations as f64 / sync_elapsed.as_secs_f64();
    println!(
        "  sync      : {:>8.1} infer/s ({:.2?} total)",
        sync_rate, sync_elapsed,
    );

    // ── Pipelined across the pool ──────────────────────────────
    for request in &pool {
        for (name, tensor) in &inputs {
            request.set_tensor(name.as_str(), tensor.clone())?;
        }
    }
    let rounds = iterations.div_ceil(pool.len());
    let start = Instant::now();
    for _ in 0..rounds {
        for request in &pool {
            request.start_async()?;
        }
        for request in &pool {
            anyhow::ensure!(request.wait() == InferStatus::Ok, "pipelined run failed");
        }
    }
    let async_elapsed = start.elapsed();
    let async_rate = (rounds * pool.len()) as f64 / async_elapsed.as_secs_f64();
    println!(
        "  pipelined : {:>8.1} infer/s ({:.2?} total)",
        async_rate, async_elapsed,
    );
    println!();
    println!("  speedup: {:.2}x", async_rate / sync_rate);

    Ok(())
}

fn fill_inputs(compiled: &CompiledModel) -> anyhow::Result<Vec<(String, Tensor)>> {
    compiled
        .inputs()
        .iter()
        .map(|port| {
            anyhow::ensure!(
                port.dtype == tensor_core::DType::F32,
                "input port '{}' is {}, only f32 models are benchable",
                port.name,
                port.dtype,
            );
            let shape = Shape::new(
                port.shape
                    .dims()
                    .iter()
                    .map(|d| match d {
                        Dimension::Fixed(n) => *n,
                        Dimension::Bounded { min, .. } => (*min).max(1),
                    })
                    .collect(),
            );
            Ok((port.name.clone(), Tensor::full_f32(shape, 0.5)))
        })
        .collect()
}
