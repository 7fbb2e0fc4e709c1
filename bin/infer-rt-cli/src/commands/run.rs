// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `infer-rt run` command: execute inference on a manifest model.
//!
//! Inputs are filled with a constant value; static ports use their
//! declared shape, dynamic ports their smallest admissible shape.

use model_graph::PortInfo;
use runtime::{InferRequest, InferStatus, RuntimeConfig};
use std::path::PathBuf;
use tensor_core::{Dimension, Shape, Tensor};

pub fn execute(
    model: PathBuf,
    fill: f32,
    requests: usize,
    pipelined: bool,
    mut config: RuntimeConfig,
) -> anyhow::Result<()> {
    super::banner("infer-rt · Inference Runner");

    config.num_requests = requests.max(1);

    println!("  Config:");
    println!("   Model:     {}", model.display());
    println!("   Device:    {}", config.device);
    println!("   Requests:  {}", config.num_requests);
    println!("   Mode:      {}", if pipelined { "pipelined async" } else { "sync" });
    println!();

    let graph = super::load_graph(&model)?;
    println!("  {}", graph.summary());
    println!();

    let (compiled, pool) = runtime::load(graph, &config)?;

    let inputs: Vec<(String, Tensor)> = compiled
        .inputs()
        .iter()
        .map(|port| filled_tensor(port, fill))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if pipelined {
        for request in &pool {
            request.start_async_with(inputs.clone())?;
        }
        for (i, request) in pool.iter().enumerate() {
            let status = request.wait();
            anyhow::ensure!(
                status == InferStatus::Ok,
                "request {i} finished with {status}: {}",
                request.last_error().unwrap_or_default(),
            );
            println!("  request {i}: {status}");
        }
        print_outputs(&pool[0]);
    } else {
        let request = &pool[0];
        request.infer_with(inputs)?;
        print_outputs(request);
    }

    if config.enable_profiling {
        println!();
        println!("  {}", pool[0].profiling_info().summary());
    }

    Ok(())
}

/// Builds a constant-filled tensor matching the port's declaration.
fn filled_tensor(port: &PortInfo, fill: f32) -> anyhow::Result<(String, Tensor)> {
    anyhow::ensure!(
        port.dtype == tensor_core::DType::F32,
        "input port '{}' is {}, only f32 inputs can be auto-filled",
        port.name,
        port.dtype,
    );
    if !port.shape.is_static() {
        tracing::warn!(
            "input port '{}' is dynamic; filling its smallest admissible shape",
            port.name,
        );
    }
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
    Ok((port.name.clone(), Tensor::full_f32(shape, fill)))
}

fn print_outputs(request: &InferRequest) {
    println!();
    println!("  Outputs:");
    for (port, tensor) in request.outputs().iter() {
        if tensor.dtype() != tensor_core::DType::F32 {
            println!("   {} {} ({})", port.name, tensor.shape(), tensor.dtype());
            continue;
        }
        let values = tensor.to_f32_vec();
        let shown = values.len().min(10);
        println!(
            "   {} {}: {:?}{}",
            port.name,
            tensor.shape(),
            &values[..shown],
            if values.len() > shown { " ..." } else { "" },
        );
    }
}
