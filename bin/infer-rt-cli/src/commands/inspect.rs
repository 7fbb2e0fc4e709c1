// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `infer-rt inspect` command: display model structure.

use std::path::PathBuf;

pub fn execute(model: PathBuf) -> anyhow::Result<()> {
    super::banner("infer-rt · Model Inspector");

    let graph = super::load_graph(&model)?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Model: {}", graph.name);
    println!("  Nodes: {}", graph.num_nodes());
    println!(
        "  Weights: {:.2} KB",
        graph.total_constant_bytes() as f64 / 1024.0,
    );
    println!();

    // ── Ports ──────────────────────────────────────────────────
    println!("  Inputs:");
    for port in &graph.inputs {
        println!("   {}", port.summary());
    }
    println!("  Outputs:");
    for port in &graph.outputs {
        println!("   {}", port.summary());
    }
    println!();

    // ── Variables ──────────────────────────────────────────────
    if graph.variables.is_empty() {
        println!("  Variables: none");
    } else {
        println!("  Variables:");
        for var in &graph.variables {
            println!(
                "   {} {} {} (init: {})",
                var.id,
                var.dtype,
                var.shape,
                if var.init.is_some() { "declared" } else { "zeros" },
            );
        }
    }
    println!();

    // ── Nodes ──────────────────────────────────────────────────
    println!("  Nodes:");
    for node in &graph.nodes {
        println!("   {}", node.summary());
    }

    Ok(())
}
