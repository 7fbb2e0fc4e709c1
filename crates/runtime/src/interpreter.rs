// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference CPU backend: a sequential interpreter over the model graph.
//!
//! Nodes are evaluated in topological order; every evaluation produces a
//! fresh output tensor, so output shapes track the actual input shapes of
//! each execution (dynamic-shape propagation falls out of the evaluation
//! itself). Variable writes staged by `assign` nodes are committed only
//! when the whole execution succeeds.

use crate::{Backend, Executable, Execution, ExecutionProfile, RuntimeError, VariableStore};
use model_graph::{ModelGraph, NodeDef, OpKind, Validated};
use std::sync::Arc;
use std::time::Instant;
use tensor_core::{add, fully_connected, relu, Tensor};

/// The built-in CPU interpreter backend.
#[derive(Debug, Default)]
pub struct ReferenceBackend;

impl ReferenceBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn compile(&self, graph: ModelGraph<Validated>) -> Result<Arc<dyn Executable>, RuntimeError> {
        tracing::info!("{}", graph.summary());
        Ok(Arc::new(InterpretedGraph { graph }))
    }
}

/// A compiled (interpreted) model.
struct InterpretedGraph {
    graph: ModelGraph<Validated>,
}

impl InterpretedGraph {
    fn operand<'a>(
        values: &'a [Option<Tensor>],
        node: &NodeDef,
        position: usize,
    ) -> Result<&'a Tensor, RuntimeError> {
        node.inputs
            .get(position)
            .and_then(|&i| values[i].as_ref())
            .ok_or_else(|| {
                RuntimeError::ExecutionFailed(format!(
                    "node '{}' is missing operand {position}",
                    node.name,
                ))
            })
    }
}

impl Executable for InterpretedGraph {
    fn graph(&self) -> &ModelGraph<Validated> {
        &self.graph
    }

    fn execute(
        &self,
        inputs: &[Tensor],
        variables: &mut VariableStore,
        batch: Option<usize>,
        profiling: bool,
    ) -> Result<Execution, RuntimeError> {
        let run_start = Instant::now();
        let mut values: Vec<Option<Tensor>> = vec![None; self.graph.num_nodes()];
        let mut outputs: Vec<Option<Tensor>> = vec![None; self.graph.outputs.len()];
        let mut staged_writes: Vec<(String, Tensor)> = Vec::new();
        let mut profile = ExecutionProfile::default();

        for node in &self.graph.nodes {
            let node_start = Instant::now();

            let value = match &node.op {
                OpKind::Parameter { input } => {
                    let bound = inputs.get(*input).ok_or_else(|| {
                        RuntimeError::ExecutionFailed(format!(
                            "no tensor bound for input port {input}",
                        ))
                    })?;
                    // Snapshot: resolves shared-memory aliasing at the
                    // moment the execution reads the port.
                    let snapshot = bound.materialized();
                    match batch {
                        Some(n) => slice_batch(snapshot, n)?,
                        None => snapshot,
                    }
                }
                OpKind::Constant { value } => value.materialized(),
                OpKind::FullyConnected => {
                    let data = Self::operand(&values, node, 0)?;
                    let weight = Self::operand(&values, node, 1)?;
                    let bias = match node.inputs.len() {
                        3 => Some(Self::operand(&values, node, 2)?),
                        _ => None,
                    };
                    fully_connected(data, weight, bias)?
                }
                OpKind::Add => {
                    let lhs = Self::operand(&values, node, 0)?;
                    let rhs = Self::operand(&values, node, 1)?;
                    add(lhs, rhs)?
                }
                OpKind::Relu => relu(Self::operand(&values, node, 0)?)?,
                OpKind::ReadValue { variable } => variables
                    .get(variable)
                    .ok_or_else(|| {
                        RuntimeError::ExecutionFailed(format!(
                            "undeclared variable '{variable}'",
                        ))
                    })?
                    .clone(),
                OpKind::Assign { variable } => {
                    let value = Self::operand(&values, node, 0)?.clone();
                    staged_writes.push((variable.clone(), value.clone()));
                    value
                }
                OpKind::Result { output } => {
                    let value = Self::operand(&values, node, 0)?.clone();
                    outputs[*output] = Some(value.clone());
                    value
                }
            };

            values[node.index] = Some(value);
            if profiling {
                profile.record(
                    node.name.clone(),
                    node.op.as_str().to_string(),
                    node_start.elapsed(),
                );
            }
        }

        // Commit variable updates only after the whole execution succeeded.
        for (id, value) in staged_writes {
            variables.set(&id, value);
        }

        let outputs = outputs
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                t.ok_or_else(|| {
                    RuntimeError::ExecutionFailed(format!("output port {i} was not produced"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if profiling {
            profile.finalise(run_start.elapsed());
        }
        Ok(Execution { outputs, profile })
    }
}

/// Rescales a batch-aware input (rank >= 2) to its first `n` samples.
fn slice_batch(tensor: Tensor, n: usize) -> Result<Tensor, RuntimeError> {
    let dims = tensor.shape().dims();
    if dims.len() < 2 {
        return Ok(tensor);
    }
    let full = dims[0];
    if n == full {
        return Ok(tensor);
    }
    if n > full {
        return Err(RuntimeError::ExecutionFailed(format!(
            "batch size {n} exceeds the input's leading dimension {full}",
        )));
    }
    let row_bytes = tensor.byte_len() / full;
    let sliced_shape = tensor
        .shape()
        .with_batch(n)
        .expect("rank checked above");
    let bytes = tensor.with_bytes(|b| b[..n * row_bytes].to_vec());
    Tensor::from_bytes(sliced_shape, tensor.dtype(), &bytes).map_err(Into::into)
}
