// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution backend seam.
//!
//! The runtime consumes backends through two traits: [`Backend`] compiles
//! a validated model graph into an [`Executable`], and the executable runs
//! one invocation at a time against a set of bound input tensors and a
//! per-request variable store. Output shapes are determined by the
//! backend as part of execution, never by the caller — every execution
//! returns freshly-descriptored output tensors.

use crate::{ExecutionProfile, RuntimeError, VariableStore};
use model_graph::{ModelGraph, Validated};
use std::sync::Arc;
use tensor_core::Tensor;

/// Compiles validated model graphs for a particular device.
pub trait Backend: Send + Sync {
    /// Returns the backend's device name (e.g. `"reference"`).
    fn name(&self) -> &'static str;

    /// Compiles the graph into an executable.
    fn compile(&self, graph: ModelGraph<Validated>) -> Result<Arc<dyn Executable>, RuntimeError>;
}

/// A compiled model, executable once per call.
///
/// Implementations must be thread-safe: multiple requests of one compiled
/// model execute concurrently, each with its own inputs and variables.
pub trait Executable: Send + Sync {
    /// Returns the compiled graph, for port and variable enumeration.
    fn graph(&self) -> &ModelGraph<Validated>;

    /// Runs one invocation.
    ///
    /// `inputs` holds one tensor per declared input port, in port order.
    /// `variables` is the calling request's persistent state; it is read
    /// by `read_value` nodes and updated by `assign` nodes only when the
    /// execution succeeds. `batch`, when set, rescales the leading
    /// dimension of batch-aware inputs. `profiling` enables per-node
    /// timing collection.
    fn execute(
        &self,
        inputs: &[Tensor],
        variables: &mut VariableStore,
        batch: Option<usize>,
        profiling: bool,
    ) -> Result<Execution, RuntimeError>;
}

/// The result of one successful execution.
#[derive(Debug)]
pub struct Execution {
    /// One tensor per declared output port, in port order, with shapes
    /// determined by this execution.
    pub outputs: Vec<Tensor>,
    /// Per-node profile (empty when profiling is disabled).
    pub profile: ExecutionProfile,
}
