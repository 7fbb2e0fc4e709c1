// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compiled models and request pools.
//!
//! A [`CompiledModel`] is the handle produced by compiling a validated
//! graph on a backend. It enumerates ports and creates independently
//! schedulable [`InferRequest`]s — each with its own bound tensors,
//! variable state, and execution context. Requests of one model may run
//! concurrently; within one request execution is strictly serialized.

use crate::{Backend, Executable, InferRequest, Outputs, RuntimeConfig, RuntimeError};
use model_graph::{ModelGraph, PortInfo, PortRef, Validated};
use std::sync::Arc;
use tensor_core::Tensor;

/// A model compiled for a backend, from which requests are created.
#[derive(Clone)]
pub struct CompiledModel {
    exec: Arc<dyn Executable>,
    profiling: bool,
}

impl CompiledModel {
    /// Compiles a validated graph on the given backend.
    pub fn compile(
        backend: &dyn Backend,
        graph: ModelGraph<Validated>,
        config: &RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        tracing::info!(device = backend.name(), model = %graph.name, "compiling model");
        let exec = backend.compile(graph)?;
        Ok(Self {
            exec,
            profiling: config.enable_profiling,
        })
    }

    /// Returns the compiled graph.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        self.exec.graph()
    }

    /// Returns the declared input ports, in index order.
    pub fn inputs(&self) -> &[PortInfo] {
        &self.exec.graph().inputs
    }

    /// Returns the declared output ports, in index order.
    pub fn outputs(&self) -> &[PortInfo] {
        &self.exec.graph().outputs
    }

    /// Returns an input port by name.
    pub fn input(&self, name: &str) -> Result<&PortInfo, RuntimeError> {
        self.exec
            .graph()
            .find_input(name)
            .ok_or_else(|| RuntimeError::PortNotFound(name.to_string()))
    }

    /// Returns an output port by name.
    pub fn output(&self, name: &str) -> Result<&PortInfo, RuntimeError> {
        self.exec
            .graph()
            .find_output(name)
            .ok_or_else(|| RuntimeError::PortNotFound(name.to_string()))
    }

    /// Creates one independent request.
    pub fn create_request(&self) -> InferRequest {
        InferRequest::new(Arc::clone(&self.exec), self.profiling)
    }

    /// Creates a pool of `n` independent requests.
    pub fn create_requests(&self, n: usize) -> Vec<InferRequest> {
        (0..n).map(|_| self.create_request()).collect()
    }

    /// One-shot convenience: creates a request, binds `inputs`, executes
    /// synchronously, and returns the outputs.
    pub fn infer<K: Into<PortRef>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Tensor)>,
    ) -> Result<Outputs, RuntimeError> {
        self.create_request().infer_with(inputs)
    }
}

impl std::fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModel")
            .field("model", &self.exec.graph().name)
            .field("profiling", &self.profiling)
            .finish()
    }
}

/// Loads a model per the configuration: resolves the device backend,
/// compiles the graph, and creates the configured number of requests.
pub fn load(
    graph: ModelGraph<Validated>,
    config: &RuntimeConfig,
) -> Result<(CompiledModel, Vec<InferRequest>), RuntimeError> {
    let backend = config.create_backend()?;
    let compiled = CompiledModel::compile(backend.as_ref(), graph, config)?;
    let requests = compiled.create_requests(config.num_requests);
    Ok((compiled, requests))
}
