// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The inference request lifecycle runtime.
//!
//! A validated `ModelGraph` from `model-graph` is compiled on a
//! [`Backend`] into a [`CompiledModel`], which creates a pool of
//! independently schedulable [`InferRequest`]s:
//!
//! ```text
//! ModelGraph<Validated> ── compile ──► CompiledModel ── create_request ──► InferRequest
//! ```
//!
//! Each request owns its input/output tensor bindings and per-request
//! variable state, executes at most one invocation at a time, and exposes
//! the blocking [`InferRequest::wait`] / timed
//! [`InferRequest::wait_for`] / non-blocking [`InferRequest::status`]
//! observation surface plus completion callbacks.
//!
//! # Concurrency
//! Requests of one compiled model run concurrently, each execution on its
//! own worker thread. `wait` is the only blocking call; `infer` blocks by
//! construction (it is submission plus an unconditional wait on the
//! calling thread). There is no cancellation: once busy, an execution
//! runs to completion or failure.

mod backend;
mod compiled;
mod config;
mod error;
mod interpreter;
mod profiling;
mod request;
mod state;
mod status;

pub use backend::{Backend, Executable, Execution};
pub use compiled::{load, CompiledModel};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use interpreter::ReferenceBackend;
pub use profiling::{ExecutionProfile, NodeProfile};
pub use request::{InferRequest, Outputs, StatusProbe};
pub use state::{MemoryState, VariableStore};
pub use status::InferStatus;
