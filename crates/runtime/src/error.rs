// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.
//!
//! Usage and resource errors are raised synchronously at the violating
//! call and are never deferred into the asynchronous path. Execution
//! errors surface as a terminal `FAILED` status plus
//! [`RuntimeError::ExecutionFailed`] from `infer`; the submitting
//! `start_async` call itself never reports them.

/// Errors that can occur in the request runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// No input or output port matches the given name or index.
    #[error("failed to find input or output with name: '{0}'")]
    PortNotFound(String),

    /// A port handle was used against a model that does not declare it.
    #[error("port handle '{0}' does not belong to this model")]
    InvalidPortKey(String),

    /// An input tensor's byte size does not match the port's required size.
    #[error(
        "input tensor size is not equal to the model input size: \
         port '{port}' requires {expected} bytes, got {actual}"
    )]
    InputSizeMismatch {
        port: String,
        expected: usize,
        actual: usize,
    },

    /// An output tensor's byte size does not match the port's required size.
    #[error(
        "output tensor size is not equal to the model output size: \
         port '{port}' requires {expected} bytes, got {actual}"
    )]
    OutputSizeMismatch {
        port: String,
        expected: usize,
        actual: usize,
    },

    /// A tensor's dtype does not match the port's declared dtype.
    #[error("port '{port}' expects {expected}, got {actual}")]
    PrecisionMismatch {
        port: String,
        expected: tensor_core::DType,
        actual: tensor_core::DType,
    },

    /// A bound shape is not admitted by a dynamic port's declared range.
    #[error("shape {shape} is not compatible with port '{port}' shape {declared}")]
    ShapeNotCompatible {
        port: String,
        shape: tensor_core::Shape,
        declared: tensor_core::PartialShape,
    },

    /// The request has an execution in flight; mutation and resubmission
    /// are rejected without blocking.
    #[error("the infer request is busy")]
    RequestBusy,

    /// `set_batch` was called with a non-positive value.
    #[error("Batch size should be positive integer number but {0} specified")]
    InvalidBatchSize(i64),

    /// A memory-state operation does not match the variable's declaration.
    #[error("memory state '{variable}': {detail}")]
    StateMismatch { variable: String, detail: String },

    /// The backend failed during execution; the status is `FAILED` and the
    /// diagnostic message is preserved.
    #[error("inference execution failed: {0}")]
    ExecutionFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A tensor operation failed.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),

    /// Model loading or validation failed.
    #[error(transparent)]
    Model(#[from] model_graph::ModelError),
}
