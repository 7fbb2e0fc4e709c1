// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and graph construction.

/// Errors that can occur when working with model representations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// A weight tensor referenced by a node was not found in the weights table.
    #[error("weight tensor not found: {name}")]
    WeightNotFound { name: String },

    /// A node definition is invalid (bad arity, unknown operand, bad shapes).
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// A port declaration is invalid.
    #[error("invalid port '{port}': {detail}")]
    InvalidPort { port: String, detail: String },

    /// A variable declaration is invalid or missing.
    #[error("invalid variable '{variable}': {detail}")]
    InvalidVariable { variable: String, detail: String },

    /// A dimension spec in the manifest could not be parsed.
    #[error("invalid dimension spec '{0}'")]
    InvalidDimension(String),

    /// The model graph is structurally malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// A tensor carried by the graph is inconsistent.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
