// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and operations.

use crate::Shape;

/// Errors that can occur during tensor construction and operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },

    /// Explicit strides do not match the shape's rank.
    #[error("strides rank {strides_rank} does not match shape rank {shape_rank}")]
    StridesRankMismatch {
        strides_rank: usize,
        shape_rank: usize,
    },

    /// Reshape was requested on a tensor aliasing caller-owned storage.
    #[error("cannot reshape a tensor that aliases caller-owned storage")]
    ReshapeShared,
}
