// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise addition.

use crate::{DType, Tensor, TensorError};

/// Computes `output = lhs + rhs` element-wise.
///
/// Both operands must have identical shapes and dtypes; `F32` and `I32`
/// are supported.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
/// Returns [`TensorError::UnsupportedDType`] for other dtypes.
pub fn add(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor, TensorError> {
    if lhs.shape() != rhs.shape() || lhs.dtype() != rhs.dtype() {
        return Err(TensorError::ShapeMismatch {
            op: "add",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    match lhs.dtype() {
        DType::F32 => {
            let a = lhs.to_f32_vec();
            let b = rhs.to_f32_vec();
            let sum: Vec<f32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
            Tensor::from_f32(lhs.shape().clone(), &sum)
        }
        DType::I32 => {
            let a = lhs.to_i32_vec();
            let b = rhs.to_i32_vec();
            let sum: Vec<i32> = a.iter().zip(&b).map(|(x, y)| x.wrapping_add(*y)).collect();
            Tensor::from_i32(lhs.shape().clone(), &sum)
        }
        other => Err(TensorError::UnsupportedDType {
            op: "add",
            dtype: other,
        }),
    }
}
