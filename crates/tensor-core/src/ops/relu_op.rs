// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rectified linear unit activation.

use crate::{DType, Tensor, TensorError};

/// Computes `output = max(input, 0)` element-wise.
///
/// # Errors
/// Returns [`TensorError::UnsupportedDType`] if the input is not `F32`.
pub fn relu(input: &Tensor) -> Result<Tensor, TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "relu",
            dtype: input.dtype(),
        });
    }
    let values: Vec<f32> = input.to_f32_vec().iter().map(|v| v.max(0.0)).collect();
    Tensor::from_f32(input.shape().clone(), &values)
}
