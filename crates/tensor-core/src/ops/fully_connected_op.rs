// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (inner product) operation.

use crate::{DType, Shape, Tensor, TensorError};

/// Computes `output = flatten(input) @ weight + bias`.
///
/// The input `[N, d1, d2, ...]` is flattened per sample to `[N, K]` with
/// `K = d1 * d2 * ...`; `weight` must be `[K, M]` and `bias`, when present,
/// `[M]`. The result is `[N, M]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] if any operand is not `F32`.
pub fn fully_connected(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
) -> Result<Tensor, TensorError> {
    for t in [input, weight].into_iter().chain(bias) {
        if t.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "fully_connected",
                dtype: t.dtype(),
            });
        }
    }

    let in_dims = input.shape().dims();
    if in_dims.is_empty() || weight.shape().rank() != 2 {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: input.shape().clone(),
            rhs: weight.shape().clone(),
        });
    }

    let n = in_dims[0];
    let k: usize = in_dims[1..].iter().product::<usize>().max(1);
    let w_dims = weight.shape().dims();
    let m = w_dims[1];

    if w_dims[0] != k {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: input.shape().clone(),
            rhs: weight.shape().clone(),
        });
    }
    if let Some(b) = bias {
        if b.shape().dims() != [m] {
            return Err(TensorError::ShapeMismatch {
                op: "fully_connected (bias)",
                lhs: Shape::vector(m),
                rhs: b.shape().clone(),
            });
        }
    }

    let a = input.to_f32_vec();
    let w = weight.to_f32_vec();
    let mut c = match bias {
        Some(b) => {
            let b = b.to_f32_vec();
            let mut c = Vec::with_capacity(n * m);
            for _ in 0..n {
                c.extend_from_slice(&b);
            }
            c
        }
        None => vec![0.0; n * m],
    };

    // ikj loop order: the inner loop is a saxpy on a row of C, which is
    // sequential in memory and cache-friendly on the weight rows.
    for i in 0..n {
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            let c_row = &mut c[i * m..(i + 1) * m];
            let w_row = &w[p * m..(p + 1) * m];
            for j in 0..m {
                c_row[j] += a_ip * w_row[j];
            }
        }
    }

    Tensor::from_f32(Shape::matrix(n, m), &c)
}
