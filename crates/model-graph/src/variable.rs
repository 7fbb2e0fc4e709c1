// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Persistent variable declarations.
//!
//! A variable is a named tensor that survives across executions of one
//! request: `read_value` nodes read it, `assign` nodes write it after a
//! successful execution. Each request gets its own copy at creation,
//! initialized to the declared initial value (zeros when absent).

use tensor_core::{DType, Shape, Tensor};

/// Declares a persistent variable of the model.
#[derive(Debug, Clone)]
pub struct VariableDef {
    /// Unique variable identifier (e.g. `"var_id_667"`).
    pub id: String,
    /// The variable's fixed shape.
    pub shape: Shape,
    /// The variable's element type.
    pub dtype: DType,
    /// Declared initial value; zeros when `None`.
    pub init: Option<Tensor>,
}

impl VariableDef {
    /// Materializes the initial value for a fresh request.
    pub fn initial_value(&self) -> Tensor {
        match &self.init {
            Some(t) => t.materialized(),
            None => Tensor::zeros(self.shape.clone(), self.dtype),
        }
    }
}
