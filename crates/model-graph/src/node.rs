// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node definitions for the model graph.
//!
//! Each [`NodeDef`] describes a single operation: its kind, its producer
//! nodes, and — for constants — the weight tensor it carries. Weight data
//! lives inline on [`OpKind::Constant`] nodes; the execution backend reads
//! it directly, there is no separate weight file indirection.

use tensor_core::Tensor;

/// The operation a node performs.
#[derive(Debug, Clone)]
pub enum OpKind {
    /// Reads the tensor bound to the input port with the given index.
    Parameter { input: usize },
    /// Produces a fixed tensor (weights, biases).
    Constant { value: Tensor },
    /// Inner product: operands are `[data, weight]` or `[data, weight, bias]`.
    FullyConnected,
    /// Element-wise addition of two operands.
    Add,
    /// Rectified linear activation of one operand.
    Relu,
    /// Reads the current value of a persistent variable.
    ReadValue { variable: String },
    /// Writes its operand to a persistent variable after a successful
    /// execution, and forwards the operand unchanged.
    Assign { variable: String },
    /// Exposes its operand on the output port with the given index.
    Result { output: usize },
}

impl OpKind {
    /// Returns a human-readable op label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "parameter",
            Self::Constant { .. } => "constant",
            Self::FullyConnected => "fully_connected",
            Self::Add => "add",
            Self::Relu => "relu",
            Self::ReadValue { .. } => "read_value",
            Self::Assign { .. } => "assign",
            Self::Result { .. } => "result",
        }
    }

    /// Returns the admissible operand count range for this op.
    pub fn arity(&self) -> std::ops::RangeInclusive<usize> {
        match self {
            Self::Parameter { .. } | Self::Constant { .. } | Self::ReadValue { .. } => 0..=0,
            Self::Relu | Self::Assign { .. } | Self::Result { .. } => 1..=1,
            Self::Add => 2..=2,
            Self::FullyConnected => 2..=3,
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in the model graph.
#[derive(Debug, Clone)]
pub struct NodeDef {
    /// Unique node name (e.g. `"fc"`, `"mem.read"`).
    pub name: String,
    /// Index in topological order (0-based).
    pub index: usize,
    /// The operation this node performs.
    pub op: OpKind,
    /// Indices of producer nodes, in operand order.
    pub inputs: Vec<usize>,
}

impl NodeDef {
    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} ({}) <- {:?}",
            self.index, self.name, self.op, self.inputs
        )
    }
}
