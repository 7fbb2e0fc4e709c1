// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Programmatic model graph construction.
//!
//! [`GraphBuilder`] assembles ports, nodes, and variables in topological
//! order and hands the result to [`ModelGraph::validate`]:
//!
//! ```
//! use model_graph::GraphBuilder;
//! use tensor_core::{DType, PartialShape, Shape, Tensor};
//!
//! let mut b = GraphBuilder::new("tiny");
//! let x = b.input("x", PartialShape::fixed(&[1, 2]), DType::F32);
//! let w = b.constant("w", Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 0.0, 0.0, 1.0]).unwrap());
//! let y = b.fully_connected("fc", x, w, None);
//! b.result("y", PartialShape::fixed(&[1, 2]), DType::F32, y);
//! let model = b.build().unwrap();
//! assert_eq!(model.num_nodes(), 4);
//! ```

use crate::{
    graph::{Loaded, Validated},
    ModelError, ModelGraph, NodeDef, OpKind, PortInfo, VariableDef,
};
use tensor_core::{DType, PartialShape, Shape, Tensor};

/// Opaque handle to a node added to a [`GraphBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Assembles a [`ModelGraph`] node by node.
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
    nodes: Vec<NodeDef>,
    variables: Vec<VariableDef>,
}

impl GraphBuilder {
    /// Creates an empty builder for a model with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
            variables: Vec::new(),
        }
    }

    fn push(&mut self, name: impl Into<String>, op: OpKind, inputs: Vec<usize>) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeDef {
            name: name.into(),
            index,
            op,
            inputs,
        });
        NodeId(index)
    }

    /// Declares an input port and its parameter node. The node name is the
    /// port name.
    pub fn input(&mut self, name: impl Into<String>, shape: PartialShape, dtype: DType) -> NodeId {
        let name = name.into();
        let index = self.inputs.len();
        self.inputs.push(PortInfo {
            name: name.clone(),
            index,
            shape,
            dtype,
        });
        self.push(name, OpKind::Parameter { input: index }, vec![])
    }

    /// Adds a constant (weight) node.
    pub fn constant(&mut self, name: impl Into<String>, value: Tensor) -> NodeId {
        self.push(name, OpKind::Constant { value }, vec![])
    }

    /// Adds a fully-connected node.
    pub fn fully_connected(
        &mut self,
        name: impl Into<String>,
        data: NodeId,
        weight: NodeId,
        bias: Option<NodeId>,
    ) -> NodeId {
        let mut inputs = vec![data.0, weight.0];
        if let Some(b) = bias {
            inputs.push(b.0);
        }
        self.push(name, OpKind::FullyConnected, inputs)
    }

    /// Adds an element-wise addition node.
    pub fn add(&mut self, name: impl Into<String>, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(name, OpKind::Add, vec![lhs.0, rhs.0])
    }

    /// Adds a relu activation node.
    pub fn relu(&mut self, name: impl Into<String>, input: NodeId) -> NodeId {
        self.push(name, OpKind::Relu, vec![input.0])
    }

    /// Declares a persistent variable.
    pub fn variable(
        &mut self,
        id: impl Into<String>,
        shape: Shape,
        dtype: DType,
        init: Option<Tensor>,
    ) {
        self.variables.push(VariableDef {
            id: id.into(),
            shape,
            dtype,
            init,
        });
    }

    /// Adds a node reading a declared variable's current value.
    pub fn read_value(&mut self, name: impl Into<String>, variable: impl Into<String>) -> NodeId {
        self.push(
            name,
            OpKind::ReadValue {
                variable: variable.into(),
            },
            vec![],
        )
    }

    /// Adds a node that writes its operand to a declared variable after a
    /// successful execution, forwarding the operand unchanged.
    pub fn assign(
        &mut self,
        name: impl Into<String>,
        variable: impl Into<String>,
        value: NodeId,
    ) -> NodeId {
        self.push(
            name,
            OpKind::Assign {
                variable: variable.into(),
            },
            vec![value.0],
        )
    }

    /// Declares an output port with its shape and dtype, exposing the given
    /// node's value. The result node is named `<port>.result`.
    ///
    /// The declared shape is the port's contract for size checks at bind
    /// time; the actual output shape of an execution may be narrower when
    /// the port is dynamic.
    pub fn result(
        &mut self,
        port_name: impl Into<String>,
        shape: PartialShape,
        dtype: DType,
        value: NodeId,
    ) {
        let port_name = port_name.into();
        let index = self.outputs.len();
        self.outputs.push(PortInfo {
            name: port_name.clone(),
            index,
            shape,
            dtype,
        });
        self.push(
            format!("{port_name}.result"),
            OpKind::Result { output: index },
            vec![value.0],
        );
    }

    /// Returns the assembled graph without validating it.
    pub fn finish(self) -> ModelGraph<Loaded> {
        ModelGraph::new(
            self.name,
            self.inputs,
            self.outputs,
            self.nodes,
            self.variables,
        )
    }

    /// Assembles and validates the graph.
    pub fn build(self) -> Result<ModelGraph<Validated>, ModelError> {
        self.finish().validate()
    }
}
