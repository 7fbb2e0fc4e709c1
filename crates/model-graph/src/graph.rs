// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: ports, nodes, and variables of one loadable model.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>     — assembled, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>  — structure verified, ready to compile.
//! ```
//!
//! This prevents an execution backend from ever receiving a malformed
//! graph. The transition consumes the old state and returns the new one,
//! so there is zero runtime cost — the marker types are `PhantomData` (ZST).

use crate::{ModelError, NodeDef, OpKind, PortInfo, VariableDef};
use std::collections::HashSet;
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been assembled but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for compilation.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A complete model: declared ports, topologically ordered nodes, and
/// persistent variables.
///
/// The generic parameter `S` encodes the validation state at compile time.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name (e.g. `"fc-classifier"`).
    pub name: String,
    /// Declared input ports, ordered by index.
    pub inputs: Vec<PortInfo>,
    /// Declared output ports, ordered by index.
    pub outputs: Vec<PortInfo>,
    /// Nodes in topological order.
    pub nodes: Vec<NodeDef>,
    /// Persistent variable declarations.
    pub variables: Vec<VariableDef>,
    /// State marker (zero-sized, compile-time only).
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(
        name: String,
        inputs: Vec<PortInfo>,
        outputs: Vec<PortInfo>,
        nodes: Vec<NodeDef>,
        variables: Vec<VariableDef>,
    ) -> Self {
        Self {
            name,
            inputs,
            outputs,
            nodes,
            variables,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph is non-empty and node indices are consecutive from 0.
    /// - Every operand reference points at an earlier node (topological
    ///   order) and matches the op's arity.
    /// - Exactly one `Parameter` per declared input port and exactly one
    ///   `Result` per declared output port.
    /// - Port names are unique within each direction; node names and
    ///   variable ids are unique.
    /// - Every `ReadValue`/`Assign` references a declared variable, and
    ///   declared initial values agree with the variable's shape and dtype.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph("model graph contains no nodes".into()));
        }
        if self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph("model declares no output ports".into()));
        }

        // Unique port names and consecutive port indices per direction.
        for (ports, direction) in [(&self.inputs, "input"), (&self.outputs, "output")] {
            let mut seen = HashSet::new();
            for (i, port) in ports.iter().enumerate() {
                if port.index != i {
                    return Err(ModelError::InvalidPort {
                        port: port.name.clone(),
                        detail: format!("expected {direction} index {i}, got {}", port.index),
                    });
                }
                if !seen.insert(port.name.as_str()) {
                    return Err(ModelError::InvalidPort {
                        port: port.name.clone(),
                        detail: format!("duplicate {direction} port name"),
                    });
                }
            }
        }

        // Unique variable ids and consistent initial values.
        let mut var_ids = HashSet::new();
        for var in &self.variables {
            if !var_ids.insert(var.id.as_str()) {
                return Err(ModelError::InvalidVariable {
                    variable: var.id.clone(),
                    detail: "duplicate variable id".into(),
                });
            }
            if let Some(init) = &var.init {
                if init.shape() != &var.shape || init.dtype() != var.dtype {
                    return Err(ModelError::InvalidVariable {
                        variable: var.id.clone(),
                        detail: format!(
                            "initial value is {} {}, declared {} {}",
                            init.dtype(),
                            init.shape(),
                            var.dtype,
                            var.shape,
                        ),
                    });
                }
            }
        }

        // Node-level checks.
        let mut node_names = HashSet::new();
        let mut bound_inputs = vec![false; self.inputs.len()];
        let mut bound_outputs = vec![false; self.outputs.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            if node.index != i {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("expected index {i}, got {}", node.index),
                });
            }
            if !node_names.insert(node.name.as_str()) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }
            if !node.op.arity().contains(&node.inputs.len()) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!(
                        "op '{}' takes {:?} operands, got {}",
                        node.op,
                        node.op.arity(),
                        node.inputs.len(),
                    ),
                });
            }
            for &operand in &node.inputs {
                if operand >= i {
                    return Err(ModelError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!("operand {operand} does not precede node {i}"),
                    });
                }
            }

            match &node.op {
                OpKind::Parameter { input } => {
                    let slot = bound_inputs.get_mut(*input).ok_or_else(|| {
                        ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("unknown input port index {input}"),
                        }
                    })?;
                    if std::mem::replace(slot, true) {
                        return Err(ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("input port {input} already has a parameter"),
                        });
                    }
                }
                OpKind::Result { output } => {
                    let slot = bound_outputs.get_mut(*output).ok_or_else(|| {
                        ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("unknown output port index {output}"),
                        }
                    })?;
                    if std::mem::replace(slot, true) {
                        return Err(ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("output port {output} already has a result"),
                        });
                    }
                }
                OpKind::ReadValue { variable } | OpKind::Assign { variable } => {
                    if !var_ids.contains(variable.as_str()) {
                        return Err(ModelError::InvalidVariable {
                            variable: variable.clone(),
                            detail: "referenced by a node but not declared".into(),
                        });
                    }
                }
                OpKind::Constant { .. } | OpKind::FullyConnected | OpKind::Add | OpKind::Relu => {}
            }
        }

        if let Some(missing) = bound_inputs.iter().position(|b| !b) {
            return Err(ModelError::InvalidGraph(format!(
                "input port {missing} ('{}') has no parameter node",
                self.inputs[missing].name,
            )));
        }
        if let Some(missing) = bound_outputs.iter().position(|b| !b) {
            return Err(ModelError::InvalidGraph(format!(
                "output port {missing} ('{}') has no result node",
                self.outputs[missing].name,
            )));
        }

        Ok(ModelGraph {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            nodes: self.nodes,
            variables: self.variables,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns the total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a node by index.
    pub fn node(&self, index: usize) -> Option<&NodeDef> {
        self.nodes.get(index)
    }

    /// Returns an input port by name.
    pub fn find_input(&self, name: &str) -> Option<&PortInfo> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Returns an output port by name.
    pub fn find_output(&self, name: &str) -> Option<&PortInfo> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Returns a variable declaration by id.
    pub fn variable(&self, id: &str) -> Option<&VariableDef> {
        self.variables.iter().find(|v| v.id == id)
    }

    /// Returns the total bytes held by constant nodes (weights).
    pub fn total_constant_bytes(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| match &n.op {
                OpKind::Constant { value } => value.byte_len(),
                _ => 0,
            })
            .sum()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        let weight_kb = self.total_constant_bytes() as f64 / 1024.0;
        format!(
            "Model '{}': {} inputs, {} outputs, {} nodes, {} variables, {:.1} KB weights",
            self.name,
            self.inputs.len(),
            self.outputs.len(),
            self.nodes.len(),
            self.variables.len(),
            weight_kb,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} nodes):", self.name, self.nodes.len())?;
        for port in &self.inputs {
            writeln!(f, "  in  {}", port.summary())?;
        }
        for port in &self.outputs {
            writeln!(f, "  out {}", port.summary())?;
        }
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}
