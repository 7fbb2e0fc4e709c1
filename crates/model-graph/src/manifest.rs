// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) declares a model's ports, nodes, variables,
//! and inline weight data, and converts into a validated [`ModelGraph`].
//!
//! # Format
//! ```json
//! {
//!   "name": "fc-classifier",
//!   "inputs":  [ { "name": "data", "shape": [1, 3, 32, 32], "dtype": "f32" } ],
//!   "outputs": [ { "name": "fc_out", "shape": [1, 10], "dtype": "f32", "node": "fc" } ],
//!   "variables": [],
//!   "nodes": [
//!     { "name": "fc", "op": "fully_connected",
//!       "inputs": ["data", "fc.weight", "fc.bias"] }
//!   ],
//!   "weights": {
//!     "fc.weight": { "shape": [3072, 10], "values": [ ... ] },
//!     "fc.bias":   { "shape": [10],       "values": [ ... ] }
//!   }
//! }
//! ```
//!
//! Dynamic dimensions are written as strings: `"0..5"`, `"3.."`, `".."`.
//! Node operands refer to input port names, weight names, or earlier nodes.

use crate::{
    graph::Validated, GraphBuilder, ModelError, ModelGraph, NodeId,
};
use std::collections::HashMap;
use std::path::Path;
use tensor_core::{DType, Dimension, PartialShape, Shape, Tensor};

/// A dimension entry in a manifest shape: a number or a range spec string.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum DimSpec {
    /// A fixed dimension size.
    Fixed(usize),
    /// A range spec such as `"0..5"`, `"3.."` or `".."`.
    Spec(String),
}

impl DimSpec {
    fn to_dimension(&self) -> Result<Dimension, ModelError> {
        match self {
            Self::Fixed(d) => Ok(Dimension::Fixed(*d)),
            Self::Spec(s) => {
                Dimension::parse(s).ok_or_else(|| ModelError::InvalidDimension(s.clone()))
            }
        }
    }
}

/// A port entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestPort {
    /// Port name.
    pub name: String,
    /// Shape with possibly-dynamic dimensions.
    pub shape: Vec<DimSpec>,
    /// Dtype string (e.g. `"f32"`).
    pub dtype: String,
    /// For output ports: the node whose value this port exposes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// A node entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestNode {
    /// Node name.
    pub name: String,
    /// Op string: `"fully_connected"`, `"add"`, `"relu"`, `"read_value"`, `"assign"`.
    pub op: String,
    /// Operand names: input ports, weights, or earlier nodes.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Variable id for `read_value`/`assign` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

/// A variable entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestVariable {
    /// Variable id.
    pub id: String,
    /// Fixed shape.
    pub shape: Vec<usize>,
    /// Dtype string.
    pub dtype: String,
    /// Optional initial value (f32 variables only); zeros when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Vec<f32>>,
}

/// A weight tensor carried inline in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestWeight {
    /// Weight shape.
    pub shape: Vec<usize>,
    /// Row-major f32 values.
    pub values: Vec<f32>,
}

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable model name.
    pub name: String,
    /// Input port declarations.
    pub inputs: Vec<ManifestPort>,
    /// Output port declarations (each names its producing node).
    pub outputs: Vec<ManifestPort>,
    /// Persistent variable declarations.
    #[serde(default)]
    pub variables: Vec<ManifestVariable>,
    /// Nodes in topological order.
    pub nodes: Vec<ManifestNode>,
    /// Inline weight tensors, keyed by name.
    #[serde(default)]
    pub weights: HashMap<String, ManifestWeight>,
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Converts this manifest into a validated [`ModelGraph`].
    pub fn into_graph(self) -> Result<ModelGraph<Validated>, ModelError> {
        let mut builder = GraphBuilder::new(self.name.clone());
        let mut by_name: HashMap<String, NodeId> = HashMap::new();

        // Variables first, so nodes can reference them.
        for var in &self.variables {
            let dtype = parse_dtype(&var.dtype).ok_or_else(|| ModelError::InvalidVariable {
                variable: var.id.clone(),
                detail: format!("unsupported dtype '{}'", var.dtype),
            })?;
            let shape = Shape::new(var.shape.clone());
            let init = match &var.init {
                Some(values) => {
                    if dtype != DType::F32 {
                        return Err(ModelError::InvalidVariable {
                            variable: var.id.clone(),
                            detail: "inline initial values are supported for f32 only".into(),
                        });
                    }
                    Some(Tensor::from_f32(shape.clone(), values)?)
                }
                None => None,
            };
            builder.variable(&var.id, shape, dtype, init);
        }

        // Input ports become parameter nodes addressable by port name.
        for port in &self.inputs {
            let dtype = parse_dtype(&port.dtype).ok_or_else(|| ModelError::InvalidPort {
                port: port.name.clone(),
                detail: format!("unsupported dtype '{}'", port.dtype),
            })?;
            let dims = port
                .shape
                .iter()
                .map(|d| d.to_dimension())
                .collect::<Result<Vec<_>, _>>()?;
            let id = builder.input(&port.name, PartialShape::new(dims), dtype);
            by_name.insert(port.name.clone(), id);
        }

        // Nodes, resolving operands against ports, weights, earlier nodes.
        for node in &self.nodes {
            let mut operands = Vec::with_capacity(node.inputs.len());
            for operand in &node.inputs {
                let id = match by_name.get(operand) {
                    Some(id) => *id,
                    None => {
                        let weight = self.weights.get(operand).ok_or_else(|| {
                            ModelError::InvalidNode {
                                node: node.name.clone(),
                                detail: format!("unknown operand '{operand}'"),
                            }
                        })?;
                        let tensor = Tensor::from_f32(
                            Shape::new(weight.shape.clone()),
                            &weight.values,
                        )?;
                        let id = builder.constant(operand, tensor);
                        by_name.insert(operand.clone(), id);
                        id
                    }
                };
                operands.push(id);
            }

            let id = match node.op.as_str() {
                "fully_connected" => {
                    let (data, weight, bias) = match operands[..] {
                        [d, w] => (d, w, None),
                        [d, w, b] => (d, w, Some(b)),
                        _ => {
                            return Err(ModelError::InvalidNode {
                                node: node.name.clone(),
                                detail: format!(
                                    "fully_connected takes 2..=3 operands, got {}",
                                    operands.len(),
                                ),
                            })
                        }
                    };
                    builder.fully_connected(&node.name, data, weight, bias)
                }
                "add" => match operands[..] {
                    [lhs, rhs] => builder.add(&node.name, lhs, rhs),
                    _ => {
                        return Err(ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("add takes 2 operands, got {}", operands.len()),
                        })
                    }
                },
                "relu" => match operands[..] {
                    [input] => builder.relu(&node.name, input),
                    _ => {
                        return Err(ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: format!("relu takes 1 operand, got {}", operands.len()),
                        })
                    }
                },
                "read_value" => {
                    let variable = node.variable.as_ref().ok_or_else(|| {
                        ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: "read_value requires a 'variable' field".into(),
                        }
                    })?;
                    builder.read_value(&node.name, variable)
                }
                "assign" => {
                    let variable = node.variable.as_ref().ok_or_else(|| {
                        ModelError::InvalidNode {
                            node: node.name.clone(),
                            detail: "assign requires a 'variable' field".into(),
                        }
                    })?;
                    match operands[..] {
                        [value] => builder.assign(&node.name, variable, value),
                        _ => {
                            return Err(ModelError::InvalidNode {
                                node: node.name.clone(),
                                detail: format!(
                                    "assign takes 1 operand, got {}",
                                    operands.len(),
                                ),
                            })
                        }
                    }
                }
                other => {
                    return Err(ModelError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!("unrecognised op '{other}'"),
                    })
                }
            };
            by_name.insert(node.name.clone(), id);
        }

        // Output ports expose named nodes.
        for port in &self.outputs {
            let dtype = parse_dtype(&port.dtype).ok_or_else(|| ModelError::InvalidPort {
                port: port.name.clone(),
                detail: format!("unsupported dtype '{}'", port.dtype),
            })?;
            let dims = port
                .shape
                .iter()
                .map(|d| d.to_dimension())
                .collect::<Result<Vec<_>, _>>()?;
            let producer = port.node.as_ref().ok_or_else(|| ModelError::InvalidPort {
                port: port.name.clone(),
                detail: "output port must name its producing node".into(),
            })?;
            let value = *by_name.get(producer).ok_or_else(|| ModelError::InvalidPort {
                port: port.name.clone(),
                detail: format!("unknown producing node '{producer}'"),
            })?;
            builder.result(&port.name, PartialShape::new(dims), dtype, value);
        }

        builder.build()
    }
}

/// Parses a dtype string into a [`DType`].
pub(crate) fn parse_dtype(s: &str) -> Option<DType> {
    DType::from_str_loose(s)
}
