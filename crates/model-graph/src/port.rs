// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input/output port descriptions and port keys.
//!
//! A port is a named, indexed slot of a model. Callers address ports by
//! name, by index, or by a [`PortInfo`] handle obtained from the compiled
//! model — the three forms are unified by [`PortRef`].

use tensor_core::{DType, PartialShape};

/// Describes a single input or output slot of a model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PortInfo {
    /// Port name, unique within its direction (e.g. `"data"`).
    pub name: String,
    /// Position within the model's input or output list.
    pub index: usize,
    /// Admissible shapes; fully static for most models.
    pub shape: PartialShape,
    /// Element type.
    pub dtype: DType,
}

impl PortInfo {
    /// Returns the required buffer size in bytes for a static port,
    /// or `None` when any dimension is dynamic.
    pub fn required_bytes(&self) -> Option<usize> {
        self.shape.to_shape().map(|s| s.size_bytes(self.dtype))
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!("[{}] {} {} {}", self.index, self.name, self.dtype, self.shape)
    }
}

/// A key addressing one port of a model: by name, by index, or by handle.
///
/// A [`PortRef::Port`] handle must match a port actually declared by the
/// model it is used against; a handle taken from a different model is a
/// usage error, distinct from an unknown name or index.
#[derive(Debug, Clone)]
pub enum PortRef {
    /// Address by port name.
    Name(String),
    /// Address by position in the input/output list.
    Index(usize),
    /// Address by a previously obtained port handle.
    Port(PortInfo),
}

impl PortRef {
    /// Returns a human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Name(n) => n.clone(),
            Self::Index(i) => format!("#{i}"),
            Self::Port(p) => p.name.clone(),
        }
    }
}

impl From<&str> for PortRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PortRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for PortRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<PortInfo> for PortRef {
    fn from(port: PortInfo) -> Self {
        Self::Port(port)
    }
}

impl From<&PortInfo> for PortRef {
    fn from(port: &PortInfo) -> Self {
        Self::Port(port.clone())
    }
}
