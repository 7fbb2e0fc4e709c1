// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-request persistent variable state.
//!
//! [`VariableStore`] holds the live values of a model's declared
//! variables for one request. It is created at request creation from the
//! model's declarations (initial value, or zeros) and updated by the
//! backend after each successful execution. [`MemoryState`] is the
//! caller-facing handle returned by `InferRequest::query_state`.

use crate::request::RequestShared;
use crate::{InferStatus, RuntimeError};
use model_graph::{ModelGraph, Validated};
use std::sync::Arc;
use tensor_core::Tensor;

/// One variable's live state.
#[derive(Debug, Clone)]
pub(crate) struct VariableSlot {
    pub(crate) id: String,
    pub(crate) value: Tensor,
    pub(crate) initial: Tensor,
}

/// The live values of a model's variables for one request.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    slots: Vec<VariableSlot>,
}

impl VariableStore {
    /// Builds a store from the model's declarations, every variable at its
    /// initial value.
    pub fn from_graph(graph: &ModelGraph<Validated>) -> Self {
        Self {
            slots: graph
                .variables
                .iter()
                .map(|v| VariableSlot {
                    id: v.id.clone(),
                    value: v.initial_value(),
                    initial: v.initial_value(),
                })
                .collect(),
        }
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the model declares no variables.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns a variable's current value by id.
    pub fn get(&self, id: &str) -> Option<&Tensor> {
        self.slots.iter().find(|s| s.id == id).map(|s| &s.value)
    }

    /// Overwrites a variable's current value by id.
    ///
    /// Returns `false` if the id is not declared.
    pub fn set(&mut self, id: &str, value: Tensor) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&VariableSlot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut VariableSlot> {
        self.slots.get_mut(index)
    }
}

/// Caller-facing handle to one persistent variable of one request.
///
/// Handles are obtained from `InferRequest::query_state`, ordered as the
/// model declares its variables. All accessors are rejected with a
/// busy-state error while the owning request has an execution in flight;
/// after completion and before the next submission they are always safe.
#[derive(Clone)]
pub struct MemoryState {
    pub(crate) shared: Arc<RequestShared>,
    pub(crate) index: usize,
    pub(crate) id: String,
}

impl MemoryState {
    /// Returns the variable's declared id.
    pub fn name(&self) -> &str {
        &self.id
    }

    /// Returns a copy of the variable's current value.
    pub fn state(&self) -> Result<Tensor, RuntimeError> {
        let inner = self.shared.lock_inner();
        if inner.status_snapshot() == InferStatus::ResultNotReady {
            return Err(RuntimeError::RequestBusy);
        }
        let slot = inner
            .variables
            .slot(self.index)
            .ok_or_else(|| RuntimeError::StateMismatch {
                variable: self.id.clone(),
                detail: "variable slot missing".into(),
            })?;
        Ok(slot.value.materialized())
    }

    /// Overwrites the variable's current value before the next execution.
    ///
    /// The tensor must match the variable's declared shape and dtype.
    pub fn set_state(&self, value: Tensor) -> Result<(), RuntimeError> {
        let mut inner = self.shared.lock_inner();
        if inner.status_snapshot() == InferStatus::ResultNotReady {
            return Err(RuntimeError::RequestBusy);
        }
        let slot = inner
            .variables
            .slot_mut(self.index)
            .ok_or_else(|| RuntimeError::StateMismatch {
                variable: self.id.clone(),
                detail: "variable slot missing".into(),
            })?;
        if value.shape() != slot.initial.shape() || value.dtype() != slot.initial.dtype() {
            return Err(RuntimeError::StateMismatch {
                variable: self.id.clone(),
                detail: format!(
                    "expected {} {}, got {} {}",
                    slot.initial.dtype(),
                    slot.initial.shape(),
                    value.dtype(),
                    value.shape(),
                ),
            });
        }
        slot.value = value.materialized();
        Ok(())
    }

    /// Resets the variable to its declared initial value; the next
    /// execution behaves as if the request were freshly created.
    pub fn reset(&self) -> Result<(), RuntimeError> {
        let mut inner = self.shared.lock_inner();
        if inner.status_snapshot() == InferStatus::ResultNotReady {
            return Err(RuntimeError::RequestBusy);
        }
        let slot = inner
            .variables
            .slot_mut(self.index)
            .ok_or_else(|| RuntimeError::StateMismatch {
                variable: self.id.clone(),
                detail: "variable slot missing".into(),
            })?;
        slot.value = slot.initial.materialized();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryState")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}
