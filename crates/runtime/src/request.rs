// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The infer request: a single bindable, executable invocation handle.
//!
//! # State machine
//! ```text
//!                 submit            complete
//! NotStarted ───────────► Busy ───────────────► Done { ok }
//!                          ▲                        │
//!                          └────────── submit ──────┘
//! ```
//! At most one execution is in flight per request: a submission while
//! `Busy` fails with a busy-state error without blocking, and so does any
//! mutation of bound tensors, batch, or memory state. Input tensors are
//! snapshotted at submission — a later rebind can never race an in-flight
//! execution.
//!
//! # Completion ordering
//! The finishing thread stores the results, invokes the completion
//! callback (outside the request lock), and only then marks the request
//! done and wakes waiters. A callback therefore always runs before the
//! terminal status is observable through `wait` on another thread, and a
//! callback probing its own request sees `RESULT_NOT_READY` — the race is
//! part of the contract, not a bug.

use crate::state::{MemoryState, VariableStore};
use crate::{Executable, ExecutionProfile, InferStatus, RuntimeError};
use model_graph::{ModelGraph, PortInfo, PortRef, Validated};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tensor_core::{Dimension, PartialShape, Shape, Tensor};

/// Lifecycle phase of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing was ever submitted.
    NotStarted,
    /// An execution is in flight.
    Busy,
    /// The last execution finished.
    Done { ok: bool },
}

/// Which port list a key resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

type Callback = Box<dyn FnMut(InferStatus) + Send>;

/// Mutable request state, guarded by the request lock.
pub(crate) struct RequestInner {
    phase: Phase,
    /// One bound tensor per input port, in port order.
    inputs: Vec<Tensor>,
    /// Outputs of the last completed execution, in port order.
    outputs: Vec<Tensor>,
    /// Per-request persistent variable state. Taken out of the inner state
    /// for the duration of an execution; state accessors reject callers
    /// with a busy error meanwhile.
    pub(crate) variables: VariableStore,
    callback: Option<Callback>,
    batch: Option<usize>,
    last_error: Option<String>,
    profile: ExecutionProfile,
}

impl RequestInner {
    /// Non-blocking status snapshot.
    pub(crate) fn status_snapshot(&self) -> InferStatus {
        match self.phase {
            Phase::NotStarted => InferStatus::NotStarted,
            Phase::Busy => InferStatus::ResultNotReady,
            Phase::Done { ok: true } => InferStatus::Ok,
            Phase::Done { ok: false } => InferStatus::Failed,
        }
    }
}

/// State shared between request handles and executing threads.
pub(crate) struct RequestShared {
    exec: Arc<dyn Executable>,
    profiling: bool,
    inner: Mutex<RequestInner>,
    done_cv: Condvar,
}

impl RequestShared {
    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, RequestInner> {
        self.inner.lock().expect("request lock poisoned")
    }

    fn graph(&self) -> &ModelGraph<Validated> {
        self.exec.graph()
    }
}

/// The smallest shape a port admits: dynamic dimensions collapse to their
/// lower bound. Used to pre-size default tensors at request creation.
fn floor_shape(shape: &PartialShape) -> Shape {
    Shape::new(
        shape
            .dims()
            .iter()
            .map(|d| match d {
                Dimension::Fixed(n) => *n,
                Dimension::Bounded { min, .. } => *min,
            })
            .collect(),
    )
}

/// A single bindable, executable invocation handle of a compiled model.
///
/// Requests are cheap to clone; clones address the same underlying
/// request. All methods take `&self` — the request is internally
/// synchronized and `Send + Sync`.
#[derive(Clone)]
pub struct InferRequest {
    shared: Arc<RequestShared>,
}

impl InferRequest {
    pub(crate) fn new(exec: Arc<dyn Executable>, profiling: bool) -> Self {
        let graph = exec.graph();
        let inputs = graph
            .inputs
            .iter()
            .map(|p| Tensor::zeros(floor_shape(&p.shape), p.dtype))
            .collect();
        let outputs = graph
            .outputs
            .iter()
            .map(|p| Tensor::zeros(floor_shape(&p.shape), p.dtype))
            .collect();
        let variables = VariableStore::from_graph(graph);
        Self {
            shared: Arc::new(RequestShared {
                exec,
                profiling,
                inner: Mutex::new(RequestInner {
                    phase: Phase::NotStarted,
                    inputs,
                    outputs,
                    variables,
                    callback: None,
                    batch: None,
                    last_error: None,
                    profile: ExecutionProfile::default(),
                }),
                done_cv: Condvar::new(),
            }),
        }
    }

    // ── Port resolution and binding ────────────────────────────

    fn resolve(
        graph: &ModelGraph<Validated>,
        key: &PortRef,
    ) -> Result<(Direction, usize), RuntimeError> {
        match key {
            PortRef::Name(name) => {
                if let Some(p) = graph.find_input(name) {
                    return Ok((Direction::Input, p.index));
                }
                if let Some(p) = graph.find_output(name) {
                    return Ok((Direction::Output, p.index));
                }
                Err(RuntimeError::PortNotFound(name.clone()))
            }
            PortRef::Index(index) => {
                if *index < graph.inputs.len() {
                    Ok((Direction::Input, *index))
                } else {
                    Err(RuntimeError::PortNotFound(format!("#{index}")))
                }
            }
            PortRef::Port(port) => {
                if graph.inputs.get(port.index) == Some(port) {
                    return Ok((Direction::Input, port.index));
                }
                if graph.outputs.get(port.index) == Some(port) {
                    return Ok((Direction::Output, port.index));
                }
                // A handle whose name exists but whose description differs
                // was taken from some other model.
                if graph.find_input(&port.name).is_some()
                    || graph.find_output(&port.name).is_some()
                {
                    Err(RuntimeError::InvalidPortKey(port.name.clone()))
                } else {
                    Err(RuntimeError::PortNotFound(port.name.clone()))
                }
            }
        }
    }

    fn bind_locked(
        graph: &ModelGraph<Validated>,
        inner: &mut RequestInner,
        key: PortRef,
        tensor: Tensor,
    ) -> Result<(), RuntimeError> {
        let (direction, index) = Self::resolve(graph, &key)?;
        let port = match direction {
            Direction::Input => &graph.inputs[index],
            Direction::Output => &graph.outputs[index],
        };

        if tensor.dtype() != port.dtype {
            return Err(RuntimeError::PrecisionMismatch {
                port: port.name.clone(),
                expected: port.dtype,
                actual: tensor.dtype(),
            });
        }

        match port.required_bytes() {
            // Static port: the byte size must match exactly.
            Some(expected) => {
                let actual = tensor.byte_len();
                if actual != expected {
                    return Err(match direction {
                        Direction::Input => RuntimeError::InputSizeMismatch {
                            port: port.name.clone(),
                            expected,
                            actual,
                        },
                        Direction::Output => RuntimeError::OutputSizeMismatch {
                            port: port.name.clone(),
                            expected,
                            actual,
                        },
                    });
                }
            }
            // Dynamic port: the bound shape must be admissible.
            None => {
                if !port.shape.compatible_with(tensor.shape()) {
                    return Err(RuntimeError::ShapeNotCompatible {
                        port: port.name.clone(),
                        shape: tensor.shape().clone(),
                        declared: port.shape.clone(),
                    });
                }
            }
        }

        match direction {
            Direction::Input => inner.inputs[index] = tensor,
            Direction::Output => inner.outputs[index] = tensor,
        }
        Ok(())
    }

    /// Binds a tensor to an input or output port.
    ///
    /// Rejected with a busy-state error while an execution is in flight.
    /// A tensor constructed by deep copy may have its source mutated
    /// freely afterwards; a tensor aliasing a [`tensor_core::SharedBuffer`]
    /// is bound without copying.
    pub fn set_tensor(
        &self,
        key: impl Into<PortRef>,
        tensor: Tensor,
    ) -> Result<(), RuntimeError> {
        let mut inner = self.shared.lock_inner();
        if inner.phase == Phase::Busy {
            return Err(RuntimeError::RequestBusy);
        }
        Self::bind_locked(self.shared.graph(), &mut inner, key.into(), tensor)
    }

    /// Returns the tensor currently bound to an input port.
    ///
    /// The returned handle aliases the bound tensor's storage only when
    /// that tensor was bound in shared-memory mode.
    pub fn input_tensor(&self, key: impl Into<PortRef>) -> Result<Tensor, RuntimeError> {
        let key = key.into();
        let graph = self.shared.graph();
        let (direction, index) = Self::resolve(graph, &key)?;
        if direction != Direction::Input {
            return Err(RuntimeError::PortNotFound(key.describe()));
        }
        Ok(self.shared.lock_inner().inputs[index].clone())
    }

    /// Returns the output tensor of the last completed execution.
    pub fn output_tensor(&self, key: impl Into<PortRef>) -> Result<Tensor, RuntimeError> {
        let key = key.into();
        let graph = self.shared.graph();
        let (direction, index) = Self::resolve(graph, &key)?;
        if direction != Direction::Output {
            return Err(RuntimeError::PortNotFound(key.describe()));
        }
        Ok(self.shared.lock_inner().outputs[index].clone())
    }

    /// Writes raw bytes into the tensor bound to an input port.
    ///
    /// Rejected with a busy-state error while an execution is in flight.
    pub fn write_input(
        &self,
        key: impl Into<PortRef>,
        data: &[u8],
    ) -> Result<(), RuntimeError> {
        let key = key.into();
        let graph = self.shared.graph();
        let (direction, index) = Self::resolve(graph, &key)?;
        if direction != Direction::Input {
            return Err(RuntimeError::PortNotFound(key.describe()));
        }
        let mut inner = self.shared.lock_inner();
        if inner.phase == Phase::Busy {
            return Err(RuntimeError::RequestBusy);
        }
        inner.inputs[index].write_bytes(data)?;
        Ok(())
    }

    // ── Submission and execution ───────────────────────────────

    fn submit<K: Into<PortRef>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Tensor)>,
    ) -> Result<(), RuntimeError> {
        let mut inner = self.shared.lock_inner();
        if inner.phase == Phase::Busy {
            return Err(RuntimeError::RequestBusy);
        }
        let graph = self.shared.graph();
        for (key, tensor) in inputs {
            Self::bind_locked(graph, &mut inner, key.into(), tensor)?;
        }
        inner.phase = Phase::Busy;
        inner.last_error = None;
        tracing::debug!(model = %graph.name, "execution submitted");
        Ok(())
    }

    /// Runs the in-flight execution to completion on the current thread.
    ///
    /// Stores results, invokes the callback outside the lock, then marks
    /// the request done and wakes waiters.
    fn run_to_completion(shared: &Arc<RequestShared>) -> InferStatus {
        let (inputs, mut variables, batch) = {
            let mut inner = shared.lock_inner();
            (
                inner.inputs.clone(),
                std::mem::take(&mut inner.variables),
                inner.batch,
            )
        };

        let result = shared
            .exec
            .execute(&inputs, &mut variables, batch, shared.profiling);

        let (status, mut callback) = {
            let mut inner = shared.lock_inner();
            inner.variables = variables;
            let status = match result {
                Ok(execution) => {
                    inner.outputs = execution.outputs;
                    inner.profile = execution.profile;
                    InferStatus::Ok
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, "execution failed");
                    inner.last_error = Some(message);
                    InferStatus::Failed
                }
            };
            (status, inner.callback.take())
        };

        // The callback runs on the finishing thread, without the request
        // lock, while the request is still formally busy: probing its own
        // status from inside the callback yields RESULT_NOT_READY.
        if let Some(cb) = callback.as_mut() {
            cb(status);
        }

        {
            let mut inner = shared.lock_inner();
            // Keep the handler registered unless the callback replaced it.
            if inner.callback.is_none() {
                inner.callback = callback;
            }
            inner.phase = Phase::Done {
                ok: status == InferStatus::Ok,
            };
            shared.done_cv.notify_all();
        }
        status
    }

    fn collect(&self, status: InferStatus) -> Result<Outputs, RuntimeError> {
        if status == InferStatus::Failed {
            let message = self
                .shared
                .lock_inner()
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown backend failure".into());
            return Err(RuntimeError::ExecutionFailed(message));
        }
        Ok(self.outputs())
    }

    /// Executes synchronously on the calling thread with the currently
    /// bound inputs, returning the outputs keyed by output port.
    pub fn infer(&self) -> Result<Outputs, RuntimeError> {
        self.submit(std::iter::empty::<(PortRef, Tensor)>())?;
        let status = Self::run_to_completion(&self.shared);
        self.collect(status)
    }

    /// Binds the given inputs, then executes synchronously on the calling
    /// thread. Equivalent to `set_tensor` for each entry followed by
    /// [`infer`](Self::infer) — one code path, not two.
    pub fn infer_with<K: Into<PortRef>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Tensor)>,
    ) -> Result<Outputs, RuntimeError> {
        self.submit(inputs)?;
        let status = Self::run_to_completion(&self.shared);
        self.collect(status)
    }

    /// Schedules an asynchronous execution with the currently bound inputs
    /// and returns immediately.
    ///
    /// At most one execution may be outstanding: a second call while busy
    /// fails with a busy-state error and does not affect the in-flight
    /// execution. Execution errors are never reported here — they surface
    /// as a `FAILED` status through [`wait`](Self::wait).
    pub fn start_async(&self) -> Result<(), RuntimeError> {
        self.start_async_with(std::iter::empty::<(PortRef, Tensor)>())
    }

    /// Binds the given inputs, then schedules an asynchronous execution.
    pub fn start_async_with<K: Into<PortRef>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Tensor)>,
    ) -> Result<(), RuntimeError> {
        self.submit(inputs)?;
        let shared = Arc::clone(&self.shared);
        std::thread::spawn(move || {
            InferRequest::run_to_completion(&shared);
        });
        Ok(())
    }

    // ── Waiting and status ─────────────────────────────────────

    /// Blocks until the in-flight execution completes.
    ///
    /// Returns `INFER_NOT_STARTED` immediately (without blocking) when
    /// nothing was ever submitted; otherwise returns the terminal `OK` or
    /// `FAILED` status.
    pub fn wait(&self) -> InferStatus {
        let mut inner = self.shared.lock_inner();
        loop {
            match inner.phase {
                Phase::NotStarted => return InferStatus::NotStarted,
                Phase::Done { ok: true } => return InferStatus::Ok,
                Phase::Done { ok: false } => return InferStatus::Failed,
                Phase::Busy => {
                    inner = self
                        .shared
                        .done_cv
                        .wait(inner)
                        .expect("request lock poisoned");
                }
            }
        }
    }

    /// Blocks up to `timeout` for the in-flight execution to complete.
    ///
    /// Returns `REQUEST_BUSY` when the timeout expires first; the caller
    /// polls again at its own pace — the runtime never retries internally.
    pub fn wait_for(&self, timeout: Duration) -> InferStatus {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.lock_inner();
        loop {
            match inner.phase {
                Phase::NotStarted => return InferStatus::NotStarted,
                Phase::Done { ok: true } => return InferStatus::Ok,
                Phase::Done { ok: false } => return InferStatus::Failed,
                Phase::Busy => {
                    let now = Instant::now();
                    if now >= deadline {
                        return InferStatus::Busy;
                    }
                    let (guard, _timed_out) = self
                        .shared
                        .done_cv
                        .wait_timeout(inner, deadline - now)
                        .expect("request lock poisoned");
                    inner = guard;
                }
            }
        }
    }

    /// Returns a status snapshot without blocking.
    ///
    /// Reports `RESULT_NOT_READY` while an execution is in flight.
    pub fn status(&self) -> InferStatus {
        self.shared.lock_inner().status_snapshot()
    }

    /// Returns a lightweight probe observing this request's status without
    /// keeping the request alive. Intended for completion callbacks.
    pub fn status_probe(&self) -> StatusProbe {
        StatusProbe {
            shared: Arc::downgrade(&self.shared),
        }
    }

    // ── Callbacks, batch, state, profiling ─────────────────────

    /// Registers the completion handler, replacing any prior one.
    ///
    /// The handler is invoked exactly once per completed execution, on the
    /// thread that finished the execution, with the completion status.
    /// Registration is always legal, including before first use.
    pub fn set_callback(&self, callback: impl FnMut(InferStatus) + Send + 'static) {
        self.shared.lock_inner().callback = Some(Box::new(callback));
    }

    /// Rescales the leading dimension of batch-aware inputs for the next
    /// execution.
    ///
    /// Fails with an invalid-batch error for `batch <= 0` and with a
    /// busy-state error while an execution is in flight.
    pub fn set_batch(&self, batch: i64) -> Result<(), RuntimeError> {
        if batch <= 0 {
            return Err(RuntimeError::InvalidBatchSize(batch));
        }
        let mut inner = self.shared.lock_inner();
        if inner.phase == Phase::Busy {
            return Err(RuntimeError::RequestBusy);
        }
        inner.batch = Some(batch as usize);
        Ok(())
    }

    /// Returns handles to the model's persistent variables, in declaration
    /// order.
    pub fn query_state(&self) -> Vec<MemoryState> {
        self.shared
            .graph()
            .variables
            .iter()
            .enumerate()
            .map(|(index, v)| MemoryState {
                shared: Arc::clone(&self.shared),
                index,
                id: v.id.clone(),
            })
            .collect()
    }

    /// Returns the outputs of the last completed execution, keyed by
    /// output port.
    pub fn outputs(&self) -> Outputs {
        let graph = self.shared.graph();
        let inner = self.shared.lock_inner();
        Outputs {
            entries: graph
                .outputs
                .iter()
                .cloned()
                .zip(inner.outputs.iter().cloned())
                .collect(),
        }
    }

    /// Returns the profile of the most recent execution (empty when
    /// profiling is disabled).
    pub fn profiling_info(&self) -> ExecutionProfile {
        self.shared.lock_inner().profile.clone()
    }

    /// Returns the diagnostic message of the last failed execution.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock_inner().last_error.clone()
    }
}

impl std::fmt::Debug for InferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferRequest")
            .field("model", &self.shared.graph().name)
            .field("status", &self.status())
            .finish()
    }
}

/// A weak, cloneable observer of one request's status.
///
/// Holding a probe does not keep the request alive, so a completion
/// callback may capture one without creating a reference cycle.
#[derive(Clone)]
pub struct StatusProbe {
    shared: std::sync::Weak<RequestShared>,
}

impl StatusProbe {
    /// Returns a status snapshot, or `None` once the request (and all its
    /// clones) have been dropped.
    pub fn status(&self) -> Option<InferStatus> {
        self.shared
            .upgrade()
            .map(|shared| shared.lock_inner().status_snapshot())
    }
}

/// Outputs of one execution, keyed by output port.
///
/// Entries are ordered as the model declares its output ports and are
/// addressable by name, index, or port handle.
#[derive(Debug, Clone)]
pub struct Outputs {
    entries: Vec<(PortInfo, Tensor)>,
}

impl Outputs {
    /// Returns the tensor for the given output port key.
    pub fn get(&self, key: impl Into<PortRef>) -> Option<&Tensor> {
        match key.into() {
            PortRef::Name(name) => self
                .entries
                .iter()
                .find(|(p, _)| p.name == name)
                .map(|(_, t)| t),
            PortRef::Index(index) => self.entries.get(index).map(|(_, t)| t),
            PortRef::Port(port) => self
                .entries
                .iter()
                .find(|(p, _)| *p == port)
                .map(|(_, t)| t),
        }
    }

    /// Returns the number of output ports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the model has no outputs (never the case for a
    /// validated graph).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(port, tensor)` pairs in port order.
    pub fn iter(&self) -> impl Iterator<Item = &(PortInfo, Tensor)> {
        self.entries.iter()
    }
}
