// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: the complete request lifecycle.
//!
//! These tests exercise the full flow from graph construction →
//! compilation → request creation → synchronous/asynchronous execution,
//! including busy-state rejection, waits, callbacks, memory states,
//! dynamic shapes, and shared-memory bindings.

use model_graph::{GraphBuilder, ModelGraph, Validated};
use runtime::{
    Backend, CompiledModel, Executable, InferRequest, InferStatus, ReferenceBackend,
    RuntimeConfig, RuntimeError, VariableStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tensor_core::{DType, Dimension, PartialShape, Shape, SharedBuffer, Tensor, TensorDesc};

// ── Helpers ────────────────────────────────────────────────────

const IMAGE_ELEMENTS: usize = 3 * 32 * 32;

/// The canonical classifier: `data` [1, 3, 32, 32] f32 → `fc_out` [1, 10].
/// Weight column 2 sums the flattened input, so any positive image puts
/// the argmax at class 2.
fn fc_classifier_graph() -> ModelGraph<Validated> {
    let mut b = GraphBuilder::new("fc-classifier");
    let data = b.input("data", PartialShape::fixed(&[1, 3, 32, 32]), DType::F32);

    let mut weights = vec![0.0f32; IMAGE_ELEMENTS * 10];
    for k in 0..IMAGE_ELEMENTS {
        weights[k * 10 + 2] = 1.0;
    }
    let w = b.constant(
        "fc.weight",
        Tensor::from_f32(Shape::matrix(IMAGE_ELEMENTS, 10), &weights).unwrap(),
    );
    let bias = b.constant(
        "fc.bias",
        Tensor::from_f32(Shape::vector(10), &[0.1; 10]).unwrap(),
    );
    let fc = b.fully_connected("fc", data, w, Some(bias));
    b.result("fc_out", PartialShape::fixed(&[1, 10]), DType::F32, fc);
    b.build().unwrap()
}

fn fc_classifier() -> CompiledModel {
    let backend = ReferenceBackend::new();
    CompiledModel::compile(&backend, fc_classifier_graph(), &RuntimeConfig::default()).unwrap()
}

/// A deterministic, strictly positive input image.
fn canonical_image() -> Tensor {
    let values: Vec<f32> = (0..IMAGE_ELEMENTS)
        .map(|i| ((i % 255) as f32 + 1.0) / 255.0)
        .collect();
    Tensor::from_f32(Shape::new(vec![1, 3, 32, 32]), &values).unwrap()
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap()
}

/// The read-add-assign accumulator model over one variable.
fn memory_model(dims: &[usize], dtype: DType) -> CompiledModel {
    let mut b = GraphBuilder::new("memory-add");
    let shape = Shape::new(dims.to_vec());
    b.variable("var_id_667", shape, dtype, None);
    let x = b.input("input_data", PartialShape::fixed(dims), dtype);
    let rv = b.read_value("mem.read", "var_id_667");
    let sum = b.add("mem.add", rv, x);
    let assigned = b.assign("mem.assign", "var_id_667", sum);
    b.result("mem_out", PartialShape::fixed(dims), dtype, assigned);

    let backend = ReferenceBackend::new();
    CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap()
}

/// A relu model with a dynamic leading dimension `0..5`.
fn dynamic_relu() -> CompiledModel {
    let shape = PartialShape::new(vec![
        Dimension::range(0, 5),
        Dimension::Fixed(4),
        Dimension::Fixed(20),
        Dimension::Fixed(20),
    ]);
    let mut b = GraphBuilder::new("dynamic-relu");
    let data = b.input("data", shape.clone(), DType::F32);
    let act = b.relu("act", data);
    b.result("out", shape, DType::F32, act);

    let backend = ReferenceBackend::new();
    CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap()
}

// A backend that delays every execution, for busy-state tests.

struct SlowExecutable {
    inner: Arc<dyn Executable>,
    delay: Duration,
}

impl Executable for SlowExecutable {
    fn graph(&self) -> &ModelGraph<Validated> {
        self.inner.graph()
    }

    fn execute(
        &self,
        inputs: &[Tensor],
        variables: &mut VariableStore,
        batch: Option<usize>,
        profiling: bool,
    ) -> Result<runtime::Execution, RuntimeError> {
        std::thread::sleep(self.delay);
        self.inner.execute(inputs, variables, batch, profiling)
    }
}

struct SlowBackend {
    delay: Duration,
}

impl Backend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow-reference"
    }

    fn compile(
        &self,
        graph: ModelGraph<Validated>,
    ) -> Result<Arc<dyn Executable>, RuntimeError> {
        Ok(Arc::new(SlowExecutable {
            inner: ReferenceBackend::new().compile(graph)?,
            delay: self.delay,
        }))
    }
}

fn slow_fc_classifier(delay: Duration) -> CompiledModel {
    let backend = SlowBackend { delay };
    CompiledModel::compile(&backend, fc_classifier_graph(), &RuntimeConfig::default()).unwrap()
}

// ── Sync / async equivalence ───────────────────────────────────

#[test]
fn test_sync_and_async_outputs_identical() {
    let model = fc_classifier();
    let image = canonical_image();

    let sync_request = model.create_request();
    let sync_out = sync_request
        .infer_with([("data", image.clone())])
        .unwrap();

    let async_request = model.create_request();
    async_request
        .start_async_with([("data", image)])
        .unwrap();
    assert_eq!(async_request.wait(), InferStatus::Ok);
    let async_out = async_request.output_tensor("fc_out").unwrap();

    assert_eq!(
        sync_out.get("fc_out").unwrap().to_f32_vec(),
        async_out.to_f32_vec(),
    );
}

#[test]
fn test_fc_classifier_scenario() {
    let model = fc_classifier();
    let request = model.create_request();

    let outputs = request.infer_with([("data", canonical_image())]).unwrap();
    let out = outputs.get("fc_out").unwrap();
    assert_eq!(out.shape(), &Shape::matrix(1, 10));
    assert_eq!(argmax(&out.to_f32_vec()), 2);
}

#[test]
fn test_callable_shorthand_outputs_keyed_by_port() {
    let model = fc_classifier();
    let request = model.create_request();
    let outputs = request.infer_with([("data", canonical_image())]).unwrap();

    // Addressable by handle, by name, and by index, with identical data.
    let port = model.output("fc_out").unwrap().clone();
    let by_handle = outputs.get(&port).unwrap().to_f32_vec();
    let by_name = outputs.get("fc_out").unwrap().to_f32_vec();
    let by_index = outputs.get(0usize).unwrap().to_f32_vec();
    assert_eq!(by_handle, by_name);
    assert_eq!(by_handle, by_index);

    // Identical to an explicit bind-then-infer on the same request.
    request.set_tensor("data", canonical_image()).unwrap();
    let explicit = request.infer().unwrap();
    assert_eq!(explicit.get("fc_out").unwrap().to_f32_vec(), by_handle);
}

#[test]
fn test_fill_bound_input_then_infer() {
    let model = fc_classifier();
    let request = model.create_request();

    let image = canonical_image();
    let bytes = image.with_bytes(|b| b.to_vec());
    request.write_input("data", &bytes).unwrap();

    // Bound input reads back what was written.
    let bound = request.input_tensor("data").unwrap();
    assert_eq!(bound.to_f32_vec(), image.to_f32_vec());

    request.start_async().unwrap();
    assert_eq!(request.wait(), InferStatus::Ok);
    let out = request.output_tensor("fc_out").unwrap();
    assert_eq!(argmax(&out.to_f32_vec()), 2);
}

// ── Wait semantics ─────────────────────────────────────────────

#[test]
fn test_wait_before_any_submission_returns_not_started() {
    let model = fc_classifier();
    let request = model.create_request();

    let start = Instant::now();
    assert_eq!(request.wait(), InferStatus::NotStarted);
    assert_eq!(request.wait_for(Duration::from_secs(5)), InferStatus::NotStarted);
    assert_eq!(request.status(), InferStatus::NotStarted);
    // None of the three may block.
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_timed_wait_returns_busy_then_ok() {
    let model = slow_fc_classifier(Duration::from_millis(300));
    let request = model.create_request();
    request
        .start_async_with([("data", canonical_image())])
        .unwrap();

    // The execution sleeps 300ms; a 20ms wait must expire first.
    let status = request.wait_for(Duration::from_millis(20));
    assert_eq!(status, InferStatus::Busy);

    // Caller-driven polling loop, as the status contract prescribes.
    let mut polls = 0;
    let mut status = InferStatus::Busy;
    while polls < 100 && status != InferStatus::Ok {
        status = request.wait_for(Duration::from_millis(50));
        polls += 1;
    }
    assert_eq!(status, InferStatus::Ok);
    let out = request.output_tensor("fc_out").unwrap();
    assert_eq!(argmax(&out.to_f32_vec()), 2);
}

#[test]
fn test_status_after_completion_is_sticky() {
    let model = fc_classifier();
    let request = model.create_request();
    request.infer_with([("data", canonical_image())]).unwrap();

    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(request.status(), InferStatus::Ok);
}

// ── Busy-state exclusivity ─────────────────────────────────────

#[test]
fn test_busy_request_rejects_everything_but_observation() {
    let model = slow_fc_classifier(Duration::from_millis(400));
    let request = model.create_request();
    request
        .start_async_with([("data", canonical_image())])
        .unwrap();

    // Status observation never blocks and reports an in-flight result.
    assert_eq!(request.status(), InferStatus::ResultNotReady);

    // A second submission fails without blocking.
    assert!(matches!(
        request.start_async(),
        Err(RuntimeError::RequestBusy)
    ));
    assert!(matches!(request.infer(), Err(RuntimeError::RequestBusy)));

    // Rebinding and direct buffer writes fail.
    assert!(matches!(
        request.set_tensor("data", canonical_image()),
        Err(RuntimeError::RequestBusy)
    ));
    let zeros = vec![0u8; IMAGE_ELEMENTS * 4];
    assert!(matches!(
        request.write_input("data", &zeros),
        Err(RuntimeError::RequestBusy)
    ));

    // Batch mutation fails.
    assert!(matches!(
        request.set_batch(1),
        Err(RuntimeError::RequestBusy)
    ));

    // The rejected calls did not disturb the in-flight execution.
    assert_eq!(request.wait(), InferStatus::Ok);
    let out = request.output_tensor("fc_out").unwrap();
    assert_eq!(argmax(&out.to_f32_vec()), 2);
}

#[test]
fn test_memory_state_access_rejected_while_busy() {
    let mut b = GraphBuilder::new("slow-memory");
    b.variable("acc", Shape::vector(4), DType::F32, None);
    let x = b.input("input_data", PartialShape::fixed(&[4]), DType::F32);
    let rv = b.read_value("acc.read", "acc");
    let sum = b.add("acc.add", rv, x);
    let assigned = b.assign("acc.assign", "acc", sum);
    b.result("mem_out", PartialShape::fixed(&[4]), DType::F32, assigned);

    let backend = SlowBackend {
        delay: Duration::from_millis(300),
    };
    let model =
        CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap();
    let request = model.create_request();
    let states = request.query_state();
    assert_eq!(states.len(), 1);

    let ones = Tensor::from_f32(Shape::vector(4), &[1.0; 4]).unwrap();
    request.start_async_with([("input_data", ones)]).unwrap();

    assert!(matches!(
        states[0].state(),
        Err(RuntimeError::RequestBusy)
    ));
    assert!(matches!(states[0].reset(), Err(RuntimeError::RequestBusy)));
    assert!(matches!(
        states[0].set_state(Tensor::zeros(Shape::vector(4), DType::F32)),
        Err(RuntimeError::RequestBusy)
    ));

    assert_eq!(request.wait(), InferStatus::Ok);
    // Idle again: state reads are safe and reflect the completed run.
    assert_eq!(states[0].state().unwrap().to_f32_vec(), vec![1.0; 4]);
}

// ── Batch handling ─────────────────────────────────────────────

#[test]
fn test_set_batch_rejects_non_positive_values() {
    let model = fc_classifier();
    let request = model.create_request();

    for bad in [0i64, -1] {
        let err = request.set_batch(bad).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidBatchSize(n) if n == bad));
        assert!(err
            .to_string()
            .contains(&format!("Batch size should be positive integer number but {bad} specified")));
    }
}

#[test]
fn test_set_batch_rescales_leading_dimension() {
    let mut b = GraphBuilder::new("batched-relu");
    let data = b.input("data", PartialShape::fixed(&[4, 3]), DType::F32);
    let act = b.relu("act", data);
    b.result("out", PartialShape::fixed(&[4, 3]), DType::F32, act);
    let backend = ReferenceBackend::new();
    let model =
        CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap();

    let request = model.create_request();
    request.set_batch(1).unwrap();

    let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
    let input = Tensor::from_f32(Shape::matrix(4, 3), &values).unwrap();
    let outputs = request.infer_with([("data", input)]).unwrap();

    let out = outputs.get("out").unwrap();
    assert_eq!(out.shape(), &Shape::matrix(1, 3));
    assert_eq!(out.to_f32_vec(), vec![0.0, 1.0, 2.0]);
}

// ── Binding errors ─────────────────────────────────────────────

#[test]
fn test_bind_unknown_port() {
    let model = fc_classifier();
    let request = model.create_request();

    let err = request
        .set_tensor("incorrect_name", canonical_image())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PortNotFound(_)));
    assert!(err
        .to_string()
        .contains("failed to find input or output with name: 'incorrect_name'"));

    assert!(matches!(
        request.set_tensor(7usize, canonical_image()),
        Err(RuntimeError::PortNotFound(_))
    ));
}

#[test]
fn test_bind_foreign_port_handle() {
    let model = fc_classifier();

    // Another model declaring a same-named port with a different shape.
    let mut b = GraphBuilder::new("other");
    let data = b.input("data", PartialShape::fixed(&[1, 8]), DType::F32);
    let act = b.relu("act", data);
    b.result("out", PartialShape::fixed(&[1, 8]), DType::F32, act);
    let backend = ReferenceBackend::new();
    let other =
        CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap();

    let foreign = other.input("data").unwrap().clone();
    let request = model.create_request();
    assert!(matches!(
        request.set_tensor(foreign, canonical_image()),
        Err(RuntimeError::InvalidPortKey(_))
    ));
}

#[test]
fn test_bind_size_mismatch_distinguishes_input_and_output() {
    let model = fc_classifier();
    let request = model.create_request();

    let wrong = Tensor::zeros(Shape::new(vec![2, 3, 32, 32]), DType::F32);
    let err = request.set_tensor("data", wrong.clone()).unwrap_err();
    assert!(matches!(err, RuntimeError::InputSizeMismatch { .. }));
    assert!(err.to_string().contains("input tensor size is not equal"));

    let err = request.set_tensor("fc_out", wrong).unwrap_err();
    assert!(matches!(err, RuntimeError::OutputSizeMismatch { .. }));
    assert!(err.to_string().contains("output tensor size is not equal"));
}

#[test]
fn test_bind_wrong_dtype() {
    let model = fc_classifier();
    let request = model.create_request();

    let ints = Tensor::zeros(Shape::new(vec![1, 3, 32, 32]), DType::I32);
    assert!(matches!(
        request.set_tensor("data", ints),
        Err(RuntimeError::PrecisionMismatch { .. })
    ));
}

// ── Callbacks ──────────────────────────────────────────────────

#[test]
fn test_callback_invoked_exactly_once_per_execution() {
    let model = fc_classifier();
    let request = model.create_request();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    request.set_callback(move |status| {
        assert_eq!(status, InferStatus::Ok);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    request
        .start_async_with([("data", canonical_image())])
        .unwrap();
    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The handler stays registered for subsequent executions.
    request.start_async().unwrap();
    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_callback_registered_before_first_use_and_wait_not_started() {
    let model = fc_classifier();
    let request = model.create_request();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    request.set_callback(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(request.wait(), InferStatus::NotStarted);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    request
        .start_async_with([("data", canonical_image())])
        .unwrap();
    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_probing_own_status_sees_result_not_ready() {
    let model = fc_classifier();
    let request = model.create_request();

    let probe = request.status_probe();
    assert_eq!(probe.status(), Some(InferStatus::NotStarted));

    let observed = Arc::new(Mutex::new(None));
    let signal = Arc::new((Mutex::new(false), Condvar::new()));

    let observed_in_cb = Arc::clone(&observed);
    let signal_in_cb = Arc::clone(&signal);
    request.set_callback(move |_| {
        // The documented race: the callback runs before the terminal
        // status is finalized, so its own snapshot is not yet OK.
        *observed_in_cb.lock().unwrap() = probe.status();
        let (flag, cv) = &*signal_in_cb;
        *flag.lock().unwrap() = true;
        cv.notify_all();
    });

    request
        .start_async_with([("data", canonical_image())])
        .unwrap();

    // Block on the condition variable the callback signals.
    let (flag, cv) = &*signal;
    let mut fired = flag.lock().unwrap();
    while !*fired {
        fired = cv.wait(fired).unwrap();
    }
    drop(fired);

    assert_eq!(request.wait(), InferStatus::Ok);
    assert_eq!(*observed.lock().unwrap(), Some(InferStatus::ResultNotReady));
}

#[test]
fn test_wait_returns_after_slow_callback_finishes() {
    let model = fc_classifier();
    let request = model.create_request();

    let finished = Arc::new(Mutex::new(false));
    let finished_in_cb = Arc::clone(&finished);
    request.set_callback(move |_| {
        std::thread::sleep(Duration::from_millis(50));
        *finished_in_cb.lock().unwrap() = true;
    });

    request
        .start_async_with([("data", canonical_image())])
        .unwrap();
    assert_eq!(request.wait(), InferStatus::Ok);
    // Callback completion happens-before wait() observes OK.
    assert!(*finished.lock().unwrap());
}

// ── Execution failures ─────────────────────────────────────────

/// A model whose add kernel fails when the bound input is not 3 elements.
fn fragile_model() -> CompiledModel {
    let mut b = GraphBuilder::new("fragile");
    let x = b.input(
        "x",
        PartialShape::new(vec![Dimension::any()]),
        DType::F32,
    );
    let c = b.constant(
        "offset",
        Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap(),
    );
    let sum = b.add("sum", x, c);
    b.result(
        "out",
        PartialShape::new(vec![Dimension::any()]),
        DType::F32,
        sum,
    );
    let backend = ReferenceBackend::new();
    CompiledModel::compile(&backend, b.build().unwrap(), &RuntimeConfig::default()).unwrap()
}

#[test]
fn test_execution_failure_surfaces_from_infer() {
    let model = fragile_model();
    let request = model.create_request();

    let bad = Tensor::from_f32(Shape::vector(2), &[1.0, 1.0]).unwrap();
    let err = request.infer_with([("x", bad)]).unwrap_err();
    assert!(matches!(err, RuntimeError::ExecutionFailed(_)));
    assert!(err.to_string().contains("incompatible shapes"));

    assert_eq!(request.status(), InferStatus::Failed);
    assert!(request.last_error().is_some());
}

#[test]
fn test_async_failure_surfaces_via_wait_and_recovers() {
    let model = fragile_model();
    let request = model.create_request();

    // The submitting call is fire-and-forget: it does not report the error.
    let bad = Tensor::from_f32(Shape::vector(2), &[1.0, 1.0]).unwrap();
    request.start_async_with([("x", bad)]).unwrap();
    assert_eq!(request.wait(), InferStatus::Failed);
    let diagnostic = request.last_error().unwrap();
    assert!(diagnostic.contains("incompatible shapes"), "{diagnostic}");

    // No internal retry: a manual resubmission with good inputs succeeds.
    let good = Tensor::from_f32(Shape::vector(3), &[1.0, 1.0, 1.0]).unwrap();
    let outputs = request.infer_with([("x", good)]).unwrap();
    assert_eq!(outputs.get("out").unwrap().to_f32_vec(), vec![2.0, 3.0, 4.0]);
    assert_eq!(request.status(), InferStatus::Ok);
}

#[test]
fn test_failed_execution_invokes_callback_with_failed() {
    let model = fragile_model();
    let request = model.create_request();

    let seen = Arc::new(Mutex::new(None));
    let seen_in_cb = Arc::clone(&seen);
    request.set_callback(move |status| {
        *seen_in_cb.lock().unwrap() = Some(status);
    });

    let bad = Tensor::from_f32(Shape::vector(1), &[1.0]).unwrap();
    request.start_async_with([("x", bad)]).unwrap();
    assert_eq!(request.wait(), InferStatus::Failed);
    assert_eq!(*seen.lock().unwrap(), Some(InferStatus::Failed));
}

// ── Dynamic shapes ─────────────────────────────────────────────

#[test]
fn test_dynamic_shape_reinference() {
    let model = dynamic_relu();
    let request = model.create_request();

    for rows in [2usize, 3, 5] {
        let shape = Shape::new(vec![rows, 4, 20, 20]);
        let input = Tensor::full_f32(shape.clone(), 1.0);
        let outputs = request.infer_with([("data", input)]).unwrap();
        // Output shape tracks the bound input shape of this execution.
        assert_eq!(outputs.get("out").unwrap().shape(), &shape);
    }
}

#[test]
fn test_dynamic_shape_out_of_range_rejected_at_bind() {
    let model = dynamic_relu();
    let request = model.create_request();

    let too_big = Tensor::zeros(Shape::new(vec![6, 4, 20, 20]), DType::F32);
    let err = request.set_tensor("data", too_big).unwrap_err();
    assert!(matches!(err, RuntimeError::ShapeNotCompatible { .. }));

    let wrong_rank = Tensor::zeros(Shape::new(vec![2, 4, 20]), DType::F32);
    assert!(matches!(
        request.set_tensor("data", wrong_rank),
        Err(RuntimeError::ShapeNotCompatible { .. })
    ));
}

#[test]
fn test_dynamic_requests_with_distinct_shapes_in_parallel() {
    let model = dynamic_relu();
    let shapes = [
        Shape::new(vec![3, 4, 20, 20]),
        Shape::new(vec![4, 4, 20, 20]),
        Shape::new(vec![5, 4, 20, 20]),
    ];
    let requests: Vec<InferRequest> = model.create_requests(3);

    for (request, shape) in requests.iter().zip(&shapes) {
        let input = Tensor::full_f32(shape.clone(), 1.0);
        request.start_async_with([("data", input)]).unwrap();
    }
    for (request, shape) in requests.iter().zip(&shapes) {
        assert_eq!(request.wait(), InferStatus::Ok);
        assert_eq!(request.output_tensor("out").unwrap().shape(), shape);
    }
}

// ── Memory states ──────────────────────────────────────────────

#[test]
fn test_memory_state_accumulates_seeds_and_resets() {
    for dims in [&[10usize][..], &[10, 10], &[2, 10, 10, 10]] {
        let model = memory_model(dims, DType::F32);
        let request = model.create_request();
        let n: usize = dims.iter().product();
        let ones = Tensor::from_f32(Shape::new(dims.to_vec()), &vec![1.0; n]).unwrap();

        let states = request.query_state();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].name(), "var_id_667");

        // Plain accumulation: run i yields i everywhere.
        for i in 1..=3 {
            let outputs = request.infer_with([("input_data", ones.clone())]).unwrap();
            let out = outputs.get("mem_out").unwrap().to_f32_vec();
            assert!(out.iter().all(|&v| v == i as f32), "run {i}: {out:?}");
        }

        // Seeding the state makes the next run start from the seed.
        let seed = Tensor::from_f32(Shape::new(dims.to_vec()), &vec![5.0; n]).unwrap();
        states[0].set_state(seed).unwrap();
        let outputs = request.infer_with([("input_data", ones.clone())]).unwrap();
        assert!(outputs
            .get("mem_out")
            .unwrap()
            .to_f32_vec()
            .iter()
            .all(|&v| v == 6.0));

        // Reset: the next run matches a freshly created request.
        states[0].reset().unwrap();
        let after_reset = request.infer_with([("input_data", ones.clone())]).unwrap();

        let fresh = model.create_request();
        let fresh_out = fresh.infer_with([("input_data", ones)]).unwrap();
        assert_eq!(
            after_reset.get("mem_out").unwrap().to_f32_vec(),
            fresh_out.get("mem_out").unwrap().to_f32_vec(),
        );
    }
}

#[test]
fn test_memory_state_i32() {
    let model = memory_model(&[10], DType::I32);
    let request = model.create_request();
    let ones = Tensor::from_i32(Shape::vector(10), &[1; 10]).unwrap();

    for i in 1..=4 {
        let outputs = request.infer_with([("input_data", ones.clone())]).unwrap();
        let out = outputs.get("mem_out").unwrap().to_i32_vec();
        assert!(out.iter().all(|&v| v == i), "run {i}: {out:?}");
    }
}

#[test]
fn test_memory_state_is_per_request() {
    let model = memory_model(&[4], DType::F32);
    let a = model.create_request();
    let b = model.create_request();
    let ones = Tensor::from_f32(Shape::vector(4), &[1.0; 4]).unwrap();

    for _ in 0..3 {
        a.infer_with([("input_data", ones.clone())]).unwrap();
    }
    // Request b's variable is untouched by a's accumulation.
    let outputs = b.infer_with([("input_data", ones)]).unwrap();
    assert_eq!(outputs.get("mem_out").unwrap().to_f32_vec(), vec![1.0; 4]);
}

#[test]
fn test_set_state_validates_declaration() {
    let model = memory_model(&[4], DType::F32);
    let request = model.create_request();
    let states = request.query_state();

    let wrong_shape = Tensor::zeros(Shape::vector(3), DType::F32);
    assert!(matches!(
        states[0].set_state(wrong_shape),
        Err(RuntimeError::StateMismatch { .. })
    ));
    let wrong_dtype = Tensor::zeros(Shape::vector(4), DType::I32);
    assert!(matches!(
        states[0].set_state(wrong_dtype),
        Err(RuntimeError::StateMismatch { .. })
    ));
}

// ── Shared-memory bindings ─────────────────────────────────────

#[test]
fn test_shared_memory_roundtrip_is_stable() {
    let model = fc_classifier();
    let request = model.create_request();

    let image = canonical_image();
    let buffer = SharedBuffer::new(image.with_bytes(|b| b.to_vec()));
    let desc = TensorDesc::new(DType::F32, Shape::new(vec![1, 3, 32, 32]));
    let shared = Tensor::from_shared(desc, buffer.clone()).unwrap();

    request.set_tensor("data", shared).unwrap();

    let first = request.infer().unwrap().get("fc_out").unwrap().to_f32_vec();
    let second = request.infer().unwrap().get("fc_out").unwrap().to_f32_vec();
    assert_eq!(first, second);
    assert_eq!(argmax(&first), 2);

    // Caller-side mutation between idle executions is visible, no rebind.
    buffer.write_f32(&vec![0.0; IMAGE_ELEMENTS]);
    let third = request.infer().unwrap().get("fc_out").unwrap().to_f32_vec();
    // Zero image: only the bias remains.
    assert!(third.iter().all(|&v| (v - 0.1).abs() < 1e-6));
}

// ── Concurrency across requests ────────────────────────────────

#[test]
fn test_concurrent_requests_complete_independently() {
    let model = slow_fc_classifier(Duration::from_millis(100));
    let requests = model.create_requests(3);

    let start = Instant::now();
    for request in &requests {
        request
            .start_async_with([("data", canonical_image())])
            .unwrap();
    }
    for request in &requests {
        assert_eq!(request.wait(), InferStatus::Ok);
        let out = request.output_tensor("fc_out").unwrap();
        assert_eq!(argmax(&out.to_f32_vec()), 2);
    }
    // Three 100ms executions overlapped; far less than the serial 300ms
    // plus slack would allow if they were serialized.
    assert!(start.elapsed() < Duration::from_millis(290));
}

// ── Profiling ──────────────────────────────────────────────────

#[test]
fn test_profiling_info_reports_nodes() {
    let model = fc_classifier();
    let request = model.create_request();
    request.infer_with([("data", canonical_image())]).unwrap();

    let profile = request.profiling_info();
    assert!(!profile.nodes.is_empty());
    assert!(profile.nodes.iter().any(|n| n.op_type == "fully_connected"));
    assert!(profile.nodes.iter().all(|n| n.executed));
}

#[test]
fn test_profiling_disabled_by_config() {
    let backend = ReferenceBackend::new();
    let config = RuntimeConfig {
        enable_profiling: false,
        ..Default::default()
    };
    let model = CompiledModel::compile(&backend, fc_classifier_graph(), &config).unwrap();
    let request = model.create_request();
    request.infer_with([("data", canonical_image())]).unwrap();

    assert!(request.profiling_info().nodes.is_empty());
}
