// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks: synchronous single-request loop vs. pipelined async pool.

use criterion::{criterion_group, criterion_main, Criterion};
use model_graph::GraphBuilder;
use runtime::{CompiledModel, InferStatus, ReferenceBackend, RuntimeConfig};
use tensor_core::{DType, PartialShape, Shape, Tensor};

const FEATURES: usize = 256;
const CLASSES: usize = 16;

fn classifier() -> CompiledModel {
    let mut b = GraphBuilder::new("bench-classifier");
    let data = b.input("data", PartialShape::fixed(&[1, FEATURES]), DType::F32);
    let w = b.constant(
        "fc.weight",
        Tensor::full_f32(Shape::matrix(FEATURES, CLASSES), 0.01),
    );
    let fc = b.fully_connected("fc", data, w, None);
    b.result("fc_out", PartialShape::fixed(&[1, CLASSES]), DType::F32, fc);

    let backend = ReferenceBackend::new();
    let config = RuntimeConfig {
        enable_profiling: false,
        ..Default::default()
    };
    CompiledModel::compile(&backend, b.build().unwrap(), &config).unwrap()
}

fn input() -> Tensor {
    Tensor::full_f32(Shape::matrix(1, FEATURES), 0.5)
}

fn bench_sync_loop(c: &mut Criterion) {
    let model = classifier();
    let request = model.create_request();
    request.set_tensor("data", input()).unwrap();

    c.bench_function("sync infer x8", |b| {
        b.iter(|| {
            for _ in 0..8 {
                request.infer().unwrap();
            }
        })
    });
}

fn bench_async_pool(c: &mut Criterion) {
    let model = classifier();
    let requests = model.create_requests(4);
    for request in &requests {
        request.set_tensor("data", input()).unwrap();
    }

    c.bench_function("async pool of 4 x8", |b| {
        b.iter(|| {
            for _ in 0..2 {
                for request in &requests {
                    request.start_async().unwrap();
                }
                for request in &requests {
                    assert_eq!(request.wait(), InferStatus::Ok);
                }
            }
        })
    });
}

criterion_group!(benches, bench_sync_loop, bench_async_pool);
criterion_main!(benches);
