// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Demonstrates a pool of requests executing asynchronously with
//! completion callbacks, against a single compiled model.
//!
//! Run with: `cargo run --example async_pipeline`

use model_graph::GraphBuilder;
use runtime::{CompiledModel, InferStatus, ReferenceBackend, RuntimeConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tensor_core::{DType, PartialShape, Shape, Tensor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let features = 64;
    let classes = 8;

    // A small classifier whose weight column 2 sums the input.
    let mut b = GraphBuilder::new("demo-classifier");
    let data = b.input("data", PartialShape::fixed(&[1, features]), DType::F32);
    let mut weights = vec![0.0f32; features * classes];
    for k in 0..features {
        weights[k * classes + 2] = 1.0;
    }
    let w = b.constant(
        "fc.weight",
        Tensor::from_f32(Shape::matrix(features, classes), &weights)?,
    );
    let fc = b.fully_connected("fc", data, w, None);
    b.result("fc_out", PartialShape::fixed(&[1, classes]), DType::F32, fc);

    let backend = ReferenceBackend::new();
    let model = CompiledModel::compile(&backend, b.build()?, &RuntimeConfig::default())?;

    let completed = Arc::new(AtomicUsize::new(0));
    let requests = model.create_requests(4);
    for request in &requests {
        let counter = Arc::clone(&completed);
        request.set_callback(move |status| {
            assert_eq!(status, InferStatus::Ok);
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    for (i, request) in requests.iter().enumerate() {
        let input = Tensor::full_f32(Shape::matrix(1, features), (i + 1) as f32);
        request.start_async_with([("data", input)])?;
    }

    for (i, request) in requests.iter().enumerate() {
        let status = request.wait();
        let out = request.output_tensor("fc_out")?;
        println!(
            "request {i}: {status}, fc_out[2] = {}",
            out.to_f32_vec()[2],
        );
    }

    println!("callbacks fired: {}", completed.load(Ordering::SeqCst));
    Ok(())
}
