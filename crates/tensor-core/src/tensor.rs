// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type: typed, shaped, strided buffers with owned or
//! caller-aliased storage.
//!
//! A [`Tensor`] either *owns* its bytes (constructed by deep copy — the
//! source buffer may be mutated or dropped immediately) or *aliases* a
//! [`SharedBuffer`] kept alive by the caller (constructed without any
//! copy — mutations through either handle are visible to both). The two
//! modes are never mixed silently: ownership is fixed at construction.

use crate::{DType, Shape, TensorError};
use std::sync::{Arc, Mutex};

/// Describes a tensor's element type, shape, and memory layout.
///
/// Strides are derived row-major from the shape unless explicitly
/// overridden for a non-default layout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorDesc {
    dtype: DType,
    shape: Shape,
    /// Explicit element strides, or `None` for derived row-major layout.
    strides: Option<Vec<usize>>,
}

impl TensorDesc {
    /// Creates a descriptor with derived row-major strides.
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self {
            dtype,
            shape,
            strides: None,
        }
    }

    /// Creates a descriptor with explicit element strides.
    ///
    /// Returns an error if the stride count does not match the shape rank.
    pub fn with_strides(
        dtype: DType,
        shape: Shape,
        strides: Vec<usize>,
    ) -> Result<Self, TensorError> {
        if strides.len() != shape.rank() {
            return Err(TensorError::StridesRankMismatch {
                strides_rank: strides.len(),
                shape_rank: shape.rank(),
            });
        }
        Ok(Self {
            dtype,
            shape,
            strides: Some(strides),
        })
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the element strides (explicit, or derived row-major).
    pub fn strides(&self) -> Vec<usize> {
        self.strides
            .clone()
            .unwrap_or_else(|| self.shape.strides())
    }

    /// Returns the byte strides.
    pub fn byte_strides(&self) -> Vec<usize> {
        self.strides()
            .into_iter()
            .map(|s| s * self.dtype.size_bytes())
            .collect()
    }

    /// Returns the buffer size in bytes implied by shape and dtype.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }
}

/// A caller-owned byte buffer that tensors may alias without copying.
///
/// Cloning a `SharedBuffer` clones the *handle*, not the bytes: all clones
/// refer to the same storage. The caller must not mutate the buffer while
/// a request bound to an aliasing tensor is busy.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Wraps an existing byte buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
        }
    }

    /// Wraps a buffer of `f32` values.
    pub fn from_f32(values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self::new(bytes)
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.lock().expect("shared buffer lock poisoned").len()
    }

    /// Returns `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` with read access to the bytes.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = self.bytes.lock().expect("shared buffer lock poisoned");
        f(&guard)
    }

    /// Runs `f` with write access to the bytes.
    pub fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut guard = self.bytes.lock().expect("shared buffer lock poisoned");
        f(&mut guard)
    }

    /// Overwrites the buffer with `f32` values (lengths must match).
    pub fn write_f32(&self, values: &[f32]) {
        self.write(|bytes| {
            for (chunk, v) in bytes.chunks_exact_mut(4).zip(values) {
                chunk.copy_from_slice(&v.to_le_bytes());
            }
        });
    }
}

/// Storage backing a [`Tensor`].
#[derive(Debug, Clone)]
enum Storage {
    /// Exclusively-owned heap buffer (deep-copied at construction).
    Owned(Vec<u8>),
    /// Non-owning alias of caller storage (no copy at construction).
    Shared(SharedBuffer),
}

/// An n-dimensional tensor with owned or caller-aliased storage.
///
/// Cloning an owned tensor deep-copies its bytes; cloning an aliasing
/// tensor clones the alias (both clones see the same storage).
#[derive(Debug, Clone)]
pub struct Tensor {
    desc: TensorDesc,
    storage: Storage,
}

impl Tensor {
    /// Creates an owned tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.byte_len(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            desc: TensorDesc::new(dtype, shape),
            storage: Storage::Owned(vec![0u8; size]),
        }
    }

    /// Creates an owned tensor by deep-copying `data`.
    ///
    /// The source buffer may be mutated or dropped immediately afterwards.
    /// Returns an error if `data.len()` does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: &[u8]) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            desc: TensorDesc::new(dtype, shape),
            storage: Storage::Owned(data.to_vec()),
        })
    }

    /// Creates an owned `F32` tensor from a slice of values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f32_vec(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        if values.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements() * 4,
                actual: values.len() * 4,
            });
        }
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Ok(Self {
            desc: TensorDesc::new(DType::F32, shape),
            storage: Storage::Owned(bytes),
        })
    }

    /// Creates an owned `I32` tensor from a slice of values.
    pub fn from_i32(shape: Shape, values: &[i32]) -> Result<Self, TensorError> {
        if values.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements() * 4,
                actual: values.len() * 4,
            });
        }
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Ok(Self {
            desc: TensorDesc::new(DType::I32, shape),
            storage: Storage::Owned(bytes),
        })
    }

    /// Creates an owned tensor with every element set to a constant.
    pub fn full_f32(shape: Shape, value: f32) -> Self {
        let n = shape.num_elements();
        Self::from_f32(shape, &vec![value; n]).expect("element count matches by construction")
    }

    /// Creates a tensor aliasing a caller-owned [`SharedBuffer`].
    ///
    /// No copy is made; the caller keeps its handle and must keep the
    /// buffer alive and unmutated while a request bound to this tensor is
    /// busy. Returns an error if the buffer length does not match the
    /// descriptor.
    pub fn from_shared(desc: TensorDesc, buffer: SharedBuffer) -> Result<Self, TensorError> {
        let expected = desc.size_bytes();
        let actual = buffer.len();
        if actual != expected {
            return Err(TensorError::BufferSizeMismatch { expected, actual });
        }
        Ok(Self {
            desc,
            storage: Storage::Shared(buffer),
        })
    }

    /// Returns the descriptor.
    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        self.desc.shape()
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.desc.dtype()
    }

    /// Returns the buffer size in bytes.
    pub fn byte_len(&self) -> usize {
        match &self.storage {
            Storage::Owned(data) => data.len(),
            Storage::Shared(buf) => buf.len(),
        }
    }

    /// Returns `true` if this tensor aliases caller-owned storage.
    pub fn is_shared(&self) -> bool {
        matches!(self.storage, Storage::Shared(_))
    }

    /// Resizes this tensor to a new shape, reallocating owned storage.
    ///
    /// Any explicit strides are invalidated; the derived row-major layout
    /// is recomputed from the new shape. Fails with
    /// [`TensorError::ReshapeShared`] on an aliasing tensor — the caller
    /// owns that memory's shape contract.
    pub fn reshape(&mut self, shape: Shape) -> Result<(), TensorError> {
        match &mut self.storage {
            Storage::Owned(data) => {
                let new_len = shape.size_bytes(self.desc.dtype);
                data.resize(new_len, 0);
                self.desc = TensorDesc::new(self.desc.dtype, shape);
                Ok(())
            }
            Storage::Shared(_) => Err(TensorError::ReshapeShared),
        }
    }

    /// Runs `f` with read access to the raw bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.storage {
            Storage::Owned(data) => f(data),
            Storage::Shared(buf) => buf.read(f),
        }
    }

    /// Runs `f` with write access to the raw bytes.
    ///
    /// For an aliasing tensor this writes through to the caller's buffer.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        match &mut self.storage {
            Storage::Owned(data) => f(data),
            Storage::Shared(buf) => buf.write(f),
        }
    }

    /// Overwrites the buffer contents.
    ///
    /// Returns an error if `data.len()` does not match the buffer length.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), TensorError> {
        let expected = self.byte_len();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        self.with_bytes_mut(|bytes| bytes.copy_from_slice(data));
        Ok(())
    }

    /// Fills an `F32` tensor with a constant value.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn fill_f32(&mut self, value: f32) {
        assert_eq!(
            self.dtype(),
            DType::F32,
            "fill_f32 called on {} tensor",
            self.dtype()
        );
        self.with_bytes_mut(|bytes| {
            for chunk in bytes.chunks_exact_mut(4) {
                chunk.copy_from_slice(&value.to_le_bytes());
            }
        });
    }

    /// Copies the buffer out as `f32` values.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        assert_eq!(
            self.dtype(),
            DType::F32,
            "to_f32_vec called on {} tensor",
            self.dtype()
        );
        self.with_bytes(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    /// Copies the buffer out as `i32` values.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::I32`.
    pub fn to_i32_vec(&self) -> Vec<i32> {
        assert_eq!(
            self.dtype(),
            DType::I32,
            "to_i32_vec called on {} tensor",
            self.dtype()
        );
        self.with_bytes(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    /// Returns an owned deep copy, resolving any aliasing.
    ///
    /// The result never shares storage with the caller.
    pub fn materialized(&self) -> Tensor {
        let bytes = self.with_bytes(|b| b.to_vec());
        Tensor {
            desc: self.desc.clone(),
            storage: Storage::Owned(bytes),
        }
    }
}
