// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partially-dynamic shape descriptors.
//!
//! A model port may declare dimensions that are not fixed until a tensor
//! is bound: a [`Dimension`] is either `Fixed(n)` or a bounded-or-unbounded
//! `Bounded { min, max }` range, and a [`PartialShape`] is an ordered
//! sequence of such dimensions. A concrete [`Shape`] is admitted by a
//! `PartialShape` when the ranks match and every dimension falls inside
//! its declared range.

use crate::Shape;
use std::fmt;

/// A single dimension of a [`PartialShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Dimension {
    /// A fully-determined dimension size.
    Fixed(usize),
    /// A dynamic dimension constrained to `min..=max`.
    ///
    /// `max == None` means unbounded above.
    Bounded { min: usize, max: Option<usize> },
}

impl Dimension {
    /// An unconstrained dynamic dimension (`0..`).
    pub fn any() -> Self {
        Self::Bounded { min: 0, max: None }
    }

    /// A dynamic dimension constrained to an inclusive range.
    pub fn range(min: usize, max: usize) -> Self {
        Self::Bounded {
            min,
            max: Some(max),
        }
    }

    /// Returns `true` if this dimension is not fixed.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Returns `true` if `n` is an admissible size for this dimension.
    pub fn contains(&self, n: usize) -> bool {
        match self {
            Self::Fixed(d) => *d == n,
            Self::Bounded { min, max } => n >= *min && max.map_or(true, |m| n <= m),
        }
    }

    /// Returns the fixed size, or `None` for a dynamic dimension.
    pub fn as_fixed(&self) -> Option<usize> {
        match self {
            Self::Fixed(d) => Some(*d),
            Self::Bounded { .. } => None,
        }
    }

    /// Parses a manifest dimension spec: `"4"`, `"0..5"`, `"3.."` or `".."`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some((lo, hi)) = spec.split_once("..") {
            let min = if lo.is_empty() { 0 } else { lo.parse().ok()? };
            let max = if hi.is_empty() {
                None
            } else {
                Some(hi.parse().ok()?)
            };
            if let Some(m) = max {
                if m < min {
                    return None;
                }
            }
            Some(Self::Bounded { min, max })
        } else {
            spec.parse().ok().map(Self::Fixed)
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => write!(f, "{d}"),
            Self::Bounded { min: 0, max: None } => write!(f, ".."),
            Self::Bounded { min, max: None } => write!(f, "{min}.."),
            Self::Bounded {
                min,
                max: Some(max),
            } => write!(f, "{min}..{max}"),
        }
    }
}

impl From<usize> for Dimension {
    fn from(d: usize) -> Self {
        Self::Fixed(d)
    }
}

/// An ordered sequence of [`Dimension`]s describing the admissible shapes
/// of a model port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PartialShape {
    dims: Vec<Dimension>,
}

impl PartialShape {
    /// Creates a partial shape from the given dimensions.
    pub fn new(dims: Vec<Dimension>) -> Self {
        Self { dims }
    }

    /// Creates a fully-static partial shape.
    pub fn fixed(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().map(|&d| Dimension::Fixed(d)).collect(),
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Returns `true` if every dimension is fixed.
    pub fn is_static(&self) -> bool {
        self.dims.iter().all(|d| !d.is_dynamic())
    }

    /// Converts to a concrete [`Shape`] if fully static.
    pub fn to_shape(&self) -> Option<Shape> {
        self.dims
            .iter()
            .map(|d| d.as_fixed())
            .collect::<Option<Vec<_>>>()
            .map(Shape::new)
    }

    /// Returns `true` if the concrete `shape` is admitted: ranks are equal
    /// and every dimension lies inside its declared range.
    pub fn compatible_with(&self, shape: &Shape) -> bool {
        self.rank() == shape.rank()
            && self
                .dims
                .iter()
                .zip(shape.dims())
                .all(|(dim, &n)| dim.contains(n))
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Shape> for PartialShape {
    fn from(shape: Shape) -> Self {
        Self::fixed(shape.dims())
    }
}
