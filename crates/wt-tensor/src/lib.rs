// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense `f32` tensors used by the WT-VAE evaluation toolkit.
//!
//! Image batches follow the NCHW convention: a [`Tensor`] with dims
//! `[batch, channels, height, width]` stored row-major. Latent codes are rank
//! two tensors `[batch, z_dim]`.

mod error;
mod spatial;

pub use error::{PureResult, TensorError};

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Row-major dense tensor with an arbitrary number of non-zero dimensions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    dims: Vec<usize>,
    data: Vec<f32>,
}

fn checked_volume(dims: &[usize]) -> PureResult<usize> {
    if dims.is_empty() || dims.iter().any(|&d| d == 0) {
        return Err(TensorError::InvalidDimensions {
            dims: dims.to_vec(),
        });
    }
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| TensorError::InvalidDimensions {
            dims: dims.to_vec(),
        })
}

impl Tensor {
    /// Wraps an existing buffer. The buffer length must match the volume of `dims`.
    pub fn from_vec(dims: impl Into<Vec<usize>>, data: Vec<f32>) -> PureResult<Self> {
        let dims = dims.into();
        let expected = checked_volume(&dims)?;
        if data.len() != expected {
            return Err(TensorError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(dims: impl Into<Vec<usize>>) -> PureResult<Self> {
        let dims = dims.into();
        let volume = checked_volume(&dims)?;
        Ok(Self {
            dims,
            data: vec![0.0; volume],
        })
    }

    /// Samples every element from `N(mean, std^2)` using the provided RNG.
    pub fn random_normal<R: Rng + ?Sized>(
        dims: impl Into<Vec<usize>>,
        mean: f32,
        std: f32,
        rng: &mut R,
    ) -> PureResult<Self> {
        let dims = dims.into();
        let volume = checked_volume(&dims)?;
        if std <= 0.0 || !std.is_finite() {
            return Err(TensorError::InvalidValue {
                label: "random_normal_std",
            });
        }
        let mut data = Vec::with_capacity(volume);
        for _ in 0..volume {
            let sample: f64 = StandardNormal.sample(rng);
            data.push(mean + std * sample as f32);
        }
        Ok(Self { dims, data })
    }

    /// Standard normal samples shaped `[batch, features]`.
    pub fn randn<R: Rng + ?Sized>(batch: usize, features: usize, rng: &mut R) -> PureResult<Self> {
        Self::random_normal(vec![batch, features], 0.0, 1.0, rng)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Tensors always hold at least one element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Leading dimension.
    pub fn batch(&self) -> usize {
        self.dims[0]
    }

    /// Returns `(batch, channels, height, width)` for rank four tensors.
    pub fn nchw(&self) -> PureResult<(usize, usize, usize, usize)> {
        match self.dims.as_slice() {
            &[n, c, h, w] => Ok((n, c, h, w)),
            _ => Err(TensorError::UnsupportedLayout {
                label: "expected an NCHW tensor",
                dims: self.dims.clone(),
            }),
        }
    }

    fn ensure_same_shape(&self, other: &Tensor) -> PureResult<()> {
        if self.dims != other.dims {
            return Err(TensorError::ShapeMismatch {
                left: self.dims.clone(),
                right: other.dims.clone(),
            });
        }
        Ok(())
    }

    fn zip_with(&self, other: &Tensor, op: impl Fn(f32, f32) -> f32) -> PureResult<Tensor> {
        self.ensure_same_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&l, &r)| op(l, r))
            .collect();
        Ok(Tensor {
            dims: self.dims.clone(),
            data,
        })
    }

    pub fn add(&self, other: &Tensor) -> PureResult<Tensor> {
        self.zip_with(other, |l, r| l + r)
    }

    pub fn sub(&self, other: &Tensor) -> PureResult<Tensor> {
        self.zip_with(other, |l, r| l - r)
    }

    pub fn scale(&self, factor: f32) -> Tensor {
        Tensor {
            dims: self.dims.clone(),
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Mean of the squared element-wise difference.
    pub fn mean_squared_error(&self, other: &Tensor) -> PureResult<f32> {
        self.ensure_same_shape(other)?;
        let sum: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&l, &r)| {
                let diff = (l - r) as f64;
                diff * diff
            })
            .sum();
        Ok((sum / self.data.len() as f64) as f32)
    }

    /// Smallest and largest element.
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}
