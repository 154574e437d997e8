// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Spatial helpers over the trailing `(height, width)` axes of NCHW tensors.

use crate::{PureResult, Tensor, TensorError};

impl Tensor {
    /// Keeps the top-left `height x width` window of every plane.
    pub fn crop_spatial(&self, height: usize, width: usize) -> PureResult<Tensor> {
        let (n, c, h, w) = self.nchw()?;
        if height == 0 || width == 0 || height > h || width > w {
            return Err(TensorError::ShapeMismatch {
                left: self.dims().to_vec(),
                right: vec![n, c, height, width],
            });
        }
        let mut data = Vec::with_capacity(n * c * height * width);
        for plane in self.data().chunks_exact(h * w) {
            for row in plane.chunks_exact(w).take(height) {
                data.extend_from_slice(&row[..width]);
            }
        }
        Tensor::from_vec(vec![n, c, height, width], data)
    }

    /// Places every plane at the top-left of a zero canvas of `height x width`.
    pub fn pad_spatial(&self, height: usize, width: usize) -> PureResult<Tensor> {
        let (n, c, h, w) = self.nchw()?;
        if height < h || width < w {
            return Err(TensorError::ShapeMismatch {
                left: self.dims().to_vec(),
                right: vec![n, c, height, width],
            });
        }
        let mut out = Tensor::zeros(vec![n, c, height, width])?;
        let target = out.data_mut();
        for (index, plane) in self.data().chunks_exact(h * w).enumerate() {
            let base = index * height * width;
            for (y, row) in plane.chunks_exact(w).enumerate() {
                let start = base + y * width;
                target[start..start + w].copy_from_slice(row);
            }
        }
        Ok(out)
    }
}
