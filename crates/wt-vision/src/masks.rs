// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Masking and channel collation over wavelet coefficient layouts.
//!
//! Coefficients follow the quadrant layout produced by
//! [`wt_nn::layers::wavelet`]: the approximation band sits in the top-left
//! corner and each level's LH, HL, HH bands surround it.

use wt_tensor::{PureResult, Tensor, TensorError};

fn pow2_divisor(extent: usize, exponent: usize, label: &'static str) -> PureResult<usize> {
    if exponent >= usize::BITS as usize {
        return Err(TensorError::InvalidValue { label });
    }
    let side = extent >> exponent;
    if side == 0 {
        return Err(TensorError::InvalidValue { label });
    }
    Ok(side)
}

/// Copies the top-left `keep_h x keep_w` window of every plane into a zero
/// tensor, then zeroes the inner `hole_h x hole_w` window.
fn keep_ring(
    input: &Tensor,
    (keep_h, keep_w): (usize, usize),
    (hole_h, hole_w): (usize, usize),
) -> PureResult<Tensor> {
    let (_, _, h, w) = input.nchw()?;
    let mut out = Tensor::zeros(input.dims().to_vec())?;
    for (src, dst) in input
        .data()
        .chunks_exact(h * w)
        .zip(out.data_mut().chunks_exact_mut(h * w))
    {
        for y in 0..keep_h {
            let start = if y < hole_h { hole_w } else { 0 };
            let row = y * w;
            dst[row + start..row + keep_w].copy_from_slice(&src[row + start..row + keep_w]);
        }
    }
    Ok(out)
}

/// Places the input at the top-left of a zero canvas of `target_dim x target_dim`.
pub fn zero_pad(input: &Tensor, target_dim: usize) -> PureResult<Tensor> {
    input.pad_spatial(target_dim, target_dim)
}

/// Keeps only the coarsest approximation patch of a `num_wt` level
/// decomposition and zeroes every detail band.
pub fn zero_patches(input: &Tensor, num_wt: usize) -> PureResult<Tensor> {
    let (_, _, h, w) = input.nchw()?;
    let patch_h = pow2_divisor(h, num_wt, "zero_patches_num_wt")?;
    let patch_w = pow2_divisor(w, num_wt, "zero_patches_num_wt")?;
    keep_ring(input, (patch_h, patch_w), (0, 0))
}

/// Keeps the detail bands of level `cur_iwt` (counted from the coarsest) of a
/// `num_iwt` level decomposition.
///
/// The kept region is the square of side `h / 2^(num_iwt - cur_iwt)` with its
/// inner square of side `h / 2^(num_iwt - cur_iwt + 1)` zeroed, so the
/// approximation the inverse transform starts from is removed.
pub fn zero_mask(input: &Tensor, num_iwt: usize, cur_iwt: usize) -> PureResult<Tensor> {
    if cur_iwt == 0 || cur_iwt > num_iwt {
        return Err(TensorError::InvalidValue {
            label: "zero_mask_cur_iwt",
        });
    }
    let (_, _, h, w) = input.nchw()?;
    let depth = num_iwt - cur_iwt;
    let outer = (
        pow2_divisor(h, depth, "zero_mask_num_iwt")?,
        pow2_divisor(w, depth, "zero_mask_num_iwt")?,
    );
    let inner = (
        pow2_divisor(h, depth + 1, "zero_mask_num_iwt")?,
        pow2_divisor(w, depth + 1, "zero_mask_num_iwt")?,
    );
    keep_ring(input, outer, inner)
}

/// Stacks the LH, HL and HH quadrants of the top-left `region_h x region_w`
/// window along the channel axis.
fn collate_region(input: &Tensor, region_h: usize, region_w: usize) -> PureResult<Tensor> {
    let (n, c, h, w) = input.nchw()?;
    if region_h % 2 != 0 || region_w % 2 != 0 || region_h < 2 || region_w < 2 {
        return Err(TensorError::UnsupportedLayout {
            label: "collated region must have even, non-zero sides",
            dims: input.dims().to_vec(),
        });
    }
    let (qh, qw) = (region_h / 2, region_w / 2);
    let offsets = [(0, qw), (qh, 0), (qh, qw)];
    let mut data = Vec::with_capacity(n * 3 * c * qh * qw);
    for sample in input.data().chunks_exact(c * h * w) {
        for &(oy, ox) in &offsets {
            for plane in sample.chunks_exact(h * w) {
                for y in 0..qh {
                    let row = (oy + y) * w + ox;
                    data.extend_from_slice(&plane[row..row + qw]);
                }
            }
        }
    }
    Tensor::from_vec(vec![n, 3 * c, qh, qw], data)
}

/// `(N, C, H, W) -> (N, 3C, H/2, W/2)`: the level-one detail bands as channels.
pub fn hf_collate_to_channels(input: &Tensor) -> PureResult<Tensor> {
    let (_, _, h, w) = input.nchw()?;
    collate_region(input, h, w)
}

/// `(N, C, H, W) -> (N, 3C, H/4, W/4)`: the detail bands of the second level
/// (the top-left `H/2 x W/2` window) as channels.
pub fn hf_collate_to_channels_wt2(input: &Tensor) -> PureResult<Tensor> {
    let (_, _, h, w) = input.nchw()?;
    if h % 4 != 0 || w % 4 != 0 {
        return Err(TensorError::UnsupportedLayout {
            label: "two-level collation needs sides divisible by 4",
            dims: input.dims().to_vec(),
        });
    }
    collate_region(input, h / 2, w / 2)
}

/// `(N, 3C, h, w) -> (N, C, 2h, 2w)`: puts the three channel groups back into
/// the LH, HL and HH quadrants around a zero approximation band.
pub fn hf_collate_to_img(input: &Tensor) -> PureResult<Tensor> {
    let (n, c3, h, w) = input.nchw()?;
    if c3 % 3 != 0 {
        return Err(TensorError::UnsupportedLayout {
            label: "channel count must be a multiple of 3",
            dims: input.dims().to_vec(),
        });
    }
    let c = c3 / 3;
    let (oh, ow) = (2 * h, 2 * w);
    let offsets = [(0, w), (h, 0), (h, w)];
    let mut out = Tensor::zeros(vec![n, c, oh, ow])?;
    let plane_in = h * w;
    let plane_out = oh * ow;
    let source = input.data();
    let target = out.data_mut();
    for b in 0..n {
        for (group, &(oy, ox)) in offsets.iter().enumerate() {
            for ch in 0..c {
                let src = &source[((b * c3) + group * c + ch) * plane_in..][..plane_in];
                let dst_base = (b * c + ch) * plane_out;
                for y in 0..h {
                    let dst = dst_base + (oy + y) * ow + ox;
                    target[dst..dst + w].copy_from_slice(&src[y * w..(y + 1) * w]);
                }
            }
        }
    }
    Ok(out)
}
