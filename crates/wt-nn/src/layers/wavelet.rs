// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Multi-level 2D discrete wavelet transform over NCHW batches.
//!
//! One level maps every `2x2` block of the active region to four coefficients
//! and lays the sub-bands out as quadrants:
//!
//! ```text
//! +----+----+
//! | LL | LH |
//! +----+----+
//! | HL | HH |
//! +----+----+
//! ```
//!
//! The next level recurses into the LL quadrant, so the output keeps the
//! input's shape and the coarsest approximation ends up in the top-left
//! `h / 2^levels x w / 2^levels` patch.

use crate::module::{Module, Parameter};
use wt_tensor::{PureResult, Tensor, TensorError};

const ORTHONORMAL_TOLERANCE: f32 = 1e-4;

/// Orthonormal `2x2` analysis bank ordered `[LL, LH, HL, HH]`.
///
/// Each filter is stored row-major as `[f00, f01, f10, f11]`.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveletFilters {
    bank: [[f32; 4]; 4],
}

impl WaveletFilters {
    /// The Haar bank.
    pub fn haar() -> Self {
        let s = std::f32::consts::FRAC_1_SQRT_2;
        Self::separable([s, s], [-s, s])
    }

    /// Builds a separable bank from two-tap low/high pass filters and rejects
    /// banks that cannot be inverted by their transpose.
    pub fn from_taps(low: [f32; 2], high: [f32; 2]) -> PureResult<Self> {
        if low.iter().chain(high.iter()).any(|v| !v.is_finite()) {
            return Err(TensorError::InvalidValue {
                label: "wavelet_taps",
            });
        }
        let filters = Self::separable(low, high);
        if !filters.is_orthonormal() {
            return Err(TensorError::InvalidValue {
                label: "wavelet_bank_not_orthonormal",
            });
        }
        Ok(filters)
    }

    fn separable(low: [f32; 2], high: [f32; 2]) -> Self {
        let outer = |rows: [f32; 2], cols: [f32; 2]| {
            [
                rows[0] * cols[0],
                rows[0] * cols[1],
                rows[1] * cols[0],
                rows[1] * cols[1],
            ]
        };
        Self {
            bank: [
                outer(low, low),
                outer(high, low),
                outer(low, high),
                outer(high, high),
            ],
        }
    }

    fn is_orthonormal(&self) -> bool {
        for i in 0..4 {
            for j in 0..4 {
                let dot: f32 = (0..4).map(|k| self.bank[i][k] * self.bank[j][k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                if (dot - expected).abs() > ORTHONORMAL_TOLERANCE {
                    return false;
                }
            }
        }
        true
    }

    fn analyse(&self, block: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (coeff, filter) in out.iter_mut().zip(self.bank.iter()) {
            *coeff = filter.iter().zip(block.iter()).map(|(f, p)| f * p).sum();
        }
        out
    }

    fn synthesise(&self, coeffs: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (coeff, filter) in coeffs.iter().zip(self.bank.iter()) {
            for (pixel, tap) in out.iter_mut().zip(filter.iter()) {
                *pixel += coeff * tap;
            }
        }
        out
    }
}

impl Default for WaveletFilters {
    fn default() -> Self {
        Self::haar()
    }
}

fn validate_levels(tensor: &Tensor, levels: usize) -> PureResult<(usize, usize)> {
    let (_, _, h, w) = tensor.nchw()?;
    if levels == 0 || levels >= usize::BITS as usize {
        return Err(TensorError::InvalidValue {
            label: "wavelet_levels",
        });
    }
    let factor = 1usize << levels;
    if h % factor != 0 || w % factor != 0 {
        return Err(TensorError::UnsupportedLayout {
            label: "spatial dims must be divisible by 2^levels",
            dims: tensor.dims().to_vec(),
        });
    }
    Ok((h, w))
}

/// Visits the active `rh x rw` region of every plane with a scratch copy of it.
fn for_each_region(
    tensor: &mut Tensor,
    (h, w): (usize, usize),
    (rh, rw): (usize, usize),
    mut op: impl FnMut(&[f32], &mut [f32]),
) {
    let mut scratch = vec![0.0f32; rh * rw];
    let mut result = vec![0.0f32; rh * rw];
    for plane in tensor.data_mut().chunks_exact_mut(h * w) {
        for y in 0..rh {
            scratch[y * rw..(y + 1) * rw].copy_from_slice(&plane[y * w..y * w + rw]);
        }
        op(&scratch, &mut result);
        for y in 0..rh {
            plane[y * w..y * w + rw].copy_from_slice(&result[y * rw..(y + 1) * rw]);
        }
    }
}

fn analyse_level(
    region: &[f32],
    out: &mut [f32],
    (rh, rw): (usize, usize),
    filters: &WaveletFilters,
) {
    let (qh, qw) = (rh / 2, rw / 2);
    for by in 0..qh {
        for bx in 0..qw {
            let top = 2 * by * rw + 2 * bx;
            let bottom = top + rw;
            let block = [region[top], region[top + 1], region[bottom], region[bottom + 1]];
            let [ll, lh, hl, hh] = filters.analyse(block);
            out[by * rw + bx] = ll;
            out[by * rw + qw + bx] = lh;
            out[(qh + by) * rw + bx] = hl;
            out[(qh + by) * rw + qw + bx] = hh;
        }
    }
}

fn synthesise_level(
    region: &[f32],
    out: &mut [f32],
    (rh, rw): (usize, usize),
    filters: &WaveletFilters,
) {
    let (qh, qw) = (rh / 2, rw / 2);
    for by in 0..qh {
        for bx in 0..qw {
            let coeffs = [
                region[by * rw + bx],
                region[by * rw + qw + bx],
                region[(qh + by) * rw + bx],
                region[(qh + by) * rw + qw + bx],
            ];
            let [p00, p01, p10, p11] = filters.synthesise(coeffs);
            let top = 2 * by * rw + 2 * bx;
            let bottom = top + rw;
            out[top] = p00;
            out[top + 1] = p01;
            out[bottom] = p10;
            out[bottom + 1] = p11;
        }
    }
}

/// Applies `levels` levels of the forward transform.
pub fn wt(input: &Tensor, filters: &WaveletFilters, levels: usize) -> PureResult<Tensor> {
    let (h, w) = validate_levels(input, levels)?;
    let mut out = input.clone();
    for level in 0..levels {
        let region = (h >> level, w >> level);
        for_each_region(&mut out, (h, w), region, |src, dst| {
            analyse_level(src, dst, region, filters)
        });
    }
    Ok(out)
}

/// Inverts [`wt`], starting from the coarsest level.
pub fn iwt(input: &Tensor, filters: &WaveletFilters, levels: usize) -> PureResult<Tensor> {
    let (h, w) = validate_levels(input, levels)?;
    let mut out = input.clone();
    for level in (0..levels).rev() {
        let region = (h >> level, w >> level);
        for_each_region(&mut out, (h, w), region, |src, dst| {
            synthesise_level(src, dst, region, filters)
        });
    }
    Ok(out)
}

/// Parameter-free module applying [`wt`].
#[derive(Clone, Debug)]
pub struct WaveletTransform {
    filters: WaveletFilters,
    levels: usize,
}

impl WaveletTransform {
    pub fn new(filters: WaveletFilters, levels: usize) -> PureResult<Self> {
        if levels == 0 {
            return Err(TensorError::InvalidValue {
                label: "wavelet_levels",
            });
        }
        Ok(Self { filters, levels })
    }

    pub fn haar(levels: usize) -> PureResult<Self> {
        Self::new(WaveletFilters::haar(), levels)
    }

    pub fn filters(&self) -> &WaveletFilters {
        &self.filters
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// The matching inverse transform.
    pub fn inverse(&self) -> InverseWaveletTransform {
        InverseWaveletTransform {
            filters: self.filters.clone(),
            levels: self.levels,
        }
    }
}

impl Module for WaveletTransform {
    fn forward(&self, input: &Tensor) -> PureResult<Tensor> {
        wt(input, &self.filters, self.levels)
    }

    fn visit_parameters(
        &self,
        _visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        Ok(())
    }

    fn visit_parameters_mut(
        &mut self,
        _visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        Ok(())
    }
}

/// Parameter-free module applying [`iwt`].
#[derive(Clone, Debug)]
pub struct InverseWaveletTransform {
    filters: WaveletFilters,
    levels: usize,
}

impl InverseWaveletTransform {
    pub fn new(filters: WaveletFilters, levels: usize) -> PureResult<Self> {
        WaveletTransform::new(filters, levels).map(|forward| forward.inverse())
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Function form, convenient where a plain `Fn(&Tensor)` is expected.
    pub fn apply(&self, input: &Tensor) -> PureResult<Tensor> {
        iwt(input, &self.filters, self.levels)
    }
}

impl Module for InverseWaveletTransform {
    fn forward(&self, input: &Tensor) -> PureResult<Tensor> {
        self.apply(input)
    }

    fn visit_parameters(
        &self,
        _visitor: &mut dyn FnMut(&Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        Ok(())
    }

    fn visit_parameters_mut(
        &mut self,
        _visitor: &mut dyn FnMut(&mut Parameter) -> PureResult<()>,
    ) -> PureResult<()> {
        Ok(())
    }
}
