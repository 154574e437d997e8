// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Image grid rendering and PNG IO for diagnostic artifacts.

use image::{ImageBuffer, Rgb, RgbImage};
use std::fs;
use std::path::Path;
use wt_tensor::{PureResult, Tensor, TensorError};

/// Layout options for [`make_grid`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridOptions {
    /// Images per grid row.
    pub nrow: usize,
    /// Pixels between tiles and around the border.
    pub padding: usize,
    pub pad_value: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            nrow: 8,
            padding: 2,
            pad_value: 0.0,
        }
    }
}

fn image_error(err: impl ToString) -> TensorError {
    TensorError::ImageError {
        message: err.to_string(),
    }
}

/// Tiles an `(N, C, H, W)` batch into a single `(3, H', W')` image.
///
/// Single-channel batches are replicated to RGB. A batch holding one image is
/// returned without padding.
pub fn make_grid(batch: &Tensor, options: GridOptions) -> PureResult<Tensor> {
    let (n, c, h, w) = batch.nchw()?;
    if c != 1 && c != 3 {
        return Err(TensorError::UnsupportedLayout {
            label: "grid images need 1 or 3 channels",
            dims: batch.dims().to_vec(),
        });
    }
    if options.nrow == 0 {
        return Err(TensorError::InvalidValue { label: "grid_nrow" });
    }
    let plane = h * w;
    let channel = |sample: usize, ch: usize| {
        let ch = if c == 1 { 0 } else { ch };
        &batch.data()[(sample * c + ch) * plane..][..plane]
    };

    if n == 1 {
        let mut data = Vec::with_capacity(3 * plane);
        for ch in 0..3 {
            data.extend_from_slice(channel(0, ch));
        }
        return Tensor::from_vec(vec![3, h, w], data);
    }

    let pad = options.padding;
    let xmaps = options.nrow.min(n);
    let ymaps = n.div_ceil(xmaps);
    let (cell_h, cell_w) = (h + pad, w + pad);
    let (grid_h, grid_w) = (ymaps * cell_h + pad, xmaps * cell_w + pad);
    let mut data = vec![options.pad_value; 3 * grid_h * grid_w];
    for sample in 0..n {
        let (gy, gx) = (sample / xmaps, sample % xmaps);
        let (top, left) = (gy * cell_h + pad, gx * cell_w + pad);
        for ch in 0..3 {
            let src = channel(sample, ch);
            let base = ch * grid_h * grid_w;
            for y in 0..h {
                let dst = base + (top + y) * grid_w + left;
                data[dst..dst + w].copy_from_slice(&src[y * w..(y + 1) * w]);
            }
        }
    }
    Tensor::from_vec(vec![3, grid_h, grid_w], data)
}

fn to_byte(value: f32) -> u8 {
    (value * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

/// Converts a `(3, H, W)` tensor with values in `[0, 1]` to an RGB image.
pub fn to_rgb_image(grid: &Tensor) -> PureResult<RgbImage> {
    let (c, h, w) = match grid.dims() {
        &[c, h, w] => (c, h, w),
        other => {
            return Err(TensorError::UnsupportedLayout {
                label: "expected a CHW image",
                dims: other.to_vec(),
            })
        }
    };
    if c != 3 {
        return Err(TensorError::UnsupportedLayout {
            label: "expected an RGB image",
            dims: grid.dims().to_vec(),
        });
    }
    let width = u32::try_from(w).map_err(image_error)?;
    let height = u32::try_from(h).map_err(image_error)?;
    let plane = h * w;
    let data = grid.data();
    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        let offset = y as usize * w + x as usize;
        Rgb([
            to_byte(data[offset]),
            to_byte(data[plane + offset]),
            to_byte(data[2 * plane + offset]),
        ])
    }))
}

/// Writes `batch` as a PNG grid with the default [`GridOptions`].
pub fn save_image<P: AsRef<Path>>(batch: &Tensor, path: P) -> PureResult<()> {
    save_image_with(batch, path, GridOptions::default())
}

pub fn save_image_with<P: AsRef<Path>>(
    batch: &Tensor,
    path: P,
    options: GridOptions,
) -> PureResult<()> {
    let path = path.as_ref();
    let image = to_rgb_image(&make_grid(batch, options)?)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(image_error)
}

/// Reads same-sized images into an `(N, 3, H, W)` batch scaled to `[0, 1]`.
pub fn load_image_batch<P: AsRef<Path>>(paths: &[P]) -> PureResult<Tensor> {
    if paths.is_empty() {
        return Err(TensorError::EmptyInput("image_paths"));
    }
    let mut dims: Option<(u32, u32)> = None;
    let mut data = Vec::new();
    for path in paths {
        let image = image::open(path.as_ref()).map_err(image_error)?.to_rgb8();
        let current = image.dimensions();
        match dims {
            None => dims = Some(current),
            Some(expected) if expected != current => {
                return Err(TensorError::ShapeMismatch {
                    left: vec![expected.1 as usize, expected.0 as usize],
                    right: vec![current.1 as usize, current.0 as usize],
                });
            }
            Some(_) => {}
        }
        let (w, h) = (current.0 as usize, current.1 as usize);
        let mut planes = vec![0.0f32; 3 * h * w];
        for (x, y, pixel) in image.enumerate_pixels() {
            let offset = y as usize * w + x as usize;
            for ch in 0..3 {
                planes[ch * h * w + offset] = pixel[ch] as f32 / 255.0;
            }
        }
        data.extend(planes);
    }
    let (w, h) = dims.map(|(w, h)| (w as usize, h as usize)).unwrap_or((0, 0));
    Tensor::from_vec(vec![paths.len(), 3, h, w], data)
}
