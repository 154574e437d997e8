// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Wavelet-domain masking, image grids and the WT-VAE evaluation loops.

pub mod eval;
pub mod grid;
pub mod loader;
pub mod masks;
pub mod writer;

pub use eval::{
    eval_ae_mask, eval_ae_mask_channels, eval_iwtvae, eval_wtvae_pair, EvalArgs, EvalDirs,
    EvalReport,
};
pub use grid::{load_image_batch, make_grid, save_image, save_image_with, GridOptions};
pub use loader::{PairedSampleLoader, SampleLoader};
pub use masks::{
    hf_collate_to_channels, hf_collate_to_channels_wt2, hf_collate_to_img, zero_mask, zero_pad,
    zero_patches,
};
pub use writer::{JsonlWriter, NullWriter, ScalarRecord, ScalarWriter, TracingWriter};
