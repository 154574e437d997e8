// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use super::{EvalArgs, EvalDirs, EvalReport, ImageSink};
use crate::masks::{
    hf_collate_to_channels, hf_collate_to_channels_wt2, hf_collate_to_img, zero_mask,
};
use wt_nn::Module;
use wt_tensor::{PureResult, Tensor, TensorError};

/// Evaluates a masked autoencoder on the coarsest detail bands of `wt_model(x)`.
///
/// Writes `sample_recon{E}` (the reconstruction) and `sample{E}` (the masked
/// input), then checkpoints `model` as `aemask_epoch{E}`.
pub fn eval_ae_mask<T, M, L>(
    epoch: usize,
    wt_model: &T,
    model: &mut M,
    loader: L,
    args: &EvalArgs,
    dirs: &EvalDirs,
) -> PureResult<EvalReport>
where
    T: Module + ?Sized,
    M: Module + ?Sized,
    L: IntoIterator<Item = Tensor>,
{
    args.validate()?;
    let _span = tracing::info_span!("eval_ae_mask", epoch).entered();
    model.eval();
    let model = &*model;
    let mut images = ImageSink::new(dirs, epoch);
    let mut batches = 0;

    for x in loader {
        let y = zero_mask(&wt_model.forward(&x)?, args.num_wt, 1)?;
        let x_hat = model.forward(&y)?;
        images.save("sample_recon", &x_hat)?;
        images.save("sample", &y)?;
        batches += 1;
    }

    images.finish(model, "aemask", args.checkpoint_format, batches)
}

/// Channel-stacked variant of [`eval_ae_mask`].
///
/// The masked detail bands are collated into channels before the forward pass
/// and both the model output and the input are scattered back into image
/// layout for saving. Only one- and two-level decompositions are supported.
pub fn eval_ae_mask_channels<T, M, L>(
    epoch: usize,
    wt_model: &T,
    model: &mut M,
    loader: L,
    args: &EvalArgs,
    dirs: &EvalDirs,
) -> PureResult<EvalReport>
where
    T: Module + ?Sized,
    M: Module + ?Sized,
    L: IntoIterator<Item = Tensor>,
{
    args.validate()?;
    let collate: fn(&Tensor) -> PureResult<Tensor> = match args.num_wt {
        1 => hf_collate_to_channels,
        2 => hf_collate_to_channels_wt2,
        _ => return Err(TensorError::InvalidValue { label: "num_wt" }),
    };
    let _span = tracing::info_span!("eval_ae_mask_channels", epoch).entered();
    model.eval();
    let model = &*model;
    let mut images = ImageSink::new(dirs, epoch);
    let mut batches = 0;

    for x in loader {
        let y = collate(&zero_mask(&wt_model.forward(&x)?, args.num_wt, 1)?)?;
        let x_hat = hf_collate_to_img(&model.forward(&y)?)?;
        let y = hf_collate_to_img(&y)?;
        images.save("sample_recon", &x_hat)?;
        images.save("sample", &y)?;
        batches += 1;
    }

    images.finish(model, "aemask", args.checkpoint_format, batches)
}
