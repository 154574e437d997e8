// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use super::{EvalArgs, EvalDirs, EvalReport, ImageSink};
use crate::masks::zero_pad;
use wt_config::determinism;
use wt_nn::{wt, PairVae};
use wt_tensor::{PureResult, Tensor, TensorError};

/// Evaluates a [`PairVae`] on aligned `(x0, x1)` batches.
///
/// The decoder output `y` is compared against the top-left `y.H x y.W` patch
/// of `wt(x1)`. Writes `recon_y_padded{E}`, `recon_y{E}`, `sample_y{E}` and
/// `target{E}`, then checkpoints the model as `wtvae_epoch{E}`.
pub fn eval_wtvae_pair<M, L>(
    epoch: usize,
    model: &mut M,
    loader: L,
    args: &EvalArgs,
    dirs: &EvalDirs,
) -> PureResult<EvalReport>
where
    M: PairVae + ?Sized,
    L: IntoIterator<Item = (Tensor, Tensor)>,
{
    args.validate()?;
    let _span = tracing::info_span!("eval_wtvae_pair", epoch).entered();
    model.eval();
    let model = &*model;
    let mut rng = determinism::sampling_rng(args.seed, "wt-vision/eval_wtvae_pair");
    let mut images = ImageSink::new(dirs, epoch);
    let mut batches = 0;

    for (x0, x1) in loader {
        let z_sample = Tensor::randn(x1.batch(), args.z_dim, &mut rng)?;
        let posterior = model.encode(&x0)?;
        let y = model.decode(&posterior.z)?;
        let y_sample = model.decode(&z_sample)?;

        let (_, _, y_h, y_w) = y.nchw()?;
        let target_dim = 1usize
            .checked_shl(args.num_wt as u32)
            .and_then(|scale| scale.checked_mul(y_h))
            .ok_or(TensorError::InvalidValue { label: "num_wt" })?;
        let y_padded = zero_pad(&y, target_dim)?;

        let x_wt = wt(&x1, model.filters(), args.num_wt)?.crop_spatial(y_h, y_w)?;

        images.save("recon_y_padded", &y_padded)?;
        images.save("recon_y", &y)?;
        images.save("sample_y", &y_sample)?;
        images.save("target", &x_wt)?;
        batches += 1;
    }

    tracing::debug!(batches, "finished pair evaluation");
    images.finish(model, "wtvae", args.checkpoint_format, batches)
}
