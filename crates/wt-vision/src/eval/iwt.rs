// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use super::{EvalArgs, EvalDirs, EvalReport, ImageSink};
use crate::masks::zero_patches;
use crate::writer::ScalarWriter;
use wt_config::determinism;
use wt_nn::{IwtVae, Module};
use wt_tensor::{PureResult, Tensor, TensorError};

/// Running mean over the batches whose shapes allowed the metric.
struct BatchMean {
    tag: &'static str,
    sum: f32,
    count: usize,
}

impl BatchMean {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            sum: 0.0,
            count: 0,
        }
    }

    /// Adds `mse(left, right)`. Shape mismatches skip the batch with a warning.
    fn record(&mut self, left: &Tensor, right: &Tensor) -> PureResult<()> {
        match left.mean_squared_error(right) {
            Ok(value) => {
                self.sum += value;
                self.count += 1;
                Ok(())
            }
            Err(err @ TensorError::ShapeMismatch { .. }) => {
                tracing::warn!(tag = self.tag, %err, "skipping metric for mismatched batch");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum / self.count as f32)
    }
}

/// Evaluates an [`IwtVae`] that rebuilds full wavelet coefficients from their
/// masked approximation.
///
/// `wt_model` produces the coefficients `Y` and `iwt_fn` maps decoded
/// coefficients back to image space. Only `iwt_model` is switched to eval
/// mode and checkpointed (as `iwtvae_epoch{E}`).
///
/// Per batch the following grids are written: `sample_y_before_zero{E}`,
/// `sample_encoder_input{E}`, `sample_recon{E}`, `sample_recon_wt{E}`,
/// `sample_z{E}`, `sample_y{E}` and `sample{E}`. The batch-averaged
/// `eval/recon_mse` and `eval/recon_wt_mse` go to `writer` at step `epoch`
/// once the checkpoint is on disk.
#[allow(clippy::too_many_arguments)]
pub fn eval_iwtvae<T, V, I, L, W>(
    epoch: usize,
    wt_model: &T,
    iwt_model: &mut V,
    iwt_fn: I,
    loader: L,
    args: &EvalArgs,
    dirs: &EvalDirs,
    mut writer: W,
) -> PureResult<EvalReport>
where
    T: Module + ?Sized,
    V: IwtVae + ?Sized,
    I: Fn(&Tensor) -> PureResult<Tensor>,
    L: IntoIterator<Item = Tensor>,
    W: ScalarWriter,
{
    args.validate()?;
    let _span = tracing::info_span!("eval_iwtvae", epoch, zero = args.zero).entered();
    iwt_model.eval();
    let iwt_model = &*iwt_model;
    let mut rng = determinism::sampling_rng(args.seed, "wt-vision/eval_iwtvae");
    let mut images = ImageSink::new(dirs, epoch);
    let mut batches = 0usize;
    let mut recon_mse = BatchMean::new("eval/recon_mse");
    let mut recon_wt_mse = BatchMean::new("eval/recon_wt_mse");

    for x in loader {
        let y_full = wt_model.forward(&x)?;
        images.save("sample_y_before_zero", &y_full)?;
        let y = if args.zero {
            zero_patches(&y_full, args.num_iwt)?
        } else {
            y_full.clone()
        };

        let z_sample = Tensor::randn(x.batch(), args.z_dim, &mut rng)?;

        let encoder_input = y_full.sub(&y)?;
        let posterior = iwt_model.encode(&encoder_input)?;
        let x_wt_hat = iwt_model.decode(&y, &posterior.mu, &posterior.skip)?;
        let x_wt_sample = iwt_model.decode(&y, &z_sample, &posterior.skip)?;

        let x_hat = iwt_fn(&x_wt_hat)?;
        let x_sample = iwt_fn(&x_wt_sample)?;

        images.save("sample_encoder_input", &encoder_input)?;
        images.save("sample_recon", &x_hat)?;
        images.save("sample_recon_wt", &x_wt_hat)?;
        images.save("sample_z", &x_sample)?;
        images.save("sample_y", &y)?;
        images.save("sample", &x)?;
        batches += 1;

        recon_mse.record(&x_hat, &x)?;
        recon_wt_mse.record(&x_wt_hat, &y_full)?;
    }

    let report = images.finish(iwt_model, "iwtvae", args.checkpoint_format, batches)?;

    let mut wrote = false;
    for metric in [&recon_mse, &recon_wt_mse] {
        if let Some(value) = metric.mean() {
            writer.add_scalar(metric.tag, value, epoch)?;
            wrote = true;
        }
    }
    if wrote {
        writer.flush()?;
    }
    Ok(report)
}
