// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Per-epoch evaluation loops for the WT-VAE model family.
//!
//! Every evaluator puts its model in inference mode, writes diagnostic image
//! grids for each batch (later batches overwrite earlier ones) and finally
//! checkpoints the evaluated model, even when the loader yielded nothing.

mod args;
mod iwt;
mod mask;
mod pair;

pub use self::args::{EvalArgs, EvalDirs, EvalReport};
pub use self::iwt::eval_iwtvae;
pub use self::mask::{eval_ae_mask, eval_ae_mask_channels};
pub use self::pair::eval_wtvae_pair;

use crate::grid::save_image;
use std::path::PathBuf;
use wt_nn::{save_checkpoint, CheckpointFormat, Module};
use wt_tensor::{PureResult, Tensor};

/// Writes image grids for one epoch and remembers each distinct path.
struct ImageSink<'a> {
    dirs: &'a EvalDirs,
    epoch: usize,
    written: Vec<PathBuf>,
}

impl<'a> ImageSink<'a> {
    fn new(dirs: &'a EvalDirs, epoch: usize) -> Self {
        Self {
            dirs,
            epoch,
            written: Vec::new(),
        }
    }

    fn save(&mut self, stem: &str, batch: &Tensor) -> PureResult<()> {
        let path = self.dirs.image_path(stem, self.epoch);
        save_image(batch, &path)?;
        let (min, max) = batch.min_max();
        tracing::debug!(path = %path.display(), min, max, "wrote image grid");
        if !self.written.contains(&path) {
            self.written.push(path);
        }
        Ok(())
    }

    fn finish<M: Module + ?Sized>(
        self,
        model: &M,
        stem: &str,
        format: CheckpointFormat,
        batches: usize,
    ) -> PureResult<EvalReport> {
        let checkpoint = self.dirs.checkpoint_path(stem, self.epoch, format);
        save_checkpoint(model, &checkpoint, format)?;
        tracing::info!(
            epoch = self.epoch,
            batches,
            checkpoint = %checkpoint.display(),
            "saved evaluation checkpoint"
        );
        Ok(EvalReport {
            epoch: self.epoch,
            batches,
            images: self.written,
            checkpoint,
        })
    }
}
