// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wt_config::LayeredConfig;
use wt_nn::CheckpointFormat;
use wt_tensor::{PureResult, TensorError};

/// Hyper-parameters shared by the evaluators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalArgs {
    /// Latent dimensionality used for prior samples.
    pub z_dim: usize,
    /// Wavelet levels applied by the WT models.
    pub num_wt: usize,
    /// Wavelet levels undone by the IWT model.
    pub num_iwt: usize,
    /// Zero the detail bands before decoding in [`super::eval_iwtvae`].
    pub zero: bool,
    /// Explicit seed for prior samples; overrides the determinism environment.
    pub seed: Option<u64>,
    /// Encoding of the evaluated model's checkpoint; also picks its extension.
    pub checkpoint_format: CheckpointFormat,
}

impl Default for EvalArgs {
    fn default() -> Self {
        Self {
            z_dim: 100,
            num_wt: 2,
            num_iwt: 2,
            zero: true,
            seed: None,
            checkpoint_format: CheckpointFormat::Bincode,
        }
    }
}

impl EvalArgs {
    pub fn validate(&self) -> PureResult<()> {
        if self.z_dim == 0 {
            return Err(TensorError::InvalidValue { label: "z_dim" });
        }
        if self.num_wt == 0 {
            return Err(TensorError::InvalidValue { label: "num_wt" });
        }
        if self.num_iwt == 0 {
            return Err(TensorError::InvalidValue { label: "num_iwt" });
        }
        Ok(())
    }

    /// Reads the `[eval]` section of a layered configuration, falling back to
    /// defaults when it is absent.
    pub fn from_layered(config: &LayeredConfig) -> Result<Self, serde_json::Error> {
        Ok(config.section(&["eval"])?.unwrap_or_default())
    }
}

/// Output locations for image grids and checkpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalDirs {
    pub img_output_dir: PathBuf,
    pub model_dir: PathBuf,
}

impl EvalDirs {
    pub fn new(img_output_dir: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            img_output_dir: img_output_dir.into(),
            model_dir: model_dir.into(),
        }
    }

    pub fn image_path(&self, stem: &str, epoch: usize) -> PathBuf {
        self.img_output_dir.join(format!("{stem}{epoch}.png"))
    }

    pub fn checkpoint_path(&self, stem: &str, epoch: usize, format: CheckpointFormat) -> PathBuf {
        format.path_in(&self.model_dir, &format!("{stem}_epoch{epoch}"))
    }
}

/// Everything an evaluator wrote for one epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    pub epoch: usize,
    /// Number of loader batches processed.
    pub batches: usize,
    /// Image grids in write order. Each path is listed once even though it is
    /// rewritten for every batch.
    pub images: Vec<PathBuf>,
    pub checkpoint: PathBuf,
}

impl EvalReport {
    pub fn image(&self, file_name: &str) -> Option<&Path> {
        self.images
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.file_name().is_some_and(|name| name == file_name))
    }
}
