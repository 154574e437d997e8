// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Module surface for the WT-VAE evaluators.
//!
//! Trained models are supplied by callers; this crate fixes the traits they
//! implement, the parameter-free wavelet modules, and checkpoint IO.

pub mod io;
pub mod layers;
pub mod module;
pub mod vae;

pub use io::{load_bincode, load_json, save_bincode, save_checkpoint, save_json, CheckpointFormat};
pub use layers::{iwt, wt, InverseWaveletTransform, WaveletFilters, WaveletTransform};
pub use module::{Module, Parameter, StateDict};
pub use vae::{IwtPosterior, IwtVae, PairVae, Posterior};

pub use wt_tensor::{PureResult, Tensor, TensorError};
