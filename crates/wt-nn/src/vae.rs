// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Encoder/decoder contracts for the two VAE families driven by the evaluators.

use crate::layers::WaveletFilters;
use crate::module::Module;
use wt_tensor::{PureResult, Tensor};

/// Output of a Gaussian encoder: a reparameterised sample and its moments.
#[derive(Clone, Debug, PartialEq)]
pub struct Posterior {
    pub z: Tensor,
    pub mu: Tensor,
    pub logvar: Tensor,
}

/// VAE that encodes an image and decodes directly into wavelet space.
///
/// The decoder output is compared against the top-left patch of the wavelet
/// transform of a paired target image, so the model also carries the filter
/// bank that transform uses.
pub trait PairVae: Module {
    fn filters(&self) -> &WaveletFilters;

    fn encode(&self, input: &Tensor) -> PureResult<Posterior>;

    fn decode(&self, z: &Tensor) -> PureResult<Tensor>;
}

/// Encoder output of an [`IwtVae`].
///
/// `skip` carries whatever the decoder needs from the encoder besides the
/// latent, typically max-pool indices for unpooling.
#[derive(Clone, Debug)]
pub struct IwtPosterior<S> {
    pub mu: Tensor,
    pub var: Tensor,
    pub skip: S,
}

/// VAE that reconstructs a full wavelet decomposition from its masked
/// approximation plus a latent code.
pub trait IwtVae: Module {
    type Skip;

    /// Encodes the detail residual `y_full - y_masked`.
    fn encode(&self, residual: &Tensor) -> PureResult<IwtPosterior<Self::Skip>>;

    /// Decodes wavelet coefficients from the masked input `y` and latent `z`.
    fn decode(&self, y: &Tensor, z: &Tensor, skip: &Self::Skip) -> PureResult<Tensor>;
}
