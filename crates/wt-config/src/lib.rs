// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runtime configuration shared by the WT-VAE evaluation crates.

pub mod determinism;
pub mod layered;
pub mod tracing;

pub use self::layered::{ConfigLayering, LayeredConfig, LayeredConfigError};
pub use self::tracing::{init_tracing, init_tracing_with, InitError, TracingGuard, TracingOptions};
