// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Seeded RNGs for latent sampling.
//!
//! With `WTVAE_DETERMINISTIC` set, every evaluator draws its prior samples
//! from a generator seeded by mixing `WTVAE_DETERMINISTIC_SEED` with a stable
//! hash of the evaluator's label. The hash does not depend on the toolchain,
//! so seeds stay comparable across builds.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::OnceLock;

pub const ENABLE_VAR: &str = "WTVAE_DETERMINISTIC";
pub const SEED_VAR: &str = "WTVAE_DETERMINISTIC_SEED";

const DEFAULT_BASE_SEED: u64 = 42;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    pub enabled: bool,
    pub base_seed: u64,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_BASE_SEED,
        }
    }
}

fn is_enabled_flag(raw: &str) -> bool {
    let flag = raw.trim().to_ascii_lowercase();
    !matches!(flag.as_str(), "" | "0" | "false" | "off" | "no")
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// SplitMix64 finaliser.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl DeterminismConfig {
    /// Parses raw variable values; unparsable seeds fall back to the default.
    pub fn from_vars(flag: Option<&str>, seed: Option<&str>) -> Self {
        Self {
            enabled: flag.is_some_and(is_enabled_flag),
            base_seed: seed
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(DEFAULT_BASE_SEED),
        }
    }

    pub fn from_env() -> Self {
        let flag = std::env::var(ENABLE_VAR).ok();
        let seed = std::env::var(SEED_VAR).ok();
        Self::from_vars(flag.as_deref(), seed.as_deref())
    }

    pub fn seed_for(&self, label: &str) -> u64 {
        mix(self.base_seed ^ fnv1a(label.as_bytes()))
    }

    /// Generator for `label`. An explicit `seed` always wins; otherwise the
    /// generator is label-seeded when enabled and entropy-seeded when not.
    pub fn rng(&self, seed: Option<u64>, label: &str) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None if self.enabled => StdRng::seed_from_u64(self.seed_for(label)),
            None => StdRng::from_entropy(),
        }
    }
}

static ACTIVE: OnceLock<DeterminismConfig> = OnceLock::new();

/// Process-wide configuration, read from the environment on first use.
pub fn config() -> &'static DeterminismConfig {
    ACTIVE.get_or_init(DeterminismConfig::from_env)
}

/// Generator for latent samples drawn under `label`.
pub fn sampling_rng(seed: Option<u64>, label: &str) -> StdRng {
    config().rng(seed, label)
}
