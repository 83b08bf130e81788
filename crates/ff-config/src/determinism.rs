// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide seeding policy.
//!
//! An explicit seed on a model always wins. Without one, draws come from OS
//! entropy unless `FASTFOOD_DETERMINISTIC` is set, in which case every label
//! gets its own seed derived from `FASTFOOD_DETERMINISTIC_SEED`.

use std::sync::OnceLock;

use rand::{rngs::StdRng, SeedableRng};

pub const ENV_ENABLED: &str = "FASTFOOD_DETERMINISTIC";
pub const ENV_SEED: &str = "FASTFOOD_DETERMINISTIC_SEED";
pub const ENV_REDUCTION: &str = "FASTFOOD_DETERMINISTIC_REDUCTION";

const DEFAULT_BASE_SEED: u64 = 42;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Derive unseeded draws from `base_seed` instead of entropy.
    pub enabled: bool,
    pub base_seed: u64,
    /// Run row-wise transforms sequentially instead of on the rayon pool.
    pub fix_reduction: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_BASE_SEED,
            fix_reduction: false,
        }
    }
}

impl DeterminismConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the policy from any key/value source. Unparseable values fall
    /// back to the defaults; the reduction lock follows `enabled` unless set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(ENV_ENABLED)
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(false);
        let base_seed = lookup(ENV_SEED)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_BASE_SEED);
        let fix_reduction = lookup(ENV_REDUCTION)
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(enabled);
        Self {
            enabled,
            base_seed,
            fix_reduction,
        }
    }

    /// Seed for `label`, stable across runs and toolchains.
    pub fn seed_for(&self, label: &str) -> u64 {
        // FNV-1a over the label, mixed with the base seed through splitmix64.
        let hash = label
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, byte| {
                (acc ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
            });
        splitmix64(self.base_seed ^ hash)
    }

    pub fn rng_for(&self, label: &str) -> StdRng {
        if self.enabled {
            StdRng::seed_from_u64(self.seed_for(label))
        } else {
            StdRng::from_entropy()
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

static POLICY: OnceLock<DeterminismConfig> = OnceLock::new();

/// The installed policy, read from the environment on first use.
pub fn config() -> &'static DeterminismConfig {
    POLICY.get_or_init(DeterminismConfig::from_env)
}

/// Installs `cfg` unless a policy is already in place; returns the active one.
pub fn configure(cfg: DeterminismConfig) -> &'static DeterminismConfig {
    POLICY.get_or_init(|| cfg)
}

/// RNG for an unseeded draw under the active policy.
pub fn rng_from_label(label: &str) -> StdRng {
    config().rng_for(label)
}

pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => rng_from_label(label),
    }
}

/// Whether row-parallel transforms must keep a fixed order.
pub fn lock_reduction_order() -> bool {
    let cfg = config();
    cfg.enabled && cfg.fix_reduction
}
