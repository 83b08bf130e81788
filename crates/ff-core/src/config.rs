// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};

use crate::error::{FastfoodError, FastfoodResult};
use crate::phi::Tradeoff;
use crate::random::SeedPlan;

/// Construction parameters of a Fastfood feature map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastfoodConfig {
    /// RBF bandwidth. Projections are divided by `sigma · sqrt(d)`.
    pub sigma: f64,
    /// Requested input width `d_orig`.
    pub n_features: usize,
    /// Requested number of random features before rounding to a block multiple.
    pub n_dicts: usize,
    /// Fraction of zeroed generator entries for the sparse ternary mode.
    pub sparsity: f64,
    /// Feature nonlinearity; fixes the output width.
    pub tradeoff: Tradeoff,
    /// Seed of the main random stream. `None` defers to the process policy.
    pub seed: Option<u64>,
    /// Which stream each drawn quantity comes from.
    pub seeds: SeedPlan,
}

impl Default for FastfoodConfig {
    fn default() -> Self {
        Self {
            sigma: 0.5f64.sqrt(),
            n_features: 4,
            n_dicts: 8,
            sparsity: 0.2,
            tradeoff: Tradeoff::Memory,
            seed: None,
            seeds: SeedPlan::default(),
        }
    }
}

impl FastfoodConfig {
    pub fn new(n_features: usize, n_dicts: usize) -> Self {
        Self {
            n_features,
            n_dicts,
            ..Self::default()
        }
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_sparsity(mut self, sparsity: f64) -> Self {
        self.sparsity = sparsity;
        self
    }

    pub fn with_tradeoff(mut self, tradeoff: Tradeoff) -> Self {
        self.tradeoff = tradeoff;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_plan(mut self, seeds: SeedPlan) -> Self {
        self.seeds = seeds;
        self
    }

    /// Fraction of nonzero generator entries, `1 - sparsity`.
    pub fn density(&self) -> f64 {
        1.0 - self.sparsity
    }

    /// Rejects configurations that cannot produce a well-defined model.
    pub fn validate(&self) -> FastfoodResult<()> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(FastfoodError::InvalidSigma { sigma: self.sigma });
        }
        if self.n_features == 0 {
            return Err(FastfoodError::InvalidDimension {
                label: "n_features",
            });
        }
        if self.n_dicts == 0 {
            return Err(FastfoodError::InvalidDimension { label: "n_dicts" });
        }
        if !(0.0..1.0).contains(&self.sparsity) {
            return Err(FastfoodError::InvalidSparsity {
                sparsity: self.sparsity,
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> FastfoodResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| FastfoodError::InvalidConfig {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> FastfoodResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| FastfoodError::InvalidConfig {
            message: err.to_string(),
        })
    }
}
