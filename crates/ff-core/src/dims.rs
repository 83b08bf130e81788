// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Resolution of requested sizes into the padded block layout used by every
//! transform stage.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Block layout derived from the requested feature count and dictionary size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Requested input width.
    pub d_orig: usize,
    /// Hadamard block size, a power of two no smaller than `d_orig`.
    pub d: usize,
    /// Number of random features, always `k * d`.
    pub n: usize,
    /// Number of stacked blocks.
    pub k: usize,
    /// Zero columns appended to each input row, `d - d_orig`.
    pub pad: usize,
}

impl Dimensions {
    /// Resolves `(d_orig, n_dicts)` into a block layout.
    ///
    /// Both arguments must be at least one; configuration validation rejects
    /// zeros before this is reached.
    pub fn resolve(d_orig: usize, n_dicts: usize) -> Self {
        debug_assert!(d_orig >= 1 && n_dicts >= 1);
        let d = block_size(d_orig);
        let (divisor, remainder) = (n_dicts / d, n_dicts % d);
        let (n, k) = if remainder != 0 {
            debug!(
                target: "fastfood::dims",
                requested = n_dicts,
                resolved = (divisor + 1) * d,
                "dictionary size grown to a multiple of the block size"
            );
            ((divisor + 1) * d, divisor + 1)
        } else {
            (n_dicts, divisor)
        };
        Self {
            d_orig,
            d,
            n,
            k,
            pad: d - d_orig,
        }
    }
}

/// Powers of two other than one are kept, everything else moves to the next
/// power of two strictly above it.
fn block_size(d_orig: usize) -> usize {
    if is_power_of_two(d_orig) {
        d_orig
    } else {
        (d_orig + 1).next_power_of_two()
    }
}

/// Power-of-two test that rejects one, since a length-one Hadamard block is
/// meaningless for the butterfly.
pub fn is_power_of_two(value: usize) -> bool {
    value > 1 && value.is_power_of_two()
}
