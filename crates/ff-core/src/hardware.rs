// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Pre-multiplied operators mirroring a shift-register datapath.
//!
//! The linear map `H G P H B` is folded into dense `n × d_orig` matrices at
//! three depths:
//!
//! * `Vp` = `P H B`, the datapath right after the permutation,
//! * `Vg` = `G P H B`, after the generator diagonal,
//! * `Vf` = `H G P H B`, after the second Hadamard, fully fused.
//!
//! A pipeline that stops at `Vp` or `Vg` applies the remaining diagonal and
//! Hadamard stages explicitly. All three produce the software path's
//! projection up to rounding.

use core::fmt;
use core::str::FromStr;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dims::Dimensions;
use crate::error::{FastfoodError, FastfoodResult};
use crate::fht::hadamard_matrix;
use crate::observability::emit_stage;

/// Factorisation depth of a pre-fused operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareStage {
    /// Permutation, first Hadamard and sign diagonal.
    Vp,
    /// `Vp` followed by the generator diagonal.
    Vg,
    /// `Vg` followed by the second Hadamard.
    Vf,
}

impl HardwareStage {
    pub const ALL: [HardwareStage; 3] = [HardwareStage::Vp, HardwareStage::Vg, HardwareStage::Vf];

    pub fn label(self) -> &'static str {
        match self {
            HardwareStage::Vp => "Vp",
            HardwareStage::Vg => "Vg",
            HardwareStage::Vf => "Vf",
        }
    }
}

impl FromStr for HardwareStage {
    type Err = FastfoodError;

    fn from_str(s: &str) -> FastfoodResult<Self> {
        match s {
            "Vp" => Ok(HardwareStage::Vp),
            "Vg" => Ok(HardwareStage::Vg),
            "Vf" => Ok(HardwareStage::Vf),
            other => Err(FastfoodError::UnsupportedStage {
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for HardwareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The explicit stages a partially fused operator leaves behind.
#[derive(Clone, Copy, Debug)]
pub struct RemainingStages<'a> {
    gaussian: ArrayView1<'a, f64>,
    hadamard: ArrayView2<'a, f64>,
    k: usize,
    d: usize,
}

impl RemainingStages<'_> {
    /// Multiplies every `d`-wide block of every example by `H`.
    fn block_hadamard(&self, projection: Array2<f64>) -> FastfoodResult<Array2<f64>> {
        let (m, n) = projection.dim();
        let blocks = projection.into_shape((m * self.k, self.d))?;
        Ok(blocks.dot(&self.hadamard).into_shape((m, n))?)
    }
}

/// One pre-fused operator tagged with its depth.
#[derive(Clone, Debug, PartialEq)]
pub struct StageOperator {
    stage: HardwareStage,
    matrix: Array2<f64>,
}

impl StageOperator {
    pub fn stage(&self) -> HardwareStage {
        self.stage
    }

    /// Dense `n × d_orig` matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Projects an `(examples, d_orig)` batch to `(examples, n)`, applying
    /// whatever stages this operator has not absorbed.
    pub fn apply(
        &self,
        x: ArrayView2<'_, f64>,
        remaining: &RemainingStages<'_>,
    ) -> FastfoodResult<Array2<f64>> {
        if x.ncols() != self.matrix.ncols() {
            return Err(FastfoodError::InputWidth {
                expected: self.matrix.ncols(),
                got: x.ncols(),
            });
        }
        let projection = x.dot(&self.matrix.t());
        let out = match self.stage {
            HardwareStage::Vf => projection,
            HardwareStage::Vg => remaining.block_hadamard(projection)?,
            HardwareStage::Vp => remaining.block_hadamard(projection * &remaining.gaussian)?,
        };
        emit_stage(self.stage.label(), x.dim(), out.dim());
        Ok(out)
    }
}

/// All hardware operators of a fitted model plus the plain Hadamard matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct HardwareOperators {
    dims: Dimensions,
    vp: StageOperator,
    vg: StageOperator,
    vf: StageOperator,
    hadamard: Array2<f64>,
    gaussian: Array1<f64>,
}

impl HardwareOperators {
    /// Folds `B`, `P`, `G` and both Hadamard stages into dense operators.
    ///
    /// The padded columns of `B` are zeroed before folding and stripped from
    /// all three operators once `Vf` exists.
    pub fn build(
        dims: Dimensions,
        signs: &Array2<f64>,
        gaussian: &Array2<f64>,
        permutation: &[usize],
    ) -> FastfoodResult<Self> {
        let Dimensions { d_orig, d, n, k, pad } = dims;
        let hadamard = hadamard_matrix(d)?;

        let mut masked = signs.to_owned();
        if pad > 0 {
            masked.slice_mut(s![.., d_orig..]).fill(0.0);
        }

        // Row i*d + a of the stacked operator is H[a] ⊙ B[i].
        let stacked = Array2::from_shape_fn((n, d), |(row, col)| {
            masked[[row / d, col]] * hadamard[[row % d, col]]
        });
        // Gathering rows realises the column gather the software path does on data.
        let vp = Array2::from_shape_fn((n, d), |(row, col)| {
            stacked[[permutation[row] % n, col]]
        });

        let gaussian: Array1<f64> = gaussian.iter().copied().collect();
        let vg = &vp * &gaussian.view().insert_axis(Axis(1));

        // Row i*d + a of Vf sums H[a][b] · Vg[i*d + b] over the block rows b.
        let mut vf = Array2::zeros((n, d));
        for block in 0..k {
            let (lo, hi) = (block * d, (block + 1) * d);
            let fused = hadamard.dot(&vg.slice(s![lo..hi, ..]));
            vf.slice_mut(s![lo..hi, ..]).assign(&fused);
        }

        let truncate = |m: Array2<f64>| m.slice(s![.., ..d_orig]).to_owned();
        debug!(
            target: "fastfood::hardware",
            n,
            d,
            d_orig,
            stripped = pad,
            "hardware operators folded"
        );
        Ok(Self {
            dims,
            vp: StageOperator {
                stage: HardwareStage::Vp,
                matrix: truncate(vp),
            },
            vg: StageOperator {
                stage: HardwareStage::Vg,
                matrix: truncate(vg),
            },
            vf: StageOperator {
                stage: HardwareStage::Vf,
                matrix: truncate(vf),
            },
            hadamard,
            gaussian,
        })
    }

    pub fn stage(&self, stage: HardwareStage) -> &StageOperator {
        match stage {
            HardwareStage::Vp => &self.vp,
            HardwareStage::Vg => &self.vg,
            HardwareStage::Vf => &self.vf,
        }
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageOperator> {
        [&self.vp, &self.vg, &self.vf].into_iter()
    }

    /// Plain `d × d` Hadamard matrix used by the explicit stages.
    pub fn hadamard(&self) -> &Array2<f64> {
        &self.hadamard
    }

    pub fn remaining(&self) -> RemainingStages<'_> {
        RemainingStages {
            gaussian: self.gaussian.view(),
            hadamard: self.hadamard.view(),
            k: self.dims.k,
            d: self.dims.d,
        }
    }

    /// Linear projection through the chosen operator, before scaling.
    pub fn project(
        &self,
        stage: HardwareStage,
        x: ArrayView2<'_, f64>,
    ) -> FastfoodResult<Array2<f64>> {
        self.stage(stage).apply(x, &self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwarePipeline;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn toy() -> (Dimensions, Array2<f64>, Array2<f64>, Vec<usize>) {
        let dims = Dimensions::resolve(3, 8);
        let signs = array![[1.0, -1.0, 1.0, -1.0], [-1.0, -1.0, 1.0, 1.0]];
        let gaussian = array![[0.5, -1.0, 2.0, 0.25], [1.5, -0.75, 0.1, 3.0]];
        let permutation = vec![3, 1, 0, 2, 6, 4, 7, 5];
        (dims, signs, gaussian, permutation)
    }

    #[test]
    fn parses_stage_tags() {
        for stage in HardwareStage::ALL {
            assert_eq!(stage.label().parse::<HardwareStage>().unwrap(), stage);
        }
        assert_eq!(
            "Vx".parse::<HardwareStage>(),
            Err(FastfoodError::UnsupportedStage { tag: "Vx".into() })
        );
    }

    #[test]
    fn operators_drop_pad_columns() {
        let (dims, signs, gaussian, permutation) = toy();
        let ops = HardwareOperators::build(dims, &signs, &gaussian, &permutation).unwrap();
        for op in ops.stages() {
            assert_eq!(op.matrix().dim(), (8, 3));
        }
        assert_eq!(ops.hadamard().dim(), (4, 4));
    }

    #[test]
    fn permuted_operator_entries_are_signs() {
        let (dims, signs, gaussian, permutation) = toy();
        let ops = HardwareOperators::build(dims, &signs, &gaussian, &permutation).unwrap();
        assert!(ops
            .stage(HardwareStage::Vp)
            .matrix()
            .iter()
            .all(|&v| v == 1.0 || v == -1.0));
        let vp = ops.stage(HardwareStage::Vp).matrix();
        let vg = ops.stage(HardwareStage::Vg).matrix();
        assert_eq!(vg.row(5), &vp.row(5) * gaussian[[1, 1]]);
    }

    #[test]
    fn every_stage_matches_software() {
        let (dims, signs, gaussian, permutation) = toy();
        let ops = HardwareOperators::build(dims, &signs, &gaussian, &permutation).unwrap();
        let x = array![[0.2, -1.0, 0.5], [1.5, 0.0, -0.3]];
        let reference = SoftwarePipeline::new(dims, &signs, &gaussian, &permutation)
            .apply(x.view())
            .unwrap();
        for stage in HardwareStage::ALL {
            let got = ops.project(stage, x.view()).unwrap();
            for (a, b) in got.iter().zip(reference.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn rejects_padded_width() {
        let (dims, signs, gaussian, permutation) = toy();
        let ops = HardwareOperators::build(dims, &signs, &gaussian, &permutation).unwrap();
        let err = ops
            .project(HardwareStage::Vf, Array2::<f64>::zeros((1, 4)).view())
            .unwrap_err();
        assert_eq!(err, FastfoodError::InputWidth { expected: 3, got: 4 });
    }

    #[test]
    fn stage_operator_checks_width_before_multiplying() {
        let (dims, signs, gaussian, permutation) = toy();
        let ops = HardwareOperators::build(dims, &signs, &gaussian, &permutation).unwrap();
        let remaining = ops.remaining();
        for op in ops.stages() {
            for width in [0, 2, 4, 8] {
                let x = Array2::<f64>::zeros((2, width));
                assert_eq!(
                    op.apply(x.view(), &remaining),
                    Err(FastfoodError::InputWidth { expected: 3, got: width })
                );
            }
            let ok = op.apply(Array2::<f64>::ones((2, 3)).view(), &remaining).unwrap();
            assert_eq!(ok.dim(), (2, 8));
        }
    }
}
