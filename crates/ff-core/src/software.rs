// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Direct evaluation of `H G P H B x`, the reference path every hardware
//! factorisation is checked against.

use ndarray::{s, Array1, Array2, ArrayView2, Zip};

use crate::dims::Dimensions;
use crate::error::{FastfoodError, FastfoodResult};
use crate::fht::fht2;
use crate::observability::emit_stage;

/// Borrowed view of the fitted diagonals needed by the software path.
#[derive(Clone, Copy, Debug)]
pub struct SoftwarePipeline<'a> {
    dims: Dimensions,
    signs: &'a Array2<f64>,
    gaussian: &'a Array2<f64>,
    permutation: &'a [usize],
}

impl<'a> SoftwarePipeline<'a> {
    pub fn new(
        dims: Dimensions,
        signs: &'a Array2<f64>,
        gaussian: &'a Array2<f64>,
        permutation: &'a [usize],
    ) -> Self {
        Self {
            dims,
            signs,
            gaussian,
            permutation,
        }
    }

    /// Linear projection of a batch, `(examples, d_orig) -> (examples, n)`,
    /// before the length correction and nonlinearity.
    pub fn apply(&self, x: ArrayView2<'_, f64>) -> FastfoodResult<Array2<f64>> {
        let Dimensions { d_orig, d, n, k, .. } = self.dims;
        if x.ncols() != d_orig {
            return Err(FastfoodError::InputWidth {
                expected: d_orig,
                got: x.ncols(),
            });
        }
        let m = x.nrows();
        let padded = pad_with_zeros(x, d);

        let mut blocks = Array2::zeros((m * k, d));
        for (example, row) in padded.rows().into_iter().enumerate() {
            for (block, signs) in self.signs.rows().into_iter().enumerate() {
                Zip::from(blocks.row_mut(example * k + block))
                    .and(&row)
                    .and(&signs)
                    .for_each(|dst, &value, &sign| *dst = value * sign);
            }
        }
        emit_stage("signs", (m, d_orig), (m * k, d));

        fht2(&mut blocks)?;
        emit_stage("hadamard", (m * k, d), (m * k, d));

        let mixed = blocks.into_shape((m, n))?;
        let permuted = Array2::from_shape_fn((m, n), |(example, col)| {
            mixed[[example, self.permutation[col] % n]]
        });
        emit_stage("permutation", (m, n), (m, n));

        let gaussian: Array1<f64> = self.gaussian.iter().copied().collect();
        let mut blocks = (permuted * &gaussian).into_shape((m * k, d))?;
        emit_stage("gaussian", (m, n), (m * k, d));

        fht2(&mut blocks)?;
        emit_stage("hadamard", (m * k, d), (m * k, d));

        Ok(blocks.into_shape((m, n))?)
    }
}

/// Length correction shared by both paths: multiply by the flattened `S` and
/// divide by `sigma · sqrt(d)`.
pub fn scale_projection(
    mut projection: Array2<f64>,
    scaling: &Array2<f64>,
    sigma: f64,
    d: usize,
) -> Array2<f64> {
    let factor = 1.0 / (sigma * (d as f64).sqrt());
    let row: Array1<f64> = scaling.iter().map(|s| s * factor).collect();
    projection *= &row;
    emit_stage("scale", projection.dim(), projection.dim());
    projection
}

/// Appends `d - x.ncols()` zero columns. Returns the input unchanged in
/// content when no padding is needed.
pub fn pad_with_zeros(x: ArrayView2<'_, f64>, d: usize) -> Array2<f64> {
    if x.ncols() == d {
        return x.to_owned();
    }
    let mut padded = Array2::zeros((x.nrows(), d));
    padded.slice_mut(s![.., ..x.ncols()]).assign(&x);
    padded
}
