// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! In-place fast Walsh–Hadamard transform.
//!
//! The butterfly follows the natural (Sylvester) ordering, so `fht(x)` equals
//! `hadamard_matrix(len) · x` without any normalisation. Applying the
//! transform twice returns the input scaled by its length. `fht2` runs the
//! transform over every row of a batch; rows are independent and are spread
//! across the rayon pool unless the determinism policy locks the order.

use ff_config::determinism;
use ndarray::Array2;
use rayon::prelude::*;

use crate::dims::is_power_of_two;
use crate::error::{FastfoodError, FastfoodResult};

/// Transforms `values` in place. The length must be a power of two above one.
pub fn fht(values: &mut [f64]) -> FastfoodResult<()> {
    check_len(values.len())?;
    butterfly(values);
    Ok(())
}

/// Row-wise transform over a 2D buffer.
pub fn fht2(buffer: &mut Array2<f64>) -> FastfoodResult<()> {
    let len = buffer.ncols();
    check_len(len)?;
    if buffer.nrows() == 0 {
        return Ok(());
    }
    let sequential = determinism::lock_reduction_order();
    match buffer.as_slice_mut() {
        Some(flat) if sequential => flat.chunks_mut(len).for_each(butterfly),
        Some(flat) => flat.par_chunks_mut(len).for_each(butterfly),
        None => {
            let mut scratch = vec![0.0; len];
            for mut row in buffer.rows_mut() {
                scratch
                    .iter_mut()
                    .zip(row.iter())
                    .for_each(|(dst, &src)| *dst = src);
                butterfly(&mut scratch);
                row.iter_mut()
                    .zip(scratch.iter())
                    .for_each(|(dst, &src)| *dst = src);
            }
        }
    }
    Ok(())
}

/// Dense Sylvester Hadamard matrix of order `len`, `H[a][c] = (-1)^popcount(a & c)`.
pub fn hadamard_matrix(len: usize) -> FastfoodResult<Array2<f64>> {
    check_len(len)?;
    Ok(Array2::from_shape_fn((len, len), |(a, c)| {
        if (a & c).count_ones() % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }))
}

fn check_len(len: usize) -> FastfoodResult<()> {
    if is_power_of_two(len) {
        Ok(())
    } else {
        Err(FastfoodError::NotPowerOfTwo { len })
    }
}

/// Butterfly rounds with the stride halving from `len / 2` down to one.
fn butterfly(values: &mut [f64]) {
    let len = values.len();
    let mut bit = len;
    while bit > 1 {
        bit >>= 1;
        for i in 0..len {
            if i & bit == 0 {
                let j = i | bit;
                let top = values[i];
                values[i] = top + values[j];
                values[j] = top - values[j];
            }
        }
    }
}
