// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Structured random matrices for the Fastfood factorisation: the sign
//! diagonal `B`, the generator diagonal `G`, the block permutation `P`, the
//! chi length correction `S` and the phase vector `U`.
//!
//! Every draw takes an explicit RNG. Which stream each quantity comes from is
//! described by a [`SeedPlan`], so pinning one draw (for example the chi
//! samples) never silently reseeds the others.

use core::f64::consts::TAU;
use core::fmt;

use ndarray::{Array1, Array2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Binomial, ChiSquared, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{FastfoodError, FastfoodResult};

/// Distribution used for the generator diagonal `G`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorMode {
    /// Independent `N(0, 1)` entries, coefficient 1.
    Gaussian,
    /// Dense ±1 entries, coefficient `1/sqrt(k)`.
    Rademacher,
    /// Row-sparse {-1, 0, 1} entries with binomial row support, coefficient
    /// `sqrt(1/density)/sqrt(k)`.
    SparseTernary,
}

impl GeneratorMode {
    pub const ALL: [GeneratorMode; 3] = [
        GeneratorMode::Gaussian,
        GeneratorMode::Rademacher,
        GeneratorMode::SparseTernary,
    ];

    /// Integer tag used by configuration files and test benches.
    pub fn tag(self) -> u8 {
        match self {
            GeneratorMode::Gaussian => 0,
            GeneratorMode::Rademacher => 1,
            GeneratorMode::SparseTernary => 2,
        }
    }
}

impl TryFrom<i64> for GeneratorMode {
    type Error = FastfoodError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(GeneratorMode::Gaussian),
            1 => Ok(GeneratorMode::Rademacher),
            2 => Ok(GeneratorMode::SparseTernary),
            other => Err(FastfoodError::UnsupportedGenerator { tag: other }),
        }
    }
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorMode::Gaussian => f.write_str("N(0,1)"),
            GeneratorMode::Rademacher => f.write_str("{-1,1}"),
            GeneratorMode::SparseTernary => f.write_str("{-1,0,1}"),
        }
    }
}

/// Source of the random stream for one drawn quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawSeed {
    /// Continue the model's main stream.
    #[default]
    Shared,
    /// Use an independent stream seeded with the given value.
    Fixed(u64),
}

impl DrawSeed {
    /// Runs `draw` against the stream this seed selects.
    pub fn draw<R, T>(self, shared: &mut R, draw: impl FnOnce(&mut dyn RngCore) -> T) -> T
    where
        R: RngCore,
    {
        match self {
            DrawSeed::Shared => draw(shared),
            DrawSeed::Fixed(seed) => draw(&mut StdRng::seed_from_u64(seed)),
        }
    }
}

/// Per-quantity seeding policy. Shared draws happen in the order
/// `signs`, `gaussian`, `permutation`, `scaling`, `phase`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedPlan {
    pub signs: DrawSeed,
    pub gaussian: DrawSeed,
    pub permutation: DrawSeed,
    pub scaling: DrawSeed,
    pub phase: DrawSeed,
}

impl SeedPlan {
    /// Seed historically pinned for the chi draw.
    pub const LEGACY_SCALING_SEED: u64 = 23;

    /// Pins the chi samples to [`Self::LEGACY_SCALING_SEED`] and shares the
    /// main stream for everything else, reproducing older parameter dumps.
    pub fn legacy() -> Self {
        Self {
            scaling: DrawSeed::Fixed(Self::LEGACY_SCALING_SEED),
            ..Self::default()
        }
    }
}

/// k×d matrix of independent ±1 signs.
pub fn draw_signs<R: Rng + ?Sized>(rng: &mut R, k: usize, d: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((k, d), || rademacher(rng))
}

/// Draws `G` for the given mode and returns it with its normalising coefficient.
pub fn draw_gaussian<R: Rng + ?Sized>(
    rng: &mut R,
    mode: GeneratorMode,
    k: usize,
    d: usize,
    density: f64,
) -> FastfoodResult<(f64, Array2<f64>)> {
    match mode {
        GeneratorMode::Gaussian => {
            let g = Array2::from_shape_simple_fn((k, d), || StandardNormal.sample(rng));
            Ok((1.0, g))
        }
        GeneratorMode::Rademacher => sparse_sign_matrix(rng, k, d, 1.0),
        GeneratorMode::SparseTernary => sparse_sign_matrix(rng, k, d, density),
    }
}

/// Row-sparse sign matrix in the style of sparse random projections.
///
/// Each row keeps `Binomial(n_features, density)` positions chosen without
/// replacement and fills them with fair signs. A density of exactly one skips
/// the support sampling and returns a dense ±1 matrix.
pub fn sparse_sign_matrix<R: Rng + ?Sized>(
    rng: &mut R,
    n_components: usize,
    n_features: usize,
    density: f64,
) -> FastfoodResult<(f64, Array2<f64>)> {
    if !(density > 0.0 && density <= 1.0) {
        return Err(FastfoodError::InvalidSparsity {
            sparsity: 1.0 - density,
        });
    }
    let coeff = (1.0 / density).sqrt() / (n_components as f64).sqrt();
    if density == 1.0 {
        return Ok((
            coeff,
            Array2::from_shape_simple_fn((n_components, n_features), || rademacher(rng)),
        ));
    }

    let support = Binomial::new(n_features as u64, density).map_err(|_| {
        FastfoodError::InvalidSparsity {
            sparsity: 1.0 - density,
        }
    })?;
    let mut positions = Vec::with_capacity(n_components);
    for _ in 0..n_components {
        let nnz = support.sample(rng) as usize;
        positions.push(index::sample(rng, n_features, nnz).into_vec());
    }
    let mut components = Array2::zeros((n_components, n_features));
    for (mut row, cols) in components.axis_iter_mut(Axis(0)).zip(positions) {
        for col in cols {
            row[col] = rademacher(rng);
        }
    }
    Ok((coeff, components))
}

/// Concatenation of `k` independent permutations of `0..d`, block `i`
/// shifted by `i * d`.
pub fn draw_permutation<R: Rng + ?Sized>(rng: &mut R, k: usize, d: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(k * d);
    for block in 0..k {
        let mut local: Vec<usize> = (0..d).collect();
        local.shuffle(rng);
        out.extend(local.into_iter().map(|idx| block * d + idx));
    }
    out
}

/// Chi length correction: `chi_d / ||coeff * G_i|| * coeff` row by row.
///
/// Every row of `coeff * G` must have a nonzero norm.
pub fn draw_scaling<R: Rng + ?Sized>(
    rng: &mut R,
    gaussian: &Array2<f64>,
    coeff: f64,
    d: usize,
) -> FastfoodResult<Array2<f64>> {
    let norms = row_norms(&gaussian.mapv(|g| coeff * g));
    if let Some(row) = norms.iter().position(|&norm| norm == 0.0) {
        return Err(FastfoodError::ZeroRowNorm { row });
    }
    let chi_squared = ChiSquared::new(d as f64).map_err(|_| FastfoodError::NonFinite {
        label: "chi degrees of freedom",
    })?;
    let mut scaling = Array2::from_shape_simple_fn(gaussian.raw_dim(), || {
        let sample: f64 = chi_squared.sample(rng);
        sample.sqrt()
    });
    for (mut row, norm) in scaling.axis_iter_mut(Axis(0)).zip(norms.iter()) {
        row.mapv_inplace(|chi| chi / norm * coeff);
    }
    if scaling.iter().any(|value| !value.is_finite()) {
        return Err(FastfoodError::NonFinite { label: "scaling" });
    }
    Ok(scaling)
}

/// Phase offsets drawn uniformly from `[0, 2π)`.
pub fn draw_phase<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Array1<f64> {
    let uniform = Uniform::new(0.0, TAU);
    Array1::from_shape_simple_fn(n, || uniform.sample(rng))
}

/// Euclidean norm of every row.
pub fn row_norms(matrix: &Array2<f64>) -> Array1<f64> {
    matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt())
}

fn rademacher<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn mode_tags_roundtrip_and_reject_unknown() {
        for mode in GeneratorMode::ALL {
            assert_eq!(GeneratorMode::try_from(mode.tag() as i64).unwrap(), mode);
        }
        assert_eq!(
            GeneratorMode::try_from(3i64),
            Err(FastfoodError::UnsupportedGenerator { tag: 3 })
        );
        assert!(GeneratorMode::try_from(-1i64).is_err());
    }

    #[test]
    fn permutation_is_blockwise_bijection() {
        let mut rng = StdRng::seed_from_u64(5);
        let (k, d) = (4, 16);
        let perm = draw_permutation(&mut rng, k, d);
        assert_eq!(perm.len(), k * d);
        for (block, chunk) in perm.chunks(d).enumerate() {
            let mut sorted = chunk.to_vec();
            sorted.sort_unstable();
            let expected: Vec<usize> = (block * d..(block + 1) * d).collect();
            assert_eq!(sorted, expected);
        }
    }

    #[test]
    fn signs_are_unit_magnitude() {
        let mut rng = StdRng::seed_from_u64(9);
        let signs = draw_signs(&mut rng, 3, 8);
        assert_eq!(signs.dim(), (3, 8));
        assert!(signs.iter().all(|&s| s == 1.0 || s == -1.0));
    }

    #[test]
    fn coefficients_follow_mode() {
        let mut rng = StdRng::seed_from_u64(11);
        let (c0, _) = draw_gaussian(&mut rng, GeneratorMode::Gaussian, 4, 8, 0.5).unwrap();
        let (c1, g1) = draw_gaussian(&mut rng, GeneratorMode::Rademacher, 4, 8, 0.5).unwrap();
        let (c2, g2) = draw_gaussian(&mut rng, GeneratorMode::SparseTernary, 4, 8, 0.5).unwrap();
        assert_eq!(c0, 1.0);
        assert_relative_eq!(c1, 0.5, epsilon = 1e-15);
        assert_relative_eq!(c2, 2f64.sqrt() / 2.0, epsilon = 1e-15);
        assert!(g1.iter().all(|&v| v == 1.0 || v == -1.0));
        assert!(g2.iter().all(|&v| v == 1.0 || v == -1.0 || v == 0.0));
    }

    #[test]
    fn sparse_density_controls_support() {
        let mut rng = StdRng::seed_from_u64(17);
        let (_, g) = sparse_sign_matrix(&mut rng, 64, 256, 0.25).unwrap();
        let nnz = g.iter().filter(|&&v| v != 0.0).count() as f64;
        let fraction = nnz / (64.0 * 256.0);
        assert!((fraction - 0.25).abs() < 0.02, "fraction {fraction}");
    }

    #[test]
    fn dense_and_unit_density_share_sign_statistics() {
        let mut dense_rng = StdRng::seed_from_u64(23);
        let mut sparse_rng = StdRng::seed_from_u64(29);
        let (c1, dense) =
            draw_gaussian(&mut dense_rng, GeneratorMode::Rademacher, 32, 256, 1.0).unwrap();
        let (c2, sparse) =
            draw_gaussian(&mut sparse_rng, GeneratorMode::SparseTernary, 32, 256, 1.0).unwrap();
        assert_eq!(c1, c2);
        let positive = |m: &Array2<f64>| m.iter().filter(|&&v| v > 0.0).count() as f64 / m.len() as f64;
        assert!(sparse.iter().all(|&v| v != 0.0));
        assert!((positive(&dense) - 0.5).abs() < 0.02);
        assert!((positive(&sparse) - 0.5).abs() < 0.02);
        assert!((positive(&dense) - positive(&sparse)).abs() < 0.03);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = StdRng::seed_from_u64(41);
        let mut b = StdRng::seed_from_u64(41);
        assert_eq!(draw_signs(&mut a, 2, 8), draw_signs(&mut b, 2, 8));
        assert_eq!(draw_permutation(&mut a, 2, 8), draw_permutation(&mut b, 2, 8));
    }

    #[test]
    fn scaling_normalises_by_row_norm() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = array![[3.0, 4.0], [0.0, 2.0]];
        let s = draw_scaling(&mut rng, &g, 1.0, 2).unwrap();
        assert!(s.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert_eq!(row_norms(&g), array![5.0, 2.0]);
    }

    #[test]
    fn zero_row_norm_is_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = array![[1.0, 0.0], [0.0, 0.0]];
        assert_eq!(
            draw_scaling(&mut rng, &g, 0.5, 2),
            Err(FastfoodError::ZeroRowNorm { row: 1 })
        );
    }

    #[test]
    fn phase_stays_in_period() {
        let mut rng = StdRng::seed_from_u64(13);
        let u = draw_phase(&mut rng, 512);
        assert!(u.iter().all(|&v| (0.0..TAU).contains(&v)));
    }

    #[test]
    fn fixed_draw_ignores_shared_stream() {
        let mut first = StdRng::seed_from_u64(1);
        let mut second = StdRng::seed_from_u64(2);
        let a = DrawSeed::Fixed(23).draw(&mut first, |rng| draw_phase(rng, 8));
        let b = DrawSeed::Fixed(23).draw(&mut second, |rng| draw_phase(rng, 8));
        assert_eq!(a, b);
        let c = DrawSeed::Shared.draw(&mut first, |rng| draw_phase(rng, 8));
        assert_ne!(a, c);
    }
}
