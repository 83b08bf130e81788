// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Model lifecycle: an unfitted [`Fastfood`] holds the validated
//! configuration and resolved layout, `fit` turns it into an immutable
//! [`FittedFastfood`] that every transform borrows.

use ff_config::determinism;
use ndarray::{Array1, Array2, ArrayView2};
use rand::RngCore;
use tracing::{debug, debug_span, info};

use crate::config::FastfoodConfig;
use crate::dims::Dimensions;
use crate::error::FastfoodResult;
use crate::hardware::{HardwareOperators, HardwareStage};
use crate::phi::{HardwareScaling, Tradeoff};
use crate::random::{self, GeneratorMode};
use crate::software::{scale_projection, SoftwarePipeline};

const FIT_LABEL: &str = "ff-core/fastfood/fit";

/// Which factorisation evaluates the linear map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformPath {
    /// Diagonals, permutation and in-place FHTs.
    Software,
    /// Pre-fused operator at the given depth.
    Hardware(HardwareStage),
}

/// Validated configuration with its resolved block layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Fastfood {
    config: FastfoodConfig,
    dims: Dimensions,
}

impl Fastfood {
    pub fn new(config: FastfoodConfig) -> FastfoodResult<Self> {
        config.validate()?;
        let dims = Dimensions::resolve(config.n_features, config.n_dicts);
        debug!(
            target: "fastfood::model",
            d_orig = dims.d_orig,
            d = dims.d,
            n = dims.n,
            k = dims.k,
            pad = dims.pad,
            "model constraints resolved"
        );
        Ok(Self { config, dims })
    }

    pub fn config(&self) -> &FastfoodConfig {
        &self.config
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Draws every parameter from the configured seed (or the process
    /// determinism policy when no seed is set).
    pub fn fit(&self, mode: GeneratorMode) -> FastfoodResult<FittedFastfood> {
        let mut rng = determinism::rng_from_optional(self.config.seed, FIT_LABEL);
        self.fit_with_rng(mode, &mut rng)
    }

    /// Draws every parameter from `rng`, except for quantities the seed plan
    /// pins to their own stream.
    pub fn fit_with_rng<R: RngCore>(
        &self,
        mode: GeneratorMode,
        rng: &mut R,
    ) -> FastfoodResult<FittedFastfood> {
        let _span = debug_span!("fastfood.fit", mode = %mode).entered();
        let Dimensions { d, n, k, .. } = self.dims;
        let plan = self.config.seeds;
        let density = self.config.density();

        let signs = plan
            .signs
            .draw(rng, |rng| random::draw_signs(rng, k, d));
        let (coeff, gaussian) = plan
            .gaussian
            .draw(rng, |rng| random::draw_gaussian(rng, mode, k, d, density))?;
        let permutation = plan
            .permutation
            .draw(rng, |rng| random::draw_permutation(rng, k, d));
        let scaling = plan
            .scaling
            .draw(rng, |rng| random::draw_scaling(rng, &gaussian, coeff, d))?;
        let phase = plan.phase.draw(rng, |rng| random::draw_phase(rng, n));

        let hardware = HardwareOperators::build(self.dims, &signs, &gaussian, &permutation)?;
        let hardware_scaling = HardwareScaling::new(&scaling, &phase, self.config.sigma, d);

        info!(
            target: "fastfood::model",
            mode = %mode,
            coeff,
            n,
            k,
            tradeoff = %self.config.tradeoff,
            "fastfood parameters fitted"
        );
        Ok(FittedFastfood {
            config: self.config.clone(),
            dims: self.dims,
            mode,
            coeff,
            signs,
            gaussian,
            permutation,
            scaling,
            phase,
            hardware,
            hardware_scaling,
        })
    }
}

/// Immutable parameter set produced by [`Fastfood::fit`].
#[derive(Clone, Debug, PartialEq)]
pub struct FittedFastfood {
    config: FastfoodConfig,
    dims: Dimensions,
    mode: GeneratorMode,
    coeff: f64,
    signs: Array2<f64>,
    gaussian: Array2<f64>,
    permutation: Vec<usize>,
    scaling: Array2<f64>,
    phase: Array1<f64>,
    hardware: HardwareOperators,
    hardware_scaling: HardwareScaling,
}

impl FittedFastfood {
    /// Feature matrix of `x` through the chosen path.
    pub fn transform(&self, x: ArrayView2<'_, f64>, path: TransformPath) -> FastfoodResult<Array2<f64>> {
        let projection = self.project(x, path)?;
        self.config.tradeoff.apply(projection, self.phase.view())
    }

    pub fn transform_software(&self, x: ArrayView2<'_, f64>) -> FastfoodResult<Array2<f64>> {
        self.transform(x, TransformPath::Software)
    }

    pub fn transform_hardware(
        &self,
        x: ArrayView2<'_, f64>,
        stage: HardwareStage,
    ) -> FastfoodResult<Array2<f64>> {
        self.transform(x, TransformPath::Hardware(stage))
    }

    /// Scaled projection `(examples, n)` before the nonlinearity.
    pub fn project(&self, x: ArrayView2<'_, f64>, path: TransformPath) -> FastfoodResult<Array2<f64>> {
        debug!(target: "fastfood::model", rows = x.nrows(), ?path, "transform");
        let linear = match path {
            TransformPath::Software => self.software().apply(x)?,
            TransformPath::Hardware(stage) => self.hardware.project(stage, x)?,
        };
        Ok(scale_projection(
            linear,
            &self.scaling,
            self.config.sigma,
            self.dims.d,
        ))
    }

    pub fn project_software(&self, x: ArrayView2<'_, f64>) -> FastfoodResult<Array2<f64>> {
        self.project(x, TransformPath::Software)
    }

    pub fn project_hardware(
        &self,
        x: ArrayView2<'_, f64>,
        stage: HardwareStage,
    ) -> FastfoodResult<Array2<f64>> {
        self.project(x, TransformPath::Hardware(stage))
    }

    pub fn software(&self) -> SoftwarePipeline<'_> {
        SoftwarePipeline::new(self.dims, &self.signs, &self.gaussian, &self.permutation)
    }

    pub fn config(&self) -> &FastfoodConfig {
        &self.config
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn mode(&self) -> GeneratorMode {
        self.mode
    }

    pub fn tradeoff(&self) -> Tradeoff {
        self.config.tradeoff
    }

    /// Width of every feature row this model emits.
    pub fn output_width(&self) -> usize {
        self.config.tradeoff.output_width(self.dims.n)
    }

    /// Normalising coefficient of the generator distribution.
    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    /// `B`, k×d.
    pub fn signs(&self) -> &Array2<f64> {
        &self.signs
    }

    /// `G`, k×d.
    pub fn gaussian(&self) -> &Array2<f64> {
        &self.gaussian
    }

    /// `P`, length n.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// `S`, k×d.
    pub fn scaling(&self) -> &Array2<f64> {
        &self.scaling
    }

    /// `U`, length n.
    pub fn phase(&self) -> &Array1<f64> {
        &self.phase
    }

    pub fn hardware(&self) -> &HardwareOperators {
        &self.hardware
    }

    pub fn hardware_scaling(&self) -> &HardwareScaling {
        &self.hardware_scaling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastfoodError;
    use crate::random::{DrawSeed, SeedPlan};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model(n_features: usize, n_dicts: usize) -> Fastfood {
        Fastfood::new(FastfoodConfig::new(n_features, n_dicts).with_seed(41)).unwrap()
    }

    #[test]
    fn fit_shapes_follow_dimensions() {
        let fitted = model(5, 9).fit(GeneratorMode::Gaussian).unwrap();
        let dims = fitted.dimensions();
        assert_eq!((dims.d, dims.n, dims.k, dims.pad), (8, 16, 2, 3));
        assert_eq!(fitted.signs().dim(), (2, 8));
        assert_eq!(fitted.gaussian().dim(), (2, 8));
        assert_eq!(fitted.scaling().dim(), (2, 8));
        assert_eq!(fitted.permutation().len(), 16);
        assert_eq!(fitted.phase().len(), 16);
        assert_eq!(fitted.hardware().hadamard().dim(), (8, 8));
        assert_eq!(fitted.output_width(), 16);
    }

    #[test]
    fn same_seed_same_parameters() {
        let a = model(6, 20).fit(GeneratorMode::SparseTernary).unwrap();
        let b = model(6, 20).fit(GeneratorMode::SparseTernary).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pinned_scaling_is_independent_of_main_seed() {
        let plan = SeedPlan::legacy();
        let fit = |seed: u64| {
            Fastfood::new(
                FastfoodConfig::new(8, 8)
                    .with_seed(seed)
                    .with_seed_plan(plan),
            )
            .unwrap()
            .fit(GeneratorMode::Rademacher)
            .unwrap()
        };
        let (a, b) = (fit(1), fit(2));
        // Rademacher rows all share the norm sqrt(d * coeff^2), so S depends only on the chi draw.
        assert_eq!(a.scaling(), b.scaling());
        assert_ne!(a.phase(), b.phase());
        assert_eq!(plan.scaling, DrawSeed::Fixed(SeedPlan::LEGACY_SCALING_SEED));
    }

    #[test]
    fn caller_rng_drives_fit() {
        let ff = model(4, 8);
        let mut r1 = StdRng::seed_from_u64(7);
        let mut r2 = StdRng::seed_from_u64(7);
        let a = ff.fit_with_rng(GeneratorMode::Gaussian, &mut r1).unwrap();
        let b = ff.fit_with_rng(GeneratorMode::Gaussian, &mut r2).unwrap();
        assert_eq!(a.phase(), b.phase());
    }

    #[test]
    fn zero_input_accuracy_features() {
        let fitted = Fastfood::new(
            FastfoodConfig::new(16, 8)
                .with_seed(3)
                .with_tradeoff(Tradeoff::Accuracy),
        )
        .unwrap()
        .fit(GeneratorMode::Rademacher)
        .unwrap();
        let n = fitted.dimensions().n;
        let zeros = Array2::<f64>::zeros((4, 16));
        for path in [
            TransformPath::Software,
            TransformPath::Hardware(HardwareStage::Vf),
        ] {
            let out = fitted.transform(zeros.view(), path).unwrap();
            assert_eq!(out.dim(), (4, 2 * n));
            let expected = 1.0 / (n as f64).sqrt();
            for row in out.rows() {
                for (col, &value) in row.iter().enumerate() {
                    if col < n {
                        assert_relative_eq!(value, expected, epsilon = 1e-15);
                    } else {
                        assert_eq!(value, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn width_mismatch_is_rejected_on_both_paths() {
        let fitted = model(5, 9).fit(GeneratorMode::Gaussian).unwrap();
        let wide = Array2::<f64>::zeros((2, 8));
        for path in [
            TransformPath::Software,
            TransformPath::Hardware(HardwareStage::Vp),
        ] {
            assert_eq!(
                fitted.transform(wide.view(), path),
                Err(FastfoodError::InputWidth { expected: 5, got: 8 })
            );
        }
    }

    #[test]
    fn empty_batch_yields_empty_features() {
        let fitted = model(4, 8).fit(GeneratorMode::Gaussian).unwrap();
        let out = fitted
            .transform_software(Array2::<f64>::zeros((0, 4)).view())
            .unwrap();
        assert_eq!(out.dim(), (0, 8));
    }

    #[test]
    fn sparse_mode_can_degenerate() {
        let fitted = Fastfood::new(
            FastfoodConfig::new(2, 2)
                .with_sparsity(0.999)
                .with_seed(0),
        )
        .unwrap()
        .fit(GeneratorMode::SparseTernary);
        assert!(matches!(fitted, Err(FastfoodError::ZeroRowNorm { row: 0 })));
    }
}
